//! Prompt Store - load, cache and render prompt templates
//!
//! Templates are Handlebars `.md` files in a directory, loaded on demand and
//! cached in memory. A missing or malformed template is a startup-class
//! configuration error, never a per-row one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{PharmaBoostError, Result};

/// Loads, caches and renders prompt templates from a directory
pub struct PromptStore {
    templates_dir: PathBuf,
    handlebars: Handlebars<'static>,
    cache: RwLock<HashMap<String, String>>,
}

impl PromptStore {
    /// Create a new PromptStore with the given templates directory
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        let mut handlebars = Handlebars::new();
        // Prompt variables routinely carry HTML; never escape them
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
            handlebars,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Render a named template with any serializable context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
        let template = self.load(name)?;
        self.handlebars
            .render_template(&template, context)
            .map_err(|e| PharmaBoostError::Template(format!("Failed to render '{}': {}", name, e)))
    }

    /// Load a template from disk and cache it
    pub fn load(&self, name: &str) -> Result<String> {
        // Check cache first
        {
            let cache = self
                .cache
                .read()
                .map_err(|e| PharmaBoostError::Template(format!("Failed to acquire read lock: {}", e)))?;
            if let Some(content) = cache.get(name) {
                return Ok(content.clone());
            }
        }

        // Load from disk
        let path = self.template_path(name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            PharmaBoostError::Template(format!(
                "Failed to load template '{}' from {:?}: {}",
                name, path, e
            ))
        })?;

        // Cache the loaded template
        {
            let mut cache = self
                .cache
                .write()
                .map_err(|e| PharmaBoostError::Template(format!("Failed to acquire write lock: {}", e)))?;
            cache.insert(name.to_string(), content.clone());
        }

        Ok(content)
    }

    /// Check if a template exists on disk
    pub fn exists(&self, name: &str) -> bool {
        self.template_path(name).exists()
    }

    /// Get the full path for a template by name
    fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.md", name))
    }

    /// List all available templates in the directory
    pub fn list_available(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.templates_dir).map_err(|e| {
            PharmaBoostError::Template(format!(
                "Failed to read templates directory {:?}: {}",
                self.templates_dir, e
            ))
        })?;

        let mut templates = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                    templates.push(name.to_string());
                }
            }
        }

        templates.sort();
        Ok(templates)
    }

    /// Verify that all required templates are present, loading them into
    /// cache. Called once at startup; a missing template aborts the run.
    pub fn preload(&self, required: &[&str]) -> Result<()> {
        for name in required {
            self.load(name)?;
        }
        Ok(())
    }

    /// Get the templates directory path
    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }
}
