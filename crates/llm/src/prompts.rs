//! Versioned prompt template library.
//!
//! Templates are data: one file per (prompt-bundle version, agent) pair at
//! `prompts/<version>/<agent>.txt`, rendered with named variables. Sources
//! are cached per pair for the process lifetime; [`PromptLibrary::clear_cache`]
//! empties the cache for tests and hot version swaps.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use minijinja::{Environment, UndefinedBehavior};
use serde_json::Value;
use tracing::debug;

use pipeline::{AgentName, LlmError, LogicVersion};

/// Loads, caches, and renders prompt templates for one prompt-bundle version.
#[derive(Debug)]
pub struct PromptLibrary {
    root: PathBuf,
    version: LogicVersion,
    cache: Mutex<HashMap<&'static str, Arc<str>>>,
}

impl PromptLibrary {
    /// Creates a library rooted at `root` (the directory containing the
    /// per-version subdirectories) for the given prompt-bundle version.
    pub fn new(root: impl Into<PathBuf>, version: LogicVersion) -> Self {
        Self {
            root: root.into(),
            version,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the prompt-bundle version this library serves.
    pub fn version(&self) -> &LogicVersion {
        &self.version
    }

    /// Returns the expected on-disk path of the template for `agent`.
    pub fn template_path(&self, agent: AgentName) -> PathBuf {
        self.root
            .join(self.version.as_str())
            .join(format!("{}.txt", agent.as_str()))
    }

    /// Loads (and caches) the template source for `agent`.
    pub fn load(&self, agent: AgentName) -> Result<Arc<str>, LlmError> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(source) = cache.get(agent.as_str()) {
                return Ok(Arc::clone(source));
            }
        }

        let path = self.template_path(agent);
        let source = read_template(&path)?;
        debug!(agent = %agent, path = %path.display(), "loaded prompt template");

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(agent.as_str(), Arc::clone(&source));
        }
        Ok(source)
    }

    /// Renders the template for `agent` with the supplied named variables.
    ///
    /// `vars` must be a JSON object; undefined placeholders are rendering
    /// errors rather than silent blanks.
    pub fn render(&self, agent: AgentName, vars: &Value) -> Result<String, LlmError> {
        let source = self.load(agent)?;
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.render_str(&source, vars).map_err(|err| LlmError::Template {
            detail: format!("{} template: {err}", agent.as_str()),
        })
    }

    /// Empties the template cache.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

fn read_template(path: &Path) -> Result<Arc<str>, LlmError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Arc::from(content.trim())),
        Err(_) => Err(LlmError::TemplateNotFound {
            path: path.display().to_string(),
        }),
    }
}
