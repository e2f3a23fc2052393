//! Configuration for the highlighter
//!
//! Settings come from defaults, an optional TOML file and `PRISMATIC_*`
//! environment variables, in that order of precedence (lowest first).

use crate::error::{HighlightError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Highlighter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    /// Class appended to every produced span
    pub global_class: Option<String>,

    /// Delay before async results are delivered, in milliseconds
    pub delay_ms: u64,

    /// Result cache capacity (0 disables the cache)
    pub cache_capacity: usize,

    /// Worker request queue capacity
    pub worker_queue: usize,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            global_class: None,
            delay_ms: 0,
            cache_capacity: 128,
            worker_queue: 64,
        }
    }
}

impl HighlightSettings {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading highlight settings from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Apply `PRISMATIC_GLOBAL_CLASS`, `PRISMATIC_DELAY_MS` and
    /// `PRISMATIC_CACHE_CAPACITY` when set
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(class) = env::var("PRISMATIC_GLOBAL_CLASS") {
            self.global_class = Some(class).filter(|c| !c.is_empty());
        }

        if let Ok(delay) = env::var("PRISMATIC_DELAY_MS") {
            self.delay_ms = delay.trim().parse().map_err(|_| {
                HighlightError::Config(format!("PRISMATIC_DELAY_MS is not a number: {}", delay))
            })?;
        }

        if let Ok(capacity) = env::var("PRISMATIC_CACHE_CAPACITY") {
            self.cache_capacity = capacity.trim().parse().map_err(|_| {
                HighlightError::Config(format!(
                    "PRISMATIC_CACHE_CAPACITY is not a number: {}",
                    capacity
                ))
            })?;
        }

        Ok(self)
    }

    /// Per-request options implied by these settings
    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            global_class: self.global_class.clone(),
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// Options for a single annotation request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Class appended to every span
    pub global_class: Option<String>,

    /// Presentation delay for async delivery; ignored by the engine
    pub delay: Duration,
}

impl AnnotateOptions {
    pub fn with_global_class(mut self, class: impl Into<String>) -> Self {
        self.global_class = Some(class.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}
