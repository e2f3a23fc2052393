//! Prismatic - regex-driven syntax highlighting
//!
//! Source text is HTML-escaped and wrapped in `<span class="...">` markers
//! by ordered, per-language regex rules:
//! - Rules may capture groups as plain tags, nested rule lists, or
//!   embedded sub-languages
//! - Languages can inherit rules from a parent and be reached by alias
//! - Rule tables can be loaded from JSON or TOML language packs
//! - Annotation runs inline, on tokio's blocking pool, or through a
//!   message-passing worker with id-correlated replies
//!
//! # Architecture
//!
//! - **Text**: escaping, span arithmetic and marker construction
//! - **Rules / Registry**: rule definitions and the per-language table
//! - **Engine**: the annotation algorithm
//! - **Dispatch**: the [`Highlighter`] facade and async paths
//! - **Host**: binding to documents with code blocks
//!
//! # Example
//!
//! ```
//! use prismatic::{Highlighter, Rule};
//!
//! let highlighter = Highlighter::new();
//! highlighter.extend(
//!     "toy",
//!     vec![
//!         Rule::new("keyword", r"\b(if|return)\b").unwrap(),
//!         Rule::new("number", r"\d+").unwrap(),
//!     ],
//!     None,
//! );
//!
//! assert_eq!(
//!     highlighter.color_sync("return 1", "toy"),
//!     "<span class=\"keyword\">return</span> <span class=\"number\">1</span>"
//! );
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod host;
pub mod registry;
pub mod rules;
pub mod telemetry;
pub mod text;

// Re-export commonly used types
pub use config::{AnnotateOptions, HighlightSettings};
pub use dispatch::{Highlighter, Request, RequestId, Response, WorkerHandle};
pub use engine::Annotator;
pub use error::{HighlightError, Result};
pub use host::{BlockHighlighter, BlockState, CodeBlock, MemoryBlock};
pub use registry::{Registry, SharedRegistry};
pub use rules::{Capture, LanguagePack, Pattern, PatternFlags, Rule, RuleBuilder};

use once_cell::sync::Lazy;

static GLOBAL: Lazy<Highlighter> = Lazy::new(Highlighter::new);

/// Process-wide highlighter shared by the free functions below
pub fn global() -> &'static Highlighter {
    &GLOBAL
}

/// Add rules to a language of the global highlighter
pub fn extend(language: &str, rules: Vec<Rule>, parent: Option<&str>) {
    global().extend(language, rules, parent);
}

pub fn remove(language: &str) {
    global().remove(language);
}

pub fn add_alias(alias: &str, canonical: &str) {
    global().add_alias(alias, canonical);
}

/// Annotate with the global highlighter on the calling thread
pub fn color_sync(code: &str, language: &str) -> String {
    global().color_sync(code, language)
}
