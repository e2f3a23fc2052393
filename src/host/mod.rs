//! Host document binding
//!
//! A host (a browser DOM, an editor buffer, a static-site renderer) exposes
//! its code blocks through [`CodeBlock`]. [`BlockHighlighter`] finds the
//! language of each block, annotates it and writes the result back.

use crate::config::{AnnotateOptions, HighlightSettings};
use crate::dispatch::{run_request, Highlighter};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// `lang-php` (Prettify style) or `language-php` (HTML5 style)
static LANGUAGE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blang(?:uage)?-(\w+)").expect("Valid language class regex")
});

/// Highlighting progress of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    /// Not yet picked up
    #[default]
    Pending,
    /// Request in flight
    Loading,
    /// Annotated text written back
    Shown,
    /// Request failed; the block keeps its original text
    Failed,
}

/// A block of code in a host document
pub trait CodeBlock {
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent_attribute(&self, name: &str) -> Option<&str>;
    fn class_name(&self) -> &str;
    fn parent_class_name(&self) -> &str;

    /// Raw text of the block
    fn source(&self) -> &str;

    fn state(&self) -> BlockState;
    fn set_state(&mut self, state: BlockState);

    /// Replace the block's contents with annotated text
    fn write(&mut self, annotated: String);
}

/// Language of a block, lower-cased.
///
/// `data-language` on the block wins, then on its parent, then a
/// `lang-*`/`language-*` class on the block, then on its parent.
pub fn detect_language<B: CodeBlock + ?Sized>(block: &B) -> Option<String> {
    let from_attribute = block
        .attribute("data-language")
        .filter(|l| !l.is_empty())
        .or_else(|| block.parent_attribute("data-language").filter(|l| !l.is_empty()));

    let language = match from_attribute {
        Some(language) => language,
        None => LANGUAGE_CLASS
            .captures(block.class_name())
            .or_else(|| LANGUAGE_CLASS.captures(block.parent_class_name()))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())?,
    };

    Some(language.to_lowercase())
}

/// Per-block options: `data-global-class` and `data-delay` (whole seconds)
/// override the configured defaults.
pub fn block_options<B: CodeBlock + ?Sized>(block: &B, settings: &HighlightSettings) -> AnnotateOptions {
    let mut options = settings.annotate_options();

    if let Some(class) = block.attribute("data-global-class").filter(|c| !c.is_empty()) {
        options.global_class = Some(class.to_string());
    }

    if let Some(delay) = block.attribute("data-delay") {
        match leading_seconds(delay) {
            Some(seconds) => options.delay = Duration::from_secs(seconds),
            None => warn!("Ignoring data-delay {:?}", delay),
        }
    }

    options
}

/// Whole seconds from the leading integer of `value`: `"2.5"` and `"2s"`
/// give 2, a negative count gives 0, and no leading digits give `None`.
fn leading_seconds(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let seconds: u64 = digits[..end].parse().ok()?;

    Some(if negative { 0 } else { seconds })
}

type HighlightHook = Box<dyn Fn(usize, &str) + Send + Sync>;

/// Highlights the code blocks of a host document
pub struct BlockHighlighter<'a> {
    highlighter: &'a Highlighter,
    on_highlight: Option<HighlightHook>,
}

impl<'a> BlockHighlighter<'a> {
    pub fn new(highlighter: &'a Highlighter) -> Self {
        Self {
            highlighter,
            on_highlight: None,
        }
    }

    /// Called with the block index and language after each write-back
    pub fn on_highlight(mut self, hook: impl Fn(usize, &str) + Send + Sync + 'static) -> Self {
        self.on_highlight = Some(Box::new(hook));
        self
    }

    /// Mark eligible blocks as loading and collect their requests
    fn prepare<B: CodeBlock>(&self, blocks: &mut [B]) -> Vec<(usize, String, AnnotateOptions)> {
        let settings = self.highlighter.settings();
        let mut prepared = Vec::new();

        for (index, block) in blocks.iter_mut().enumerate() {
            if block.state() != BlockState::Pending {
                continue;
            }
            let Some(language) = detect_language(&*block) else {
                continue;
            };

            block.set_state(BlockState::Loading);
            prepared.push((index, language, block_options(&*block, settings)));
        }

        debug!("{} of {} blocks to highlight", prepared.len(), blocks.len());
        prepared
    }

    fn show<B: CodeBlock>(&self, index: usize, block: &mut B, annotated: String, language: &str) {
        block.write(annotated);
        block.set_state(BlockState::Shown);
        if let Some(hook) = &self.on_highlight {
            hook(index, language);
        }
    }

    /// Highlight every pending block concurrently, writing each result
    /// back as soon as it completes. Returns the number of blocks written.
    pub async fn highlight<B: CodeBlock>(&self, blocks: &mut [B]) -> usize {
        let prepared = self.prepare(blocks);
        let registry = self.highlighter.registry().snapshot();
        let mut outstanding: HashSet<usize> = HashSet::with_capacity(prepared.len());
        let mut tasks = JoinSet::new();

        for (index, language, options) in prepared {
            let request = self
                .highlighter
                .request(blocks[index].source(), &language, Some(options));
            let registry = Arc::clone(&registry);
            outstanding.insert(index);
            tasks.spawn(async move { (index, run_request(registry, request).await) });
        }

        let mut written = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(response))) => {
                    outstanding.remove(&index);
                    self.show(index, &mut blocks[index], response.result, &response.language);
                    written += 1;
                }
                Ok((index, Err(err))) => {
                    error!("Highlighting block {} failed: {}", index, err);
                    outstanding.remove(&index);
                    blocks[index].set_state(BlockState::Failed);
                }
                Err(err) => error!("Highlight task failed: {}", err),
            }
        }

        for index in outstanding {
            blocks[index].set_state(BlockState::Failed);
        }

        written
    }

    /// Highlight every pending block on the calling thread
    pub fn highlight_sync<B: CodeBlock>(&self, blocks: &mut [B]) -> usize {
        let prepared = self.prepare(blocks);
        let mut written = 0;

        for (index, language, options) in prepared {
            let annotated = self
                .highlighter
                .annotate(blocks[index].source(), &language, &options);
            let language = self.highlighter.registry().snapshot().canonical(&language).to_string();
            self.show(index, &mut blocks[index], annotated, &language);
            written += 1;
        }

        written
    }
}

/// In-memory [`CodeBlock`]
#[derive(Debug, Clone, Default)]
pub struct MemoryBlock {
    pub attributes: HashMap<String, String>,
    pub parent_attributes: HashMap<String, String>,
    pub class_name: String,
    pub parent_class_name: String,
    pub source: String,
    pub state: BlockState,
    /// Last annotated text written back
    pub output: Option<String>,
}

impl MemoryBlock {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_parent_attribute(mut self, name: &str, value: &str) -> Self {
        self.parent_attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_class(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn with_parent_class(mut self, class_name: &str) -> Self {
        self.parent_class_name = class_name.to_string();
        self
    }
}

impl CodeBlock for MemoryBlock {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn parent_attribute(&self, name: &str) -> Option<&str> {
        self.parent_attributes.get(name).map(String::as_str)
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn parent_class_name(&self) -> &str {
        &self.parent_class_name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn state(&self) -> BlockState {
        self.state
    }

    fn set_state(&mut self, state: BlockState) {
        self.state = state;
    }

    fn write(&mut self, annotated: String) {
        self.output = Some(annotated);
    }
}
