//! Language rule registry
//!
//! Maps language names to their ordered rule lists, records which language
//! each one inherits from, and keeps short-name aliases. The registry is
//! read-only while annotation runs: [`SharedRegistry`] hands out immutable
//! snapshots and applies mutations copy-on-write.

use crate::error::Result;
use crate::rules::{LanguagePack, Rule};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Rule tables, inheritance links and aliases
#[derive(Debug, Clone, Default)]
pub struct Registry {
    rules: HashMap<String, Vec<Rule>>,
    parents: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rules to a language, ahead of the ones it already has.
    ///
    /// The parent is recorded only if the language has none yet, so later
    /// extensions do not need to repeat it.
    pub fn extend(&mut self, language: &str, rules: Vec<Rule>, parent: Option<&str>) {
        if let Some(parent) = parent {
            self.parents
                .entry(language.to_string())
                .or_insert_with(|| parent.to_string());
        }

        let existing = self.rules.remove(language).unwrap_or_default();
        let mut combined = rules;
        combined.extend(existing);

        debug!(
            "Extended language '{}' to {} rules (parent: {:?})",
            language,
            combined.len(),
            self.parents.get(language)
        );
        self.rules.insert(language.to_string(), combined);
    }

    /// Drop a language's own rules and its inheritance link
    pub fn remove(&mut self, language: &str) {
        self.rules.remove(language);
        self.parents.remove(language);
        debug!("Removed language '{}'", language);
    }

    /// Make `alias` resolve to `canonical`
    pub fn alias(&mut self, alias: &str, canonical: &str) {
        self.aliases.insert(alias.to_string(), canonical.to_string());
    }

    /// The canonical name for a possibly aliased language
    pub fn canonical<'a>(&'a self, language: &'a str) -> &'a str {
        self.aliases
            .get(language)
            .map(String::as_str)
            .unwrap_or(language)
    }

    pub fn parent_of(&self, language: &str) -> Option<&str> {
        self.parents.get(self.canonical(language)).map(String::as_str)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.rules.contains_key(self.canonical(language))
    }

    /// Registered languages, sorted
    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Own rules followed by each ancestor's rules, nearest first.
    ///
    /// Unknown languages resolve to an empty list. An inheritance cycle stops
    /// at the first repeated language.
    pub fn resolve(&self, language: &str) -> Vec<&Rule> {
        let mut current = self.canonical(language);
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        loop {
            if !seen.insert(current) {
                warn!("Inheritance cycle at language '{}'", current);
                break;
            }

            if let Some(rules) = self.rules.get(current) {
                resolved.extend(rules.iter());
            }

            match self.parents.get(current) {
                Some(parent) => current = parent.as_str(),
                None => break,
            }
        }

        resolved
    }

    /// Compile and register every language in a pack.
    ///
    /// Nothing is registered if any rule fails to compile.
    pub fn load_pack(&mut self, pack: &LanguagePack) -> Result<()> {
        let mut compiled = Vec::with_capacity(pack.languages.len());
        for lang in &pack.languages {
            compiled.push((lang, lang.compile_rules()?));
        }

        for (lang, rules) in compiled {
            self.extend(&lang.name, rules, lang.inherits.as_deref());
            for alias in &lang.aliases {
                self.alias(alias, &lang.name);
            }
        }

        Ok(())
    }
}

/// Shared, snapshot-based access to a [`Registry`]
///
/// Readers take an `Arc` snapshot and keep using it for the whole annotation
/// call; writers clone the table if a snapshot is still alive. Every mutation
/// bumps [`generation`](Self::generation).
#[derive(Debug, Default)]
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
    generation: AtomicU64,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
            generation: AtomicU64::new(0),
        }
    }

    /// The registry as of now
    pub fn snapshot(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Apply a mutation and bump the generation
    pub fn update<R>(&self, mutate: impl FnOnce(&mut Registry) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let result = mutate(Arc::make_mut(&mut guard));
        self.generation.fetch_add(1, Ordering::SeqCst);
        result
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
