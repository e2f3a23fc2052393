//! Pattern engine
//!
//! Runs an ordered rule list over HTML-escaped source text and produces the
//! annotated markup. The algorithm, per rule in list order:
//!
//! 1. Scan the escaped text from offset 0, then from the end of each match,
//!    until the pattern stops matching (or after one recorded match for a
//!    non-global rule). A zero-width match ends the scan.
//! 2. Claim the match span against what is already recorded: spans it fully
//!    covers are evicted, a span it cuts into wins and the match is dropped.
//! 3. Expand capture groups, highest group first, by wrapping, recursing
//!    with nested rules, or delegating to another language.
//! 4. Wrap the expanded text in the rule's span and record it.
//!
//! Recorded replacements are applied from the highest offset down, so
//! every offset stays valid against the original escaped text.
//!
//! The engine is synchronous and owns no shared mutable state: an
//! [`Annotator`] borrows a registry snapshot, and every nested call runs in
//! a fresh [`Session`].

use crate::config::AnnotateOptions;
use crate::registry::Registry;
use crate::rules::{Capture, Rule};
use crate::text::{escape_html, group_offset, replace_at, wrap_span};
use std::ops::Range;
use tracing::{trace, warn};

pub mod session;

pub use session::Session;

/// Annotates text against rules from a registry snapshot
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    registry: &'a Registry,
    global_class: Option<&'a str>,
}

impl<'a> Annotator<'a> {
    pub fn new(registry: &'a Registry, options: &'a AnnotateOptions) -> Self {
        Self {
            registry,
            global_class: options.global_class.as_deref(),
        }
    }

    /// Annotate `code` with the effective rule list of `language`.
    ///
    /// Unknown languages have no rules and come back escaped but unmarked.
    pub fn annotate(&self, code: &str, language: &str) -> String {
        self.annotate_language(&escape_html(code), language)
    }

    /// Annotate `code` with an explicit rule list, in the context of `language`
    pub fn annotate_with(&self, code: &str, language: &str, rules: &[&Rule]) -> String {
        self.annotate_escaped(&escape_html(code), language, rules)
    }

    /// Resolve `language` and annotate text that is already escaped
    fn annotate_language(&self, escaped: &str, language: &str) -> String {
        let language = self.registry.canonical(language);
        let rules = self.registry.resolve(language);
        self.annotate_escaped(escaped, language, &rules)
    }

    /// Run `rules` over text that is already escaped. Captured blocks come
    /// through here too, so the source is escaped exactly once.
    fn annotate_escaped(&self, escaped: &str, language: &str, rules: &[&Rule]) -> String {
        let mut session = Session::new(escaped, language);

        for rule in rules {
            self.apply_rule(&mut session, rule);
        }

        session.finish()
    }

    /// Scan the session text with one rule and record the surviving matches
    fn apply_rule(&self, session: &mut Session<'_>, rule: &Rule) {
        let Some(pattern) = rule.pattern() else {
            return;
        };
        let text = session.text();
        let mut position = 0;

        while position <= text.len() {
            let captures = match pattern.regex().captures_from_pos(text, position) {
                Ok(Some(captures)) => captures,
                Ok(None) => break,
                Err(err) => {
                    warn!("Pattern `{}` failed at {}: {}", pattern.source(), position, err);
                    break;
                }
            };
            let Some(whole) = captures.get(0) else {
                break;
            };

            let range: Range<usize> = whole.start()..whole.end();
            if range.is_empty() {
                trace!("Pattern `{}` matched empty at {}", pattern.source(), range.start);
                break;
            }

            if !session.claim(&range) {
                position = range.end;
                continue;
            }

            let groups: Vec<Option<&str>> = (0..captures.len())
                .map(|i| captures.get(i).map(|m| m.as_str()))
                .collect();
            let replacement = self.expand(session.language(), rule, &groups);
            session.record(range.clone(), whole.as_str(), replacement);

            if !pattern.is_global() {
                break;
            }
            position = range.end;
        }
    }

    /// Build the replacement text for one match
    fn expand(&self, language: &str, rule: &Rule, groups: &[Option<&str>]) -> String {
        let mut replacement = groups.first().copied().flatten().unwrap_or_default().to_string();

        // Highest group first: replacing a later group never moves an earlier one.
        for (&index, capture) in rule.captures().iter().rev() {
            let Some(block) = groups.get(index).copied().flatten().filter(|b| !b.is_empty())
            else {
                continue;
            };

            let (local, wrap) = match capture {
                Capture::Tag(tag) => (block.to_string(), Some(tag.as_str())),
                Capture::Language {
                    language: sub_language,
                    name,
                } => (self.annotate_language(block, sub_language), name.as_deref()),
                Capture::Rules { name, rules } => {
                    let nested: Vec<&Rule> = rules.iter().collect();
                    (self.annotate_escaped(block, language, &nested), name.as_deref())
                }
            };

            let local = match wrap {
                Some(tag) => wrap_span(tag, &local, self.global_class),
                None => local,
            };

            replacement = replace_at(group_offset(groups, index), block, &local, &replacement);
        }

        match rule.name() {
            Some(name) => wrap_span(name, &replacement, self.global_class),
            None => replacement,
        }
    }
}
