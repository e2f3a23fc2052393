//! Rule data model
//!
//! A [`Rule`] is one matchable pattern of a language: a compiled regex, an
//! optional dotted tag name and an optional map of capture groups to
//! [`Capture`] specs. Rules are normalized once, when they are built, so the
//! engine never has to branch on loosely shaped input.

use crate::error::{HighlightError, Result};
use fancy_regex::Regex;
use std::collections::BTreeMap;

pub mod table;

pub use table::{CaptureSpec, LanguagePack, LanguageSpec, RuleSpec};

/// Regex flags meaningful to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternFlags {
    /// Keep scanning after the first match
    pub global: bool,
    pub case_insensitive: bool,
    pub multi_line: bool,
}

impl Default for PatternFlags {
    fn default() -> Self {
        Self {
            global: true,
            case_insensitive: false,
            multi_line: false,
        }
    }
}

impl PatternFlags {
    /// Parse a JS-style flag string such as `"gi"` or `"m"`.
    ///
    /// Unknown flags are rejected. An empty string means "match once".
    pub fn parse(flags: &str) -> Result<Self> {
        let mut parsed = Self {
            global: false,
            case_insensitive: false,
            multi_line: false,
        };

        for flag in flags.chars() {
            match flag {
                'g' => parsed.global = true,
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                other => {
                    return Err(HighlightError::InvalidRule(format!(
                        "unknown pattern flag `{}`",
                        other
                    )))
                }
            }
        }

        Ok(parsed)
    }
}

/// A compiled rule pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    flags: PatternFlags,
}

impl Pattern {
    /// Compile `source` with `flags`.
    ///
    /// The returned error names the offending pattern.
    pub fn new(source: &str, flags: PatternFlags) -> Result<Self> {
        let mut inline = String::new();
        if flags.case_insensitive {
            inline.push('i');
        }
        if flags.multi_line {
            inline.push('m');
        }

        let full = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", inline, source)
        };

        let regex = Regex::new(&full).map_err(|e| HighlightError::Pattern {
            pattern: source.to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            source: source.to_string(),
            regex,
            flags,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    /// Whether the engine keeps scanning after a recorded match
    pub fn is_global(&self) -> bool {
        self.flags.global
    }
}

/// What to do with the text of one capture group
#[derive(Debug, Clone)]
pub enum Capture {
    /// Wrap the captured text verbatim in this tag
    Tag(String),

    /// Annotate the captured text with these rules, in the current
    /// language context, optionally wrapping the result in `name`
    Rules { name: Option<String>, rules: Vec<Rule> },

    /// Annotate the captured text as another language
    Language {
        language: String,
        name: Option<String>,
    },
}

impl Capture {
    pub fn tag(name: impl Into<String>) -> Self {
        Capture::Tag(name.into())
    }

    /// A single nested rule; its own name does the wrapping
    pub fn rule(rule: Rule) -> Self {
        Capture::Rules {
            name: None,
            rules: vec![rule],
        }
    }

    pub fn rules(rules: Vec<Rule>) -> Self {
        Capture::Rules { name: None, rules }
    }

    /// Nested rules whose combined result is wrapped in `name`
    pub fn named_rules(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Capture::Rules {
            name: Some(name.into()),
            rules,
        }
    }

    pub fn language(language: impl Into<String>) -> Self {
        Capture::Language {
            language: language.into(),
            name: None,
        }
    }

    /// Sub-language delegation whose result is wrapped in `name`
    pub fn named_language(language: impl Into<String>, name: impl Into<String>) -> Self {
        Capture::Language {
            language: language.into(),
            name: Some(name.into()),
        }
    }
}

/// One highlighting rule
#[derive(Debug, Clone)]
pub struct Rule {
    name: Option<String>,
    pattern: Option<Pattern>,
    captures: BTreeMap<usize, Capture>,
}

impl Rule {
    /// A named, global rule with no capture handling
    pub fn new(name: &str, pattern: &str) -> Result<Self> {
        Self::builder().name(name).pattern(pattern).build()
    }

    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    /// Capture specs in ascending group order
    pub fn captures(&self) -> &BTreeMap<usize, Capture> {
        &self.captures
    }
}

/// Builder for [`Rule`]
#[derive(Debug, Default)]
pub struct RuleBuilder {
    name: Option<String>,
    pattern: Option<String>,
    flags: PatternFlags,
    captures: BTreeMap<usize, Capture>,
}

impl RuleBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn flags(mut self, flags: PatternFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Record only the first surviving match
    pub fn once(mut self) -> Self {
        self.flags.global = false;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.flags.case_insensitive = true;
        self
    }

    pub fn multi_line(mut self) -> Self {
        self.flags.multi_line = true;
        self
    }

    pub fn capture(mut self, group: usize, capture: Capture) -> Self {
        self.captures.insert(group, capture);
        self
    }

    /// Compile the pattern and normalize the captures.
    ///
    /// A tag given for group 0 on an unnamed rule becomes the rule name.
    pub fn build(self) -> Result<Rule> {
        let pattern = self
            .pattern
            .as_deref()
            .map(|source| Pattern::new(source, self.flags))
            .transpose()?;

        let mut name = self.name;
        let mut captures = self.captures;
        if name.is_none() {
            if let Some(Capture::Tag(tag)) = captures.get(&0) {
                name = Some(tag.clone());
                captures.remove(&0);
            }
        }

        Ok(Rule {
            name,
            pattern,
            captures,
        })
    }
}
