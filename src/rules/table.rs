//! Serializable rule tables
//!
//! Language definitions are data. This module describes them in a form
//! that can be read from JSON or TOML and compiled into [`Rule`]s:
//!
//! ```json
//! {
//!   "languages": [{
//!     "name": "html",
//!     "aliases": ["xml"],
//!     "rules": [
//!       { "name": "support.attribute", "pattern": "style=\"([^\"]*)\"",
//!         "matches": { "1": { "language": "css" } } },
//!       { "pattern": "(&lt;/?)(\\w+)", "matches": { "2": "entity.tag" } }
//!     ]
//!   }]
//! }
//! ```

use super::{Capture, PatternFlags, Rule};
use crate::error::{HighlightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One rule as written in a rule table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// JS-style flags; `"g"` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,

    /// Capture index (as a string key) to capture spec
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub matches: BTreeMap<String, CaptureSpec>,
}

/// What a capture group maps to in a rule table
///
/// Variants are tried in order, so a `{ name, matches }` object without a
/// pattern is a named nested list while anything else that looks like a
/// rule is a single nested rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureSpec {
    Tag(String),
    List(Vec<RuleSpec>),
    Language(LanguageRef),
    Named(NamedRules),
    Rule(Box<RuleSpec>),
}

/// `{ "language": "css", "name": "optional.tag" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageRef {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `{ "name": "tag", "matches": <rule or list of rules> }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamedRules {
    pub name: String,
    pub matches: OneOrMany,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Many(Vec<RuleSpec>),
    One(Box<RuleSpec>),
}

impl OneOrMany {
    fn as_slice(&self) -> &[RuleSpec] {
        match self {
            OneOrMany::Many(rules) => rules,
            OneOrMany::One(rule) => std::slice::from_ref(rule.as_ref()),
        }
    }
}

impl RuleSpec {
    /// Compile into a [`Rule`], failing on bad patterns, flags or keys
    pub fn compile(&self) -> Result<Rule> {
        let mut builder = Rule::builder();

        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(pattern) = &self.pattern {
            builder = builder.pattern(pattern.clone());
        }
        if let Some(flags) = &self.flags {
            builder = builder.flags(PatternFlags::parse(flags)?);
        }

        for (key, capture) in &self.matches {
            let group: usize = key.trim().parse().map_err(|_| {
                HighlightError::InvalidRule(format!("capture key `{}` is not a group index", key))
            })?;
            builder = builder.capture(group, capture.compile()?);
        }

        builder.build()
    }
}

impl CaptureSpec {
    pub fn compile(&self) -> Result<Capture> {
        Ok(match self {
            CaptureSpec::Tag(tag) => Capture::Tag(tag.clone()),
            CaptureSpec::List(rules) => Capture::rules(compile_all(rules)?),
            CaptureSpec::Language(lang) => Capture::Language {
                language: lang.language.clone(),
                name: lang.name.clone(),
            },
            CaptureSpec::Named(named) => {
                Capture::named_rules(named.name.clone(), compile_all(named.matches.as_slice())?)
            }
            CaptureSpec::Rule(rule) => Capture::rule(rule.compile()?),
        })
    }
}

fn compile_all(specs: &[RuleSpec]) -> Result<Vec<Rule>> {
    specs.iter().map(RuleSpec::compile).collect()
}

/// A language definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSpec {
    pub name: String,

    /// Parent language whose rules follow this one's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl LanguageSpec {
    pub fn compile_rules(&self) -> Result<Vec<Rule>> {
        compile_all(&self.rules)
    }
}

/// A set of language definitions loaded together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguagePack {
    #[serde(default)]
    pub languages: Vec<LanguageSpec>,
}

impl LanguagePack {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load a pack, choosing the format by file extension (`.toml` or JSON)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&contents),
            _ => Self::from_json(&contents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_capture() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{ "pattern": "(def)\\s+(\\w+)", "matches": { "1": "keyword", "2": "entity.function" } }"#,
        )
        .unwrap();

        let rule = spec.compile().unwrap();
        assert!(matches!(rule.captures().get(&1), Some(Capture::Tag(t)) if t == "keyword"));
        assert!(matches!(rule.captures().get(&2), Some(Capture::Tag(t)) if t == "entity.function"));
    }

    #[test]
    fn test_language_capture() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{ "name": "attr", "pattern": "style=\"([^\"]*)\"", "matches": { "1": { "language": "css" } } }"#,
        )
        .unwrap();

        let rule = spec.compile().unwrap();
        match rule.captures().get(&1) {
            Some(Capture::Language { language, name }) => {
                assert_eq!(language, "css");
                assert!(name.is_none());
            }
            other => panic!("unexpected capture: {:?}", other),
        }
    }

    #[test]
    fn test_named_nested_capture() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{
                "pattern": "\\[(.*)\\]",
                "matches": {
                    "1": { "name": "list", "matches": [
                        { "name": "number", "pattern": "\\d+" },
                        { "name": "string", "pattern": "'[^']*'" }
                    ] }
                }
            }"#,
        )
        .unwrap();

        let rule = spec.compile().unwrap();
        match rule.captures().get(&1) {
            Some(Capture::Rules { name, rules }) => {
                assert_eq!(name.as_deref(), Some("list"));
                assert_eq!(rules.len(), 2);
            }
            other => panic!("unexpected capture: {:?}", other),
        }
    }

    #[test]
    fn test_single_nested_rule_capture() {
        let spec: RuleSpec = serde_json::from_str(
            r#"{ "pattern": "(\\w+)=(\\w+)", "matches": { "2": { "name": "constant", "pattern": "true|false" } } }"#,
        )
        .unwrap();

        let rule = spec.compile().unwrap();
        match rule.captures().get(&2) {
            Some(Capture::Rules { name, rules }) => {
                assert!(name.is_none());
                assert_eq!(rules[0].name(), Some("constant"));
            }
            other => panic!("unexpected capture: {:?}", other),
        }
    }

    #[test]
    fn test_bad_capture_key() {
        let spec: RuleSpec =
            serde_json::from_str(r#"{ "pattern": "x", "matches": { "first": "tag" } }"#).unwrap();
        assert!(matches!(spec.compile(), Err(HighlightError::InvalidRule(_))));
    }

    #[test]
    fn test_flags_respected() {
        let spec: RuleSpec =
            serde_json::from_str(r#"{ "name": "k", "pattern": "x", "flags": "i" }"#).unwrap();
        let rule = spec.compile().unwrap();
        let flags = rule.pattern().unwrap().flags();
        assert!(flags.case_insensitive);
        assert!(!flags.global);
    }

    #[test]
    fn test_pack_from_toml() {
        let pack = LanguagePack::from_toml(
            r#"
            [[languages]]
            name = "toy"
            aliases = ["t"]

            [[languages.rules]]
            name = "keyword"
            pattern = '\b(if|return)\b'

            [[languages.rules]]
            name = "number"
            pattern = '\d+'
            "#,
        )
        .unwrap();

        assert_eq!(pack.languages.len(), 1);
        assert_eq!(pack.languages[0].aliases, vec!["t".to_string()]);
        assert_eq!(pack.languages[0].compile_rules().unwrap().len(), 2);
    }

    #[test]
    fn test_pack_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.json");
        std::fs::write(
            &path,
            r#"{ "languages": [ { "name": "toy", "inherits": "generic", "rules": [] } ] }"#,
        )
        .unwrap();

        let pack = LanguagePack::from_file(&path).unwrap();
        assert_eq!(pack.languages[0].inherits.as_deref(), Some("generic"));
    }
}
