//! Common test utilities and helpers

#![allow(dead_code)]

use prismatic::{Capture, HighlightSettings, Highlighter, Rule};

/// Keywords and numbers
pub fn toy_rules() -> Vec<Rule> {
    vec![
        Rule::new("keyword", r"\b(if|return)\b").expect("keyword rule"),
        Rule::new("number", r"\d+").expect("number rule"),
    ]
}

/// A tiny CSS grammar used as a sub-language
pub fn css_rules() -> Vec<Rule> {
    vec![
        Rule::new("support.property", r"\bcolor\b").expect("property rule"),
        Rule::new("constant", r"\bred\b").expect("constant rule"),
    ]
}

/// HTML attributes whose `style` value is annotated as CSS
pub fn html_rules() -> Vec<Rule> {
    vec![Rule::builder()
        .name("attribute")
        .pattern(r#"style="([^"]*)""#)
        .capture(1, Capture::language("css"))
        .build()
        .expect("style rule")]
}

/// A highlighter with `toy` (alias `t`), `css` and `html` registered
pub fn create_test_highlighter() -> Highlighter {
    create_test_highlighter_with(HighlightSettings::default())
}

pub fn create_test_highlighter_with(settings: HighlightSettings) -> Highlighter {
    let highlighter = Highlighter::with_settings(settings);
    highlighter.extend("toy", toy_rules(), None);
    highlighter.add_alias("t", "toy");
    highlighter.extend("css", css_rules(), None);
    highlighter.extend("html", html_rules(), None);
    highlighter
}

/// Remove every `<span ...>` and `</span>` marker
pub fn strip_spans(annotated: &str) -> String {
    let mut out = String::with_capacity(annotated.len());
    let mut rest = annotated;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if tail.starts_with("</span>") {
            rest = &tail["</span>".len()..];
        } else if tail.starts_with("<span class=\"") {
            match tail.find('>') {
                Some(end) => rest = &tail[end + 1..],
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

/// Whether opening and closing span markers pair up
pub fn spans_balanced(annotated: &str) -> bool {
    let mut depth: i64 = 0;
    let mut rest = annotated;

    while let Some(start) = rest.find('<') {
        let tail = &rest[start..];
        if tail.starts_with("</span>") {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        } else if tail.starts_with("<span") {
            depth += 1;
        }
        rest = &tail[1..];
    }

    depth == 0
}
