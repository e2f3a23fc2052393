//! Text helpers shared by the annotation engine
//!
//! All offsets are byte offsets into the HTML-escaped source text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// An entity reference at the start of a string: `&amp;`, `&#39;`, `&#x27;`
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&[A-Za-z0-9_#]+;").expect("Valid entity regex")
});

/// Escape `<`, `>` and any `&` that does not already start an entity.
///
/// Applying it twice is the same as applying it once, so already escaped
/// text passes through untouched.
///
/// # Examples
/// ```
/// use prismatic::text::escape_html;
///
/// assert_eq!(escape_html("a < b && c"), "a &lt; b &amp;&amp; c");
/// assert_eq!(escape_html("&amp; &lt;"), "&amp; &lt;");
/// ```
pub fn escape_html(code: &str) -> String {
    let mut escaped = String::with_capacity(code.len() + code.len() / 8);

    for (index, ch) in code.char_indices() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' if !ENTITY.is_match(&code[index..]) => escaped.push_str("&amp;"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

/// Whether `candidate` completely covers `existing`.
///
/// Identical spans do not count: a match re-discovered at exactly the same
/// place must not evict the one already recorded.
pub fn overlaps_fully(existing: &Range<usize>, candidate: &Range<usize>) -> bool {
    if candidate == existing {
        return false;
    }

    candidate.start <= existing.start && candidate.end >= existing.end
}

/// Whether `candidate` starts or ends strictly inside `existing`.
pub fn intersects(existing: &Range<usize>, candidate: &Range<usize>) -> bool {
    if candidate.start >= existing.start && candidate.start < existing.end {
        return true;
    }

    candidate.end > existing.start && candidate.end < existing.end
}

/// Replace the first occurrence of `needle` at or after `position` in `haystack`.
///
/// The replacement is inserted literally, so `$` in highlighted code is never
/// read as a backreference. If `position` is out of range (or not a char
/// boundary) or `needle` does not occur, the text is returned unchanged.
///
/// # Examples
/// ```
/// use prismatic::text::replace_at;
///
/// assert_eq!(replace_at(4, "ab", "[$1]", "ab, ab"), "ab, [$1]");
/// ```
pub fn replace_at(position: usize, needle: &str, replacement: &str, haystack: &str) -> String {
    let Some(tail) = haystack.get(position..) else {
        return haystack.to_string();
    };
    let Some(found) = tail.find(needle) else {
        return haystack.to_string();
    };

    let start = position + found;
    let mut result = String::with_capacity(haystack.len() - needle.len() + replacement.len());
    result.push_str(&haystack[..start]);
    result.push_str(replacement);
    result.push_str(&haystack[start + needle.len()..]);
    result
}

/// Offset of capture group `group` inside the whole match.
///
/// Sums the lengths of groups `1..group` that took part in the match.
/// `groups[0]` is the whole match and is never counted.
pub fn group_offset(groups: &[Option<&str>], group: usize) -> usize {
    groups
        .iter()
        .take(group)
        .skip(1)
        .flatten()
        .map(|text| text.len())
        .sum()
}

/// Wrap `code` in a span whose classes come from a dotted rule name.
///
/// `keyword.operator` becomes `class="keyword operator"`; a global class,
/// when configured, is appended to every span.
pub fn wrap_span(name: &str, code: &str, global_class: Option<&str>) -> String {
    let mut class_name = name.replace('.', " ");

    if let Some(global) = global_class.filter(|g| !g.is_empty()) {
        class_name.push(' ');
        class_name.push_str(global);
    }

    format!("<span class=\"{}\">{}</span>", class_name, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_angle_brackets() {
        assert_eq!(escape_html("<div>"), "&lt;div&gt;");
    }

    #[test]
    fn test_escape_bare_ampersand() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("&"), "&amp;");
        assert_eq!(escape_html("&;"), "&amp;;");
    }

    #[test]
    fn test_escape_keeps_entities() {
        assert_eq!(escape_html("&copy; &#169; &#x27;"), "&copy; &#169; &#x27;");
    }

    #[test]
    fn test_escape_idempotent() {
        let once = escape_html("if (a < b && c > d) { x = \"&amp\"; }");
        assert_eq!(escape_html(&once), once);
    }

    #[test]
    fn test_escape_multibyte() {
        assert_eq!(escape_html("→ <é>"), "→ &lt;é&gt;");
    }

    #[test]
    fn test_overlaps_fully() {
        // new span strictly larger
        assert!(overlaps_fully(&(2..10), &(0..12)));
        // shares one endpoint
        assert!(overlaps_fully(&(2..10), &(2..12)));
        assert!(overlaps_fully(&(2..10), &(0..10)));
        // identical spans never evict
        assert!(!overlaps_fully(&(2..10), &(2..10)));
        // contained, not containing
        assert!(!overlaps_fully(&(0..12), &(2..10)));
    }

    #[test]
    fn test_intersects() {
        assert!(intersects(&(0..5), &(3..8)));
        assert!(intersects(&(3..8), &(0..5)));
        assert!(intersects(&(0..12), &(2..10)));
        // touching at the far end is not an intersection
        assert!(!intersects(&(0..5), &(5..8)));
        assert!(!intersects(&(5..8), &(0..5)));
        assert!(!intersects(&(0..5), &(6..8)));
    }

    #[test]
    fn test_replace_at_position() {
        assert_eq!(replace_at(0, "foo", "bar", "foo foo"), "bar foo");
        assert_eq!(replace_at(1, "foo", "bar", "foo foo"), "foo bar");
    }

    #[test]
    fn test_replace_at_missing() {
        assert_eq!(replace_at(0, "zzz", "bar", "foo"), "foo");
        assert_eq!(replace_at(10, "foo", "bar", "foo"), "foo");
    }

    #[test]
    fn test_replace_at_dollar_is_literal() {
        assert_eq!(replace_at(0, "x", "$& $1 $$", "x"), "$& $1 $$");
    }

    #[test]
    fn test_replace_at_not_char_boundary() {
        // byte 1 is inside 'é'
        assert_eq!(replace_at(1, "a", "b", "éa"), "éa");
    }

    #[test]
    fn test_group_offset() {
        let groups = [Some("def foo"), Some("def"), Some(" "), Some("foo")];
        assert_eq!(group_offset(&groups, 1), 0);
        assert_eq!(group_offset(&groups, 2), 3);
        assert_eq!(group_offset(&groups, 3), 4);
    }

    #[test]
    fn test_group_offset_skips_unmatched() {
        let groups = [Some("ab"), None, Some("a"), Some("b")];
        assert_eq!(group_offset(&groups, 3), 1);
    }

    #[test]
    fn test_wrap_span() {
        assert_eq!(wrap_span("keyword", "if", None), "<span class=\"keyword\">if</span>");
        assert_eq!(
            wrap_span("keyword.operator", "+", Some("hl")),
            "<span class=\"keyword operator hl\">+</span>"
        );
        assert_eq!(wrap_span("a", "b", Some("")), "<span class=\"a\">b</span>");
    }
}
