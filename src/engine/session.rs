//! Per-call annotation state

use crate::text::{intersects, overlaps_fully, replace_at};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::trace;

/// A pending replacement, keyed by its start offset in the session
#[derive(Debug, Clone)]
struct Replacement {
    matched: String,
    with: String,
}

/// Working state for one annotation call
///
/// Owns the escaped text and the matches claimed so far. Nested annotation
/// always gets a fresh session; nothing here is ever shared.
#[derive(Debug)]
pub struct Session<'a> {
    text: &'a str,
    language: &'a str,
    replacements: BTreeMap<usize, Replacement>,
    spans: BTreeMap<usize, usize>,
}

impl<'a> Session<'a> {
    pub fn new(text: &'a str, language: &'a str) -> Self {
        Self {
            text,
            language,
            replacements: BTreeMap::new(),
            spans: BTreeMap::new(),
        }
    }

    /// The escaped text all offsets refer to
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn language(&self) -> &'a str {
        self.language
    }

    /// Try to claim `range` for a new match.
    ///
    /// Walks the recorded spans in start order. A span the candidate fully
    /// covers is evicted; the first span the candidate cuts into rejects it,
    /// leaving any later spans untouched.
    pub fn claim(&mut self, range: &Range<usize>) -> bool {
        let existing: Vec<(usize, usize)> = self.spans.iter().map(|(&s, &e)| (s, e)).collect();

        for (start, end) in existing {
            let span = start..end;

            if overlaps_fully(&span, range) {
                trace!("{:?} evicts {:?}", range, span);
                self.spans.remove(&start);
                self.replacements.remove(&start);
                continue;
            }

            if intersects(&span, range) {
                trace!("{:?} rejected, collides with {:?}", range, span);
                return false;
            }
        }

        true
    }

    /// Record the replacement for a claimed match
    pub fn record(&mut self, range: Range<usize>, matched: &str, with: String) {
        self.replacements.insert(
            range.start,
            Replacement {
                matched: matched.to_string(),
                with,
            },
        );
        self.spans.insert(range.start, range.end);
    }

    /// Number of matches currently recorded
    pub fn pending(&self) -> usize {
        self.spans.len()
    }

    /// Apply every recorded replacement, last offset first, so earlier
    /// offsets still point into unmodified text.
    pub fn finish(self) -> String {
        let mut code = self.text.to_string();

        for (&position, replacement) in self.replacements.iter().rev() {
            code = replace_at(position, &replacement.matched, &replacement.with, &code);
        }

        code
    }
}
