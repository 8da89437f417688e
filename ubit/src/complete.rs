//! Name completion over remotely listed names.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Trailing dotted name before the cursor, e.g. `display.sc`.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(\w+\.)*(\w+)?$").expect("valid token regex")
});

/// Completion candidates and the range they replace.
///
/// Positions count characters, as notebook front-ends do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Completion {
    /// Names starting with the partial word, sorted.
    pub matches: Vec<String>,
    /// First character replaced by a match.
    pub cursor_start: usize,
    /// One past the last character replaced.
    pub cursor_end: usize,
}

/// What to list and what to filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Target<'a> {
    /// Object whose attributes are completed; `None` for bare names.
    pub object: Option<&'a str>,
    /// Partial word being completed (may be empty).
    pub partial: &'a str,
}

impl Target<'_> {
    /// Python expression listing the candidate names.
    pub fn listing(&self) -> String {
        match self.object {
            Some(obj) => format!("dir({obj})"),
            None => "dir()".to_owned(),
        }
    }
}

/// Finds the completion target in `code` before `cursor_pos`.
pub fn target(code: &str, cursor_pos: usize) -> Target<'_> {
    let end = code
        .char_indices()
        .nth(cursor_pos)
        .map_or(code.len(), |(i, _)| i);
    let before = &code[..end];
    let token = TOKEN.find(before).map_or("", |m| m.as_str());
    match token.rsplit_once('.') {
        Some((object, partial)) => Target {
            object: Some(object),
            partial,
        },
        None => Target {
            object: None,
            partial: token,
        },
    }
}

impl Completion {
    /// Filters `names` by `target.partial` and computes the replacement
    /// range ending at `cursor_pos`.
    pub fn new(names: Vec<String>, target: &Target<'_>, cursor_pos: usize) -> Self {
        let mut matches: Vec<String> = names
            .into_iter()
            .filter(|n| n.starts_with(target.partial))
            .collect();
        matches.sort();
        matches.dedup();
        Self {
            matches,
            cursor_start: cursor_pos.saturating_sub(target.partial.chars().count()),
            cursor_end: cursor_pos,
        }
    }

    /// No candidates; the range collapses onto the cursor.
    pub const fn empty(cursor_pos: usize) -> Self {
        Self {
            matches: Vec::new(),
            cursor_start: cursor_pos,
            cursor_end: cursor_pos,
        }
    }
}
