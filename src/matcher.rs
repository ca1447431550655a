//! Anchor matching for text artifacts
//!
//! An anchor names the place a fragment is spliced into. Only a handful of
//! shapes are recognized: the top of the file, or the first match of a pattern
//! (inserting before or after it). The constructors below cover the fixed
//! shapes the plugin relies on, a declaration line with its opening brace and a
//! dependency block opener.

use regex::Regex;

use crate::error::{InjectError, Result};

/// Where a fragment goes relative to the artifact's content
#[derive(Debug, Clone)]
pub enum Anchor {
    /// Prepend at offset 0
    Top,
    /// Directly before the first match
    Before(Regex),
    /// Immediately after the first match
    After(Regex),
}

impl Anchor {
    pub fn top() -> Self {
        Anchor::Top
    }

    pub fn before(pattern: &str) -> Result<Self> {
        compile(pattern).map(Anchor::Before)
    }

    pub fn after(pattern: &str) -> Result<Self> {
        compile(pattern).map(Anchor::After)
    }

    /// A line mentioning `keyword`, through the first `{` that opens its body
    ///
    /// Matches both `... keyword ... {` on one line and the brace on the next.
    pub fn declaration_block(keyword: &str) -> Result<Self> {
        Anchor::after(&format!(r"(.+{}.+\s*\{{)", regex::escape(keyword)))
    }

    /// A top-level block opener such as `dependencies {` in column 0
    ///
    /// Indented openers belong to an enclosing block (`buildscript`,
    /// `subprojects`) and are never matched.
    pub fn block_opener(name: &str) -> Result<Self> {
        Anchor::after(&format!(r"(?m)^{}\s*\{{", regex::escape(name)))
    }

    /// Byte offset the fragment is inserted at, or `None` if the anchor is absent
    pub fn insertion_point(&self, text: &str) -> Option<usize> {
        match self {
            Anchor::Top => Some(0),
            Anchor::Before(re) => re.find(text).map(|m| m.start()),
            Anchor::After(re) => re.find(text).map(|m| m.end()),
        }
    }

    /// Human readable form for diagnostics
    pub fn describe(&self) -> String {
        match self {
            Anchor::Top => "top of file".to_string(),
            Anchor::Before(re) => format!("before /{}/", re.as_str()),
            Anchor::After(re) => format!("after /{}/", re.as_str()),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| InjectError::InvalidAnchor {
        pattern: pattern.to_string(),
        parse_error: e.to_string(),
    })
}
