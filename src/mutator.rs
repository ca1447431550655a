//! Anchor-based text mutation
//!
//! Ensures a literal fragment is present in a text artifact. The marker check
//! always runs first, so a fragment that was already injected is never
//! injected again, even when the anchor would match somewhere else.

use tracing::{debug, warn};

use crate::config::EditOutcome;
use crate::matcher::Anchor;

/// Result of ensuring one fragment
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentEdit {
    pub text: String,
    pub outcome: EditOutcome,
}

/// Ensure `fragment` is present in `text`, identified by `marker`
///
/// * marker present: `text` is returned unchanged
/// * anchor missing: `text` is returned unchanged with
///   [`EditOutcome::AnchorNotFound`] so the caller can record a diagnostic
/// * otherwise `fragment` is spliced in at the anchor's insertion point
pub fn ensure_fragment(text: String, marker: &str, anchor: &Anchor, fragment: &str) -> FragmentEdit {
    if text.contains(marker) {
        debug!(marker, "fragment already present");
        return FragmentEdit {
            text,
            outcome: EditOutcome::AlreadyPresent,
        };
    }

    let Some(offset) = anchor.insertion_point(&text) else {
        warn!(marker, anchor = %anchor.describe(), "anchor not found, skipping injection");
        return FragmentEdit {
            text,
            outcome: EditOutcome::AnchorNotFound,
        };
    };

    let mut mutated = String::with_capacity(text.len() + fragment.len());
    mutated.push_str(&text[..offset]);
    mutated.push_str(fragment);
    mutated.push_str(&text[offset..]);

    debug!(marker, offset, "fragment inserted");
    FragmentEdit {
        text: mutated,
        outcome: EditOutcome::Inserted,
    }
}
