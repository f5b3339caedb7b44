//! Snapshot assembly
//!
//! Assigns ref handles to a parsed element list and packages the result
//! with snapshot metadata. Ref assignment order is the addressing
//! contract agents rely on: `e1` is always the first element the parser
//! produced, and parser output order is preserved end-to-end.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::types::{CanonicalElement, ParsedElement, Platform, UISnapshot};

/// Build an immutable snapshot from parser output.
///
/// Refs are sequential, 1-based, in input order. `snapshot_id` is a
/// fresh random token per build: never reused, never derived from
/// content.
pub fn build_snapshot(
    elements: Vec<ParsedElement>,
    platform: Platform,
    device_id: &str,
    app_id: &str,
) -> UISnapshot {
    let elements: Vec<CanonicalElement> = elements
        .into_iter()
        .enumerate()
        .map(|(i, el)| CanonicalElement::from_parsed(el, format!("e{}", i + 1)))
        .collect();

    let refs: BTreeMap<String, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, el)| (el.r#ref.clone(), i))
        .collect();

    UISnapshot {
        snapshot_id: Uuid::new_v4().to_string(),
        taken_at: Utc::now(),
        platform,
        device_id: device_id.to_string(),
        app_id: app_id.to_string(),
        tree: render_tree(&elements),
        elements,
        refs,
    }
}

/// Render the human-readable tree view, one line per element:
/// `@<ref> [<role>] <quoted-name> (<x>,<y>,<w>,<h>)`.
///
/// Pure function of the element list; display only, never used for
/// resolution.
pub fn render_tree(elements: &[CanonicalElement]) -> String {
    elements
        .iter()
        .map(|el| {
            format!(
                "@{} [{}] {:?} ({},{},{},{})",
                el.r#ref, el.role, el.name, el.bounds.x, el.bounds.y, el.bounds.w, el.bounds.h
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
