//! Core types for tapd
//!
//! The canonical element model shared by both platform parsers, the
//! snapshot container agents address elements through, and the resolved
//! tap target handed back to the command layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Platform ============

/// Source platform of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ios" => Some(Platform::Ios),
            "android" => Some(Platform::Android),
            _ => None,
        }
    }
}

// ============ Geometry ============

/// Element rectangle in platform-native pixel coordinates.
/// `w <= 0 || h <= 0` marks a degenerate (invisible) element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Bounds { x, y, w, h }
    }

    /// Degenerate elements have no tappable area.
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Tap point: bounds center, rounded to the nearest integer coordinate.
    pub fn center(&self) -> (i64, i64) {
        (
            (self.x + self.w / 2.0).round() as i64,
            (self.y + self.h / 2.0).round() as i64,
        )
    }
}

// ============ Element states ============

/// Interaction-relevant state flags. Sources that omit a flag get the
/// defaults: enabled/visible true, focused/checked false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementStates {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub checked: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ElementStates {
    fn default() -> Self {
        ElementStates {
            enabled: true,
            visible: true,
            focused: false,
            checked: false,
        }
    }
}

// ============ Roles ============

/// Normalized roles that count as interactive for filtering purposes.
pub const INTERACTIVE_ROLES: &[&str] = &["button", "textbox", "link", "checkbox", "switch"];

/// Whether a normalized role is in the interactive set.
pub fn is_interactive_role(role: &str) -> bool {
    INTERACTIVE_ROLES.contains(&role)
}

// ============ Selectors ============

/// iOS identifying hooks for an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosSelectors {
    pub id: Option<String>,
    pub label: Option<String>,
}

/// Android identifying hooks for an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidSelectors {
    pub resource_id: Option<String>,
    pub content_desc: Option<String>,
    pub class: Option<String>,
}

/// Platform-specific identifying hooks. Both namespaces are always
/// present; the foreign platform's fields are null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    pub ios: IosSelectors,
    pub android: AndroidSelectors,
}

// ============ Elements ============

/// A canonicalized UI node before ref assignment. Parsers emit these in
/// visit order; the builder turns them into addressable elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedElement {
    pub role: String,
    pub name: String,
    pub value: Option<String>,
    pub bounds: Bounds,
    pub states: ElementStates,
    pub selectors: Selectors,
}

/// The unit of addressable UI.
///
/// `ref` is assigned sequentially (`e1`, `e2`, ...) in parser output
/// order and is unique within one snapshot only, never stable across
/// snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalElement {
    pub r#ref: String,
    pub role: String,
    pub name: String,
    pub value: Option<String>,
    pub bounds: Bounds,
    pub states: ElementStates,
    pub selectors: Selectors,
}

impl CanonicalElement {
    pub fn from_parsed(parsed: ParsedElement, r#ref: String) -> Self {
        CanonicalElement {
            r#ref,
            role: parsed.role,
            name: parsed.name,
            value: parsed.value,
            bounds: parsed.bounds,
            states: parsed.states,
            selectors: parsed.selectors,
        }
    }
}

// ============ Snapshot ============

/// One immutable view of the device UI. Superseded snapshots are simply
/// overwritten in the store; no history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UISnapshot {
    /// Opaque unique token, fresh per build.
    pub snapshot_id: String,
    pub taken_at: DateTime<Utc>,
    pub platform: Platform,
    pub device_id: String,
    pub app_id: String,
    /// Human-readable tree rendering. Display only, never used for
    /// resolution.
    pub tree: String,
    pub elements: Vec<CanonicalElement>,
    /// Inverse index of `elements` by ref (ref -> element position).
    pub refs: BTreeMap<String, usize>,
}

/// Snapshots older than this are considered stale; the caller should
/// re-snapshot before trusting refs.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 60;

impl UISnapshot {
    /// Look up an element by its ref handle.
    pub fn element_by_ref(&self, r#ref: &str) -> Option<&CanonicalElement> {
        self.refs.get(r#ref).and_then(|&i| self.elements.get(i))
    }

    /// Age of the snapshot relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.taken_at
    }

    /// Whether the snapshot has outlived `max_age` and refs should no
    /// longer be trusted.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.age(now) > max_age
    }

    /// Structural shape check used when loading persisted snapshots:
    /// refs must be exactly the inverse index of `elements` by ref.
    pub fn validate(&self) -> bool {
        if self.refs.len() != self.elements.len() {
            return false;
        }
        self.elements.iter().enumerate().all(|(i, el)| {
            !el.r#ref.is_empty() && self.refs.get(&el.r#ref) == Some(&i)
        })
    }
}

// ============ Resolved target ============

/// What a selector resolved to: either a literal point or a concrete
/// element plus its tap point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedTarget {
    Coords { x: i64, y: i64 },
    Element {
        element: CanonicalElement,
        x: i64,
        y: i64,
    },
}

impl ResolvedTarget {
    /// The tap point regardless of variant.
    pub fn point(&self) -> (i64, i64) {
        match self {
            ResolvedTarget::Coords { x, y } => (*x, *y),
            ResolvedTarget::Element { x, y, .. } => (*x, *y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_center_rounds() {
        let b = Bounds::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(b.center(), (60, 40));

        let b = Bounds::new(0.0, 0.0, 5.0, 5.0);
        assert_eq!(b.center(), (3, 3)); // 2.5 rounds up
    }

    #[test]
    fn test_bounds_degenerate() {
        assert!(Bounds::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(Bounds::new(0.0, 0.0, 10.0, -1.0).is_degenerate());
        assert!(!Bounds::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_states_defaults() {
        let s = ElementStates::default();
        assert!(s.enabled);
        assert!(s.visible);
        assert!(!s.focused);
        assert!(!s.checked);
    }

    #[test]
    fn test_states_deserialize_partial() {
        let s: ElementStates = serde_json::from_str(r#"{"focused":true}"#).unwrap();
        assert!(s.enabled);
        assert!(s.visible);
        assert!(s.focused);
        assert!(!s.checked);
    }

    #[test]
    fn test_selectors_serialize_both_namespaces() {
        let sel = Selectors {
            ios: IosSelectors {
                id: Some("btnSignIn".into()),
                label: None,
            },
            android: AndroidSelectors::default(),
        };
        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(json["ios"]["id"], "btnSignIn");
        assert!(json["ios"]["label"].is_null());
        assert!(json["android"]["resource_id"].is_null());
        assert!(json["android"]["class"].is_null());
    }

    #[test]
    fn test_element_serializes_ref_field() {
        let el = CanonicalElement {
            r#ref: "e1".into(),
            role: "button".into(),
            name: "OK".into(),
            value: None,
            bounds: Bounds::new(0.0, 0.0, 10.0, 10.0),
            states: ElementStates::default(),
            selectors: Selectors::default(),
        };
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["ref"], "e1");
        assert_eq!(json["role"], "button");
    }

    #[test]
    fn test_resolved_target_tagging() {
        let t = ResolvedTarget::Coords { x: 5, y: 7 };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["kind"], "coords");
        assert_eq!(json["x"], 5);

        let el = CanonicalElement {
            r#ref: "e1".into(),
            role: "button".into(),
            name: "OK".into(),
            value: None,
            bounds: Bounds::new(10.0, 20.0, 100.0, 40.0),
            states: ElementStates::default(),
            selectors: Selectors::default(),
        };
        let t = ResolvedTarget::Element {
            element: el,
            x: 60,
            y: 40,
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["kind"], "element");
        assert_eq!(json["element"]["ref"], "e1");
    }

    #[test]
    fn test_platform_roundtrip() {
        for p in [Platform::Ios, Platform::Android] {
            assert_eq!(Platform::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Platform::from_str("web"), None);
    }
}
