//! iOS accessibility dump parser
//!
//! The accessibility tool emits an arbitrarily nested object graph whose
//! shape varies across versions: children may live under any of several
//! keys, and role/name/identifier information is spread over a handful of
//! alternative field names. The walk therefore treats every node as a
//! key-value map read through tolerant accessors instead of assuming a
//! schema.

use serde_json::{Map, Value};

use crate::types::{
    is_interactive_role, Bounds, ElementStates, IosSelectors, ParsedElement, Selectors,
};

/// Keys a node's children may be nested under, tried in order. A node can
/// use any of them; all are traversed.
const CHILD_KEYS: &[&str] = &["children", "elements", "nodes", "subviews", "descendants"];

const ROLE_KEYS: &[&str] = &["role", "AXRole", "type", "elementType", "class", "AXElementType"];
const NAME_KEYS: &[&str] = &["name", "label", "AXLabel", "title", "identifier", "valueLabel"];
const ID_KEYS: &[&str] = &["id", "identifier", "AXIdentifier", "accessibilityIdentifier"];
const LABEL_KEYS: &[&str] = &["label", "AXLabel", "title", "accessibilityLabel", "name"];
const VALUE_KEYS: &[&str] = &["value", "AXValue", "valueLabel"];

/// Parse a raw iOS accessibility payload into pre-canonical elements.
///
/// Depth-first, order-preserving: re-running the same parse on the same
/// payload yields the same element ordering, which downstream ref
/// assignment relies on. A payload with no recognizable elements is not
/// an error; it produces an empty list (nothing interactable on screen).
pub fn parse_ios_dump(payload: &Value, interactive_only: bool) -> Vec<ParsedElement> {
    let mut candidates = Vec::new();
    walk(payload, &mut candidates);

    let deduped = dedup(candidates);

    if interactive_only {
        deduped
            .into_iter()
            .filter(|el| is_interactive_role(&el.role) && !el.bounds.is_degenerate())
            .collect()
    } else {
        deduped
    }
}

fn walk(node: &Value, out: &mut Vec<ParsedElement>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(el) = canonicalize(map) {
                out.push(el);
            }
            for key in CHILD_KEYS {
                if let Some(children) = map.get(*key) {
                    walk(children, out);
                }
            }
        }
        _ => {}
    }
}

/// Attempt to turn one visited node into an element. A node yielding no
/// role, name, label, and id is pure layout noise and is dropped.
fn canonicalize(map: &Map<String, Value>) -> Option<ParsedElement> {
    let raw_role = string_of(map, ROLE_KEYS).or_else(|| string_of(map, &["traits"]));
    let name = string_of(map, NAME_KEYS);
    let id = string_of(map, ID_KEYS);
    let label = string_of(map, LABEL_KEYS);

    if raw_role.is_none() && name.is_none() && label.is_none() && id.is_none() {
        return None;
    }

    let states = ElementStates {
        enabled: bool_of(map, &["enabled"], true),
        visible: bool_of(map, &["visible"], true),
        focused: bool_of(map, &["focused"], false),
        checked: bool_of(map, &["checked", "selected"], false),
    };

    Some(ParsedElement {
        role: normalize_role(raw_role.as_deref().unwrap_or("")),
        name: name.unwrap_or_default(),
        value: string_of(map, VALUE_KEYS),
        bounds: extract_bounds(map),
        states,
        selectors: Selectors {
            ios: IosSelectors { id, label },
            android: Default::default(),
        },
    })
}

/// Map a raw role token onto the canonical category set. Case-insensitive
/// substring match; unmatched roles leak through lowercased with spaces
/// as underscores.
fn normalize_role(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("button") {
        "button".to_string()
    } else if lower.contains("textfield")
        || lower.contains("text field")
        || lower.contains("textview")
        || lower.contains("text view")
    {
        "textbox".to_string()
    } else if lower.contains("link") {
        "link".to_string()
    } else if lower.contains("checkbox") {
        "checkbox".to_string()
    } else if lower.contains("switch") {
        "switch".to_string()
    } else if lower.is_empty() {
        "unknown".to_string()
    } else {
        lower.replace(' ', "_")
    }
}

/// Bounds live under `frame`, `bounds`, or `rect` (first present wins),
/// each in one of three naming shapes. Width/height are derived from
/// right/bottom when no explicit width/height is given.
fn extract_bounds(map: &Map<String, Value>) -> Bounds {
    for key in ["frame", "bounds", "rect"] {
        if let Some(Value::Object(rect)) = map.get(key) {
            let x = num_of(rect, &["x", "left"]).unwrap_or(0.0);
            let y = num_of(rect, &["y", "top"]).unwrap_or(0.0);
            let w = num_of(rect, &["w", "width"])
                .or_else(|| num_of(rect, &["right"]).map(|r| r - x))
                .unwrap_or(0.0);
            let h = num_of(rect, &["h", "height"])
                .or_else(|| num_of(rect, &["bottom"]).map(|b| b - y))
                .unwrap_or(0.0);
            return Bounds::new(x, y, w, h);
        }
    }
    Bounds::default()
}

/// First key holding a non-empty string (numbers are coerced).
fn string_of(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First key holding a number (numeric strings accepted).
fn num_of(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match map.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(n) = s.parse::<f64>() {
                    return Some(n);
                }
            }
            _ => {}
        }
    }
    None
}

/// First key holding a bool-coercible value: native bool, "true"/"false"
/// strings, or 0/1 numerics.
fn bool_of(map: &Map<String, Value>, keys: &[&str], default: bool) -> bool {
    for key in keys {
        match map.get(*key) {
            Some(Value::Bool(b)) => return *b,
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" => return true,
                "false" => return false,
                _ => {}
            },
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_f64() {
                    return v != 0.0;
                }
            }
            _ => {}
        }
    }
    default
}

/// Recursive accessibility dumps repeat the same logical element.
/// Collapse duplicates sharing (role, name, ios.id, bounds), preserving
/// first-seen order.
fn dedup(elements: Vec<ParsedElement>) -> Vec<ParsedElement> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(elements.len());
    for el in elements {
        let key = format!(
            "{}|{}|{}|{},{},{},{}",
            el.role,
            el.name,
            el.selectors.ios.id.as_deref().unwrap_or(""),
            el.bounds.x,
            el.bounds.y,
            el.bounds.w,
            el.bounds.h,
        );
        if seen.insert(key) {
            out.push(el);
        }
    }
    out
}
