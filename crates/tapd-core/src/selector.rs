//! Selector token parsing and resolution
//!
//! A selector token is exactly one of four mutually exclusive forms;
//! the leading sigil/prefix decides the variant, so no ambiguity can
//! survive parsing:
//!
//! ```text
//! @e<N>              ref handle from the current snapshot
//! coords:<x>,<y>     literal tap point
//! text:"<exact>"     exact name match (quotes optional)
//! id:"<value>"       platform id, resolved cross-platform
//! ```
//!
//! The grammar is part of the external contract and must not change
//! meaning across implementations.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::types::{CanonicalElement, ResolvedTarget, UISnapshot};

static REF_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^e\d+$").unwrap());

/// A parsed selector. Closed union: exactly one variant per token.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSelector {
    Ref(String),
    Coords(f64, f64),
    Text(String),
    Id(String),
}

impl fmt::Display for ParsedSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedSelector::Ref(r) => write!(f, "@{}", r),
            ParsedSelector::Coords(x, y) => write!(f, "coords:{},{}", x, y),
            ParsedSelector::Text(t) => write!(f, "text:{:?}", t),
            ParsedSelector::Id(v) => write!(f, "id:{:?}", v),
        }
    }
}

/// Parse a selector token. Anything not matching the four grammar forms
/// is a syntax error, never silently coerced.
pub fn parse_selector_token(token: &str) -> CoreResult<ParsedSelector> {
    let token = token.trim();

    if let Some(rest) = token.strip_prefix('@') {
        if REF_PATTERN.is_match(rest) {
            return Ok(ParsedSelector::Ref(rest.to_string()));
        }
        return Err(CoreError::SelectorSyntax(format!(
            "ref must be @e<digits>, got {:?}",
            token
        )));
    }

    if let Some(rest) = token.strip_prefix("coords:") {
        let parts: Vec<&str> = rest.split(',').collect();
        if parts.len() == 2 {
            let x = parts[0].trim().parse::<f64>();
            let y = parts[1].trim().parse::<f64>();
            if let (Ok(x), Ok(y)) = (x, y) {
                if x.is_finite() && y.is_finite() {
                    return Ok(ParsedSelector::Coords(x, y));
                }
            }
        }
        return Err(CoreError::SelectorSyntax(format!(
            "coords must be coords:<x>,<y>, got {:?}",
            token
        )));
    }

    if let Some(rest) = token.strip_prefix("text:") {
        let value = strip_quotes(rest);
        if value.is_empty() {
            return Err(CoreError::SelectorSyntax("empty text selector".to_string()));
        }
        return Ok(ParsedSelector::Text(value.to_string()));
    }

    if let Some(rest) = token.strip_prefix("id:") {
        let value = strip_quotes(rest);
        if value.is_empty() {
            return Err(CoreError::SelectorSyntax("empty id selector".to_string()));
        }
        return Ok(ParsedSelector::Id(value.to_string()));
    }

    Err(CoreError::SelectorSyntax(format!(
        "unrecognized selector token {:?}",
        token
    )))
}

/// Strip one matching pair of `"` or `'` quotes, if present.
fn strip_quotes(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.len() >= 2 {
        let bytes = raw.as_bytes();
        if (bytes[0] == b'"' && bytes[raw.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[raw.len() - 1] == b'\'')
        {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Resolve a parsed selector against a snapshot.
///
/// `coords` resolves to the literal point without touching the snapshot.
/// `ref` is an exact map lookup with no fallback. `text` matches `name`
/// exactly, first match in snapshot order. `id` tries ios.id, then
/// ios.label, then android.resource_id, then android.content_desc
/// (each scanned across the whole ordered element list), which lets one
/// id token work transparently on either platform's snapshot.
pub fn resolve(snapshot: &UISnapshot, selector: &ParsedSelector) -> CoreResult<ResolvedTarget> {
    let element = match selector {
        ParsedSelector::Coords(x, y) => {
            return Ok(ResolvedTarget::Coords {
                x: x.round() as i64,
                y: y.round() as i64,
            });
        }
        ParsedSelector::Ref(r) => snapshot.element_by_ref(r),
        ParsedSelector::Text(t) => snapshot.elements.iter().find(|el| el.name == *t),
        ParsedSelector::Id(v) => resolve_id(snapshot, v),
    };

    match element {
        Some(el) => Ok(element_target(el)),
        None => Err(CoreError::NoMatch(selector.to_string())),
    }
}

/// Parse and resolve in one step.
pub fn resolve_token(snapshot: &UISnapshot, token: &str) -> CoreResult<ResolvedTarget> {
    let selector = parse_selector_token(token)?;
    resolve(snapshot, &selector)
}

/// Fixed id priority order. Matching ios.label after ios.id is preserved
/// for compatibility even though a display label can shadow another
/// element's identifier.
fn resolve_id<'a>(snapshot: &'a UISnapshot, value: &str) -> Option<&'a CanonicalElement> {
    let fields: [fn(&CanonicalElement) -> Option<&str>; 4] = [
        |el| el.selectors.ios.id.as_deref(),
        |el| el.selectors.ios.label.as_deref(),
        |el| el.selectors.android.resource_id.as_deref(),
        |el| el.selectors.android.content_desc.as_deref(),
    ];
    for field in fields {
        if let Some(el) = snapshot.elements.iter().find(|el| field(el) == Some(value)) {
            return Some(el);
        }
    }
    None
}

fn element_target(el: &CanonicalElement) -> ResolvedTarget {
    let (x, y) = el.bounds.center();
    ResolvedTarget::Element {
        element: el.clone(),
        x,
        y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::build_snapshot;
    use crate::types::{
        AndroidSelectors, Bounds, ElementStates, IosSelectors, ParsedElement, Platform, Selectors,
    };

    fn element(name: &str, bounds: Bounds, selectors: Selectors) -> ParsedElement {
        ParsedElement {
            role: "button".to_string(),
            name: name.to_string(),
            value: None,
            bounds,
            states: ElementStates::default(),
            selectors,
        }
    }

    fn snapshot(elements: Vec<ParsedElement>) -> UISnapshot {
        build_snapshot(elements, Platform::Ios, "sim-1", "com.example.app")
    }

    #[test]
    fn test_parse_ref() {
        assert_eq!(
            parse_selector_token("@e1").unwrap(),
            ParsedSelector::Ref("e1".to_string())
        );
        assert_eq!(
            parse_selector_token("@e42").unwrap(),
            ParsedSelector::Ref("e42".to_string())
        );
    }

    #[test]
    fn test_parse_ref_syntax_errors() {
        for bad in ["@x1", "@e", "@e1a", "@1", "@"] {
            assert!(
                matches!(parse_selector_token(bad), Err(CoreError::SelectorSyntax(_))),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_coords() {
        assert_eq!(
            parse_selector_token("coords:100,200").unwrap(),
            ParsedSelector::Coords(100.0, 200.0)
        );
        assert_eq!(
            parse_selector_token("coords:10.5,20.25").unwrap(),
            ParsedSelector::Coords(10.5, 20.25)
        );
    }

    #[test]
    fn test_parse_coords_syntax_errors() {
        for bad in ["coords:10", "coords:10,20,30", "coords:a,b", "coords:nan,5", "coords:"] {
            assert!(
                matches!(parse_selector_token(bad), Err(CoreError::SelectorSyntax(_))),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_text_quote_stripping() {
        assert_eq!(
            parse_selector_token("text:\"Sign in\"").unwrap(),
            ParsedSelector::Text("Sign in".to_string())
        );
        assert_eq!(
            parse_selector_token("text:'Sign in'").unwrap(),
            ParsedSelector::Text("Sign in".to_string())
        );
        assert_eq!(
            parse_selector_token("text:Sign").unwrap(),
            ParsedSelector::Text("Sign".to_string())
        );
        // mismatched quotes are kept literally
        assert_eq!(
            parse_selector_token("text:\"Sign'").unwrap(),
            ParsedSelector::Text("\"Sign'".to_string())
        );
    }

    #[test]
    fn test_parse_empty_text_or_id_is_error() {
        for bad in ["text:", "text:\"\"", "id:", "id:''"] {
            assert!(
                matches!(parse_selector_token(bad), Err(CoreError::SelectorSyntax(_))),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_unknown_form_is_error() {
        for bad in ["e1", "tap:here", "", "   "] {
            assert!(
                matches!(parse_selector_token(bad), Err(CoreError::SelectorSyntax(_))),
                "should reject {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_ref_round_trip_center() {
        let snap = snapshot(vec![element(
            "Sign in",
            Bounds::new(10.0, 20.0, 100.0, 40.0),
            Selectors::default(),
        )]);
        let target = resolve_token(&snap, "@e1").unwrap();
        match target {
            ResolvedTarget::Element { x, y, ref element } => {
                assert_eq!((x, y), (60, 40));
                assert_eq!(element.r#ref, "e1");
            }
            _ => panic!("expected element target"),
        }
    }

    #[test]
    fn test_ref_miss_has_no_fallback() {
        let snap = snapshot(vec![element("A", Bounds::default(), Selectors::default())]);
        let err = resolve_token(&snap, "@e99").unwrap_err();
        match err {
            CoreError::NoMatch(rendered) => assert_eq!(rendered, "@e99"),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_coords_never_touch_snapshot() {
        let snap = snapshot(Vec::new());
        let target = resolve_token(&snap, "coords:15.4,19.6").unwrap();
        assert_eq!(target, ResolvedTarget::Coords { x: 15, y: 20 });
    }

    #[test]
    fn test_text_exact_match_first_wins() {
        let snap = snapshot(vec![
            element("Sign in now", Bounds::new(0.0, 0.0, 10.0, 10.0), Selectors::default()),
            element("Sign in", Bounds::new(0.0, 20.0, 10.0, 10.0), Selectors::default()),
            element("Sign in", Bounds::new(0.0, 40.0, 10.0, 10.0), Selectors::default()),
        ]);
        let target = resolve_token(&snap, "text:\"Sign in\"").unwrap();
        match target {
            ResolvedTarget::Element { ref element, .. } => {
                // exact match only, first in snapshot order
                assert_eq!(element.r#ref, "e2");
            }
            _ => panic!("expected element target"),
        }
    }

    #[test]
    fn test_id_cross_platform() {
        // iOS snapshot: matched via ios.id
        let ios_snap = snapshot(vec![element(
            "Sign in",
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            Selectors {
                ios: IosSelectors {
                    id: Some("btnSignIn".to_string()),
                    label: None,
                },
                android: AndroidSelectors::default(),
            },
        )]);
        assert!(resolve_token(&ios_snap, "id:\"btnSignIn\"").is_ok());

        // Android snapshot: the same token matches via resource_id
        let android_snap = snapshot(vec![element(
            "Sign in",
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            Selectors {
                ios: IosSelectors::default(),
                android: AndroidSelectors {
                    resource_id: Some("btnSignIn".to_string()),
                    content_desc: None,
                    class: None,
                },
            },
        )]);
        assert!(resolve_token(&android_snap, "id:\"btnSignIn\"").is_ok());
    }

    #[test]
    fn test_id_priority_order() {
        // A later element's ios.id beats an earlier element's ios.label:
        // each priority field is scanned across the whole list in turn.
        let snap = snapshot(vec![
            element(
                "Label twin",
                Bounds::new(0.0, 0.0, 10.0, 10.0),
                Selectors {
                    ios: IosSelectors {
                        id: None,
                        label: Some("save".to_string()),
                    },
                    android: AndroidSelectors::default(),
                },
            ),
            element(
                "Id owner",
                Bounds::new(0.0, 20.0, 10.0, 10.0),
                Selectors {
                    ios: IosSelectors {
                        id: Some("save".to_string()),
                        label: None,
                    },
                    android: AndroidSelectors::default(),
                },
            ),
        ]);
        let target = resolve_token(&snap, "id:save").unwrap();
        match target {
            ResolvedTarget::Element { ref element, .. } => assert_eq!(element.name, "Id owner"),
            _ => panic!("expected element target"),
        }
    }

    #[test]
    fn test_id_label_fallback() {
        let snap = snapshot(vec![element(
            "Save",
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            Selectors {
                ios: IosSelectors {
                    id: None,
                    label: Some("Save".to_string()),
                },
                android: AndroidSelectors::default(),
            },
        )]);
        assert!(resolve_token(&snap, "id:Save").is_ok());
    }

    #[test]
    fn test_no_match_error_carries_selector() {
        let snap = snapshot(Vec::new());
        let err = resolve_token(&snap, "text:\"Missing\"").unwrap_err();
        assert!(err.to_string().contains("text:\"Missing\""));
    }
}
