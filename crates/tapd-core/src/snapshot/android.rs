//! Android uiautomator dump parser
//!
//! The dump is attribute-laden XML where every element of interest is a
//! `<node .../>` tag. Nesting carries no extra meaning for tap targeting,
//! so a flat regex-driven attribute scan is sufficient; the contract is
//! attribute semantics, not XML mechanics.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{
    is_interactive_role, AndroidSelectors, Bounds, ElementStates, ParsedElement, Selectors,
};

/// Matches every opening or self-closing `<node>` tag.
static NODE_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<node\b([^>]*?)/?>").unwrap());

/// Matches one `attr="value"` pair inside a tag.
static ATTR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"([\w:-]+)="([^"]*)""#).unwrap());

/// uiautomator bounds literal: `[left,top][right,bottom]`.
static BOUNDS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").unwrap());

/// Parse a raw uiautomator XML dump into pre-canonical elements.
///
/// Node order follows document order, so re-parsing the same dump yields
/// identical ordering. An input with no `<node>` tags is not an error;
/// it produces an empty list.
pub fn parse_android_dump(xml: &str, interactive_only: bool) -> Vec<ParsedElement> {
    let mut out = Vec::new();

    for tag in NODE_TAG_PATTERN.captures_iter(xml) {
        let attrs = parse_attrs(&tag[1]);
        let el = canonicalize(&attrs);

        if interactive_only {
            let interactable = attrs.get("clickable").map(String::as_str) == Some("true")
                || attrs.get("focusable").map(String::as_str) == Some("true")
                || is_interactive_role(&el.role);
            if !interactable || el.bounds.is_degenerate() {
                continue;
            }
        }
        out.push(el);
    }

    out
}

fn parse_attrs(tag_body: &str) -> HashMap<String, String> {
    ATTR_PATTERN
        .captures_iter(tag_body)
        .map(|cap| (cap[1].to_string(), unescape_xml(&cap[2])))
        .collect()
}

fn canonicalize(attrs: &HashMap<String, String>) -> ParsedElement {
    let class = attrs.get("class").cloned().unwrap_or_default();
    let resource_id = attrs.get("resource-id").cloned().unwrap_or_default();
    let content_desc = attrs
        .get("content-desc")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let text = attrs
        .get("text")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let states = ElementStates {
        // enabled unless explicitly disabled
        enabled: attrs.get("enabled").map(String::as_str) != Some("false"),
        visible: attrs.get("visible-to-user").map(String::as_str) != Some("false"),
        focused: attrs.get("focused").map(String::as_str) == Some("true"),
        checked: attrs.get("checked").map(String::as_str) == Some("true"),
    };

    ParsedElement {
        role: class_to_role(&class).to_string(),
        name: resolve_name(&text, &content_desc, &resource_id, &class),
        value: if text.is_empty() { None } else { Some(text) },
        bounds: parse_bounds(attrs.get("bounds").map(String::as_str).unwrap_or("")),
        states,
        selectors: Selectors {
            ios: Default::default(),
            android: AndroidSelectors {
                resource_id: non_empty(resource_id),
                content_desc: non_empty(content_desc),
                class: non_empty(class),
            },
        },
    }
}

/// Name priority: visible text, then content description, then the
/// trailing segment of the resource id, then the trailing segment of the
/// fully-qualified class, else empty.
fn resolve_name(text: &str, content_desc: &str, resource_id: &str, class: &str) -> String {
    if !text.is_empty() {
        return text.to_string();
    }
    if !content_desc.is_empty() {
        return content_desc.to_string();
    }
    if !resource_id.is_empty() {
        return resource_id
            .rsplit('/')
            .next()
            .unwrap_or(resource_id)
            .to_string();
    }
    if !class.is_empty() {
        return class.rsplit('.').next().unwrap_or(class).to_string();
    }
    String::new()
}

fn class_to_role(class: &str) -> &'static str {
    match class {
        "android.widget.Button" => "button",
        "android.widget.EditText" => "textbox",
        "android.widget.CheckBox" => "checkbox",
        "android.widget.Switch" => "switch",
        _ => "unknown",
    }
}

/// Parse the `[l,t][r,b]` bounds literal. Malformed bounds degrade to
/// all-zero rather than failing the whole dump.
fn parse_bounds(raw: &str) -> Bounds {
    let Some(cap) = BOUNDS_PATTERN.captures(raw) else {
        return Bounds::default();
    };
    let l: f64 = cap[1].parse().unwrap_or(0.0);
    let t: f64 = cap[2].parse().unwrap_or(0.0);
    let r: f64 = cap[3].parse().unwrap_or(0.0);
    let b: f64 = cap[4].parse().unwrap_or(0.0);
    Bounds::new(l, t, r - l, b - t)
}

/// Decode the five XML character entities so the attribute map matches
/// what a conformant XML parser would produce.
fn unescape_xml(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
