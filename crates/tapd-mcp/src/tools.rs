//! MCP tool definitions
//!
//! The tool surface agents see. Selector-taking tools share one token
//! grammar: `@e<N>` (ref from the latest snapshot), `coords:<x>,<y>`,
//! `text:"<exact>"`, `id:"<value>"`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool definition following the MCP schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for input parameters
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Tool result content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// A successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: None,
        }
    }

    /// A successful JSON result.
    pub fn json<T: Serialize>(value: &T) -> Self {
        let text = serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        ToolResult::text(text)
    }

    /// An error result.
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult {
            content: vec![ToolContent::Text {
                text: json!({ "error": message.into() }).to_string(),
            }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error == Some(true)
    }
}

/// A selector token argument, shared by the selector-taking tools.
fn selector_schema() -> Value {
    json!({
        "type": "string",
        "description": "Selector token: @e<N> (ref from latest snapshot), coords:<x>,<y>, text:\"<exact name>\", or id:\"<platform id>\""
    })
}

/// Generate all tool definitions.
pub fn all_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "ui_snapshot",
            "Capture the current native UI as a canonical element tree. Each element gets a ref (@e1, @e2, ...) usable with ui_tap/ui_type/ui_describe until the next snapshot.",
            json!({
                "type": "object",
                "properties": {
                    "interactiveOnly": {
                        "type": "boolean",
                        "description": "Only keep tappable elements (buttons, text fields, links, checkboxes, switches) with a visible area. Default false."
                    }
                }
            }),
        ),
        ToolDefinition::new(
            "ui_tap",
            "Tap an element or point. Resolves the selector against the latest snapshot and taps the element's bounds center (or the literal coords).",
            json!({
                "type": "object",
                "properties": {
                    "selector": selector_schema()
                },
                "required": ["selector"]
            }),
        ),
        ToolDefinition::new(
            "ui_type",
            "Type text into the app. If a selector is given, taps that element first to focus it.",
            json!({
                "type": "object",
                "properties": {
                    "selector": selector_schema(),
                    "text": {
                        "type": "string",
                        "description": "Text to type"
                    }
                },
                "required": ["text"]
            }),
        ),
        ToolDefinition::new(
            "ui_describe",
            "Resolve a selector against the latest snapshot and return the matched element (or point) without touching the device. Useful for assertions.",
            json!({
                "type": "object",
                "properties": {
                    "selector": selector_schema()
                },
                "required": ["selector"]
            }),
        ),
        ToolDefinition::new(
            "runs_gc",
            "Plan (and optionally apply) retention over accumulated run directories: always keep the newest runs, keep recent failures, stay under a byte budget.",
            json!({
                "type": "object",
                "properties": {
                    "keepLast": {
                        "type": "integer",
                        "description": "Always keep this many most-recent runs (default 5)"
                    },
                    "keepFailureDays": {
                        "type": "integer",
                        "description": "Keep failed/unknown runs younger than this many days (default 7)"
                    },
                    "maxBytes": {
                        "type": "integer",
                        "description": "Total byte budget across retained runs (default 1 GiB)"
                    },
                    "dryRun": {
                        "type": "boolean",
                        "description": "Compute the plan without deleting anything. Default true."
                    }
                }
            }),
        ),
    ]
}

/// Look up a tool definition by name.
pub fn get_tool(name: &str) -> Option<ToolDefinition> {
    all_tools().into_iter().find(|t| t.name == name)
}
