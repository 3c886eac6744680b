//! salesgrid tool-call protocol: wire format between an orchestrator and the
//! reconciliation engine.
//!
//! The wire format is JSONL (newline-delimited JSON) over stdin/stdout. Each
//! request names a tool and carries a JSON object of arguments; each response
//! carries either a `result` payload or an `error` message. Callers branch on
//! the presence of `error`.
//!
//! # Usage
//!
//! ```ignore
//! use salesgrid_protocol::{ToolRequest, ToolResponse};
//!
//! let request = salesgrid_protocol::parse_request_line(&line)?;
//! let response = ToolResponse::success(request.id.clone(), payload);
//! println!("{}", response.to_line());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version. Increment for breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Longest request line accepted by [`parse_request_line`].
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

// =============================================================================
// Tool names
// =============================================================================

/// Every operation the engine exposes to an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ListDatasets,
    PreviewDataset,
    ClassifySource,
    ListAndClassify,
    CompareTargetVsActual,
    SummarizePerformance,
    ResolveCode,
    FindByName,
    MappingText,
}

impl ToolName {
    pub const ALL: [ToolName; 9] = [
        ToolName::ListDatasets,
        ToolName::PreviewDataset,
        ToolName::ClassifySource,
        ToolName::ListAndClassify,
        ToolName::CompareTargetVsActual,
        ToolName::SummarizePerformance,
        ToolName::ResolveCode,
        ToolName::FindByName,
        ToolName::MappingText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListDatasets => "list_datasets",
            Self::PreviewDataset => "preview_dataset",
            Self::ClassifySource => "classify_source",
            Self::ListAndClassify => "list_and_classify",
            Self::CompareTargetVsActual => "compare_target_vs_actual",
            Self::SummarizePerformance => "summarize_performance",
            Self::ResolveCode => "resolve_code",
            Self::FindByName => "find_by_name",
            Self::MappingText => "mapping_text",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool: {s}"))
    }
}

// =============================================================================
// Requests
// =============================================================================

/// A single tool invocation.
///
/// `tool` stays a plain string so that an unknown name still deserializes and
/// can be answered with a structured `unknown_tool` error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(tool: ToolName, arguments: Value) -> Self {
        Self {
            id: None,
            tool: tool.as_str().to_string(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewDatasetArgs {
    pub key: String,
    #[serde(default)]
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifySourceArgs {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareArgs {
    pub target_key: String,
    pub actual_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizeArgs {
    pub merged_key: String,
    /// Case-insensitive substring matched against dealer/site names.
    #[serde(default)]
    pub dealer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveCodeArgs {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindByNameArgs {
    pub name: String,
}

/// Deserialize a tool's argument object. A missing (`null`) argument value
/// is treated as an empty object so that required fields are reported by name.
pub fn parse_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, String> {
    let value = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        Value::Object(_) => arguments.clone(),
        other => {
            return Err(format!(
                "arguments must be a JSON object, got {}",
                json_type_name(other)
            ))
        }
    };
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Machine-readable error category attached to every failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    MissingColumn,
    NoMatch,
    InvalidArguments,
    UnknownTool,
    MappingUnavailable,
    InvalidDataset,
    ReadOnlyKey,
    InvalidRules,
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::MissingColumn => "missing_column",
            Self::NoMatch => "no_match",
            Self::InvalidArguments => "invalid_arguments",
            Self::UnknownTool => "unknown_tool",
            Self::MappingUnavailable => "mapping_unavailable",
            Self::InvalidDataset => "invalid_dataset",
            Self::ReadOnlyKey => "read_only_key",
            Self::InvalidRules => "invalid_rules",
            Self::Protocol => "protocol",
        };
        f.write_str(s)
    }
}

/// Response to a [`ToolRequest`]. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResponse {
    pub fn success(id: Option<String>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(id: Option<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize as a single JSONL line (no trailing newline).
    pub fn to_line(&self) -> String {
        // A response holds only strings and JSON values, so this cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"error":"serialization failed: {e}","error_kind":"protocol"}}"#)
        })
    }
}

/// Build the `{"error": ..., "error_kind": ...}` payload used when a tool is
/// called directly rather than through a [`ToolRequest`].
pub fn error_payload(kind: ErrorKind, message: impl Into<String>) -> Value {
    serde_json::json!({
        "error": message.into(),
        "error_kind": kind,
    })
}

// =============================================================================
// JSONL framing
// =============================================================================

/// Parse one JSONL line. Blank lines yield `Ok(None)`.
pub fn parse_request_line(line: &str) -> Result<Option<ToolRequest>, String> {
    if line.len() > MAX_LINE_BYTES {
        return Err(format!(
            "request line of {} bytes exceeds limit of {MAX_LINE_BYTES}",
            line.len()
        ));
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| format!("malformed request: {e}"))
}
