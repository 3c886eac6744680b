//! Named-operation surface for an automated caller.
//!
//! Every call returns a JSON value: the operation's payload on success, or
//! `{"error": ..., "error_kind": ...}` on failure. Nothing here panics on bad
//! input.

use salesgrid_protocol::{
    error_payload, parse_arguments, ClassifySourceArgs, CompareArgs, FindByNameArgs,
    PreviewDatasetArgs, ResolveCodeArgs, SummarizeArgs, ToolName, ToolRequest, ToolResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::classify::{classify_all, classify_source};
use crate::config::ReconRules;
use crate::engine::reconcile;
use crate::error::{ReconError, Result};
use crate::mapping::CodeMapping;
use crate::registry::Registry;
use crate::summary::summarize;

/// Rows returned by `preview_dataset` when the caller does not say.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Registry, rules, and the optional code mapping behind one caller.
#[derive(Debug, Clone)]
pub struct Session {
    registry: Registry,
    mapping: Option<CodeMapping>,
    rules: ReconRules,
    preview_rows: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ReconRules::default())
    }
}

impl Session {
    pub fn new(rules: ReconRules) -> Self {
        Self {
            registry: Registry::new(),
            mapping: None,
            rules,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    pub fn with_mapping(mut self, mapping: CodeMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn rules(&self) -> &ReconRules {
        &self.rules
    }

    pub fn mapping(&self) -> Option<&CodeMapping> {
        self.mapping.as_ref()
    }

    /// Run one tool, folding failures into an error payload.
    pub fn call(&mut self, tool: &str, arguments: &Value) -> Value {
        match self.try_call(tool, arguments) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("tool {tool} failed: {e}");
                error_payload(e.kind(), e.to_string())
            }
        }
    }

    /// Same as [`Session::call`] but framed with the request id.
    pub fn handle(&mut self, request: ToolRequest) -> ToolResponse {
        match self.try_call(&request.tool, &request.arguments) {
            Ok(v) => ToolResponse::success(request.id, v),
            Err(e) => {
                log::warn!("tool {} failed: {e}", request.tool);
                ToolResponse::failure(request.id, e.kind(), e.to_string())
            }
        }
    }

    pub fn try_call(&mut self, tool: &str, arguments: &Value) -> Result<Value> {
        let name: ToolName = tool
            .parse()
            .map_err(|_| ReconError::UnknownTool(tool.to_string()))?;
        log::debug!("tool call: {name} {arguments}");

        match name {
            ToolName::ListDatasets => {
                let datasets = self.registry.list();
                Ok(json!({ "count": datasets.len(), "datasets": to_value(&datasets)? }))
            }
            ToolName::PreviewDataset => {
                let args: PreviewDatasetArgs = parse_args(name, arguments)?;
                let rows = args.rows.unwrap_or(self.preview_rows);
                to_value(&self.registry.preview(&args.key, rows)?)
            }
            ToolName::ClassifySource => {
                let args: ClassifySourceArgs = parse_args(name, arguments)?;
                to_value(&classify_source(&self.registry, &args.source, &self.rules)?)
            }
            ToolName::ListAndClassify => to_value(&classify_all(&self.registry, &self.rules)),
            ToolName::CompareTargetVsActual => {
                let args: CompareArgs = parse_args(name, arguments)?;
                to_value(&reconcile(
                    &mut self.registry,
                    &args.target_key,
                    &args.actual_key,
                    &self.rules,
                )?)
            }
            ToolName::SummarizePerformance => {
                let args: SummarizeArgs = parse_args(name, arguments)?;
                to_value(&summarize(
                    &self.registry,
                    &args.merged_key,
                    args.dealer_name.as_deref(),
                    &self.rules,
                )?)
            }
            ToolName::ResolveCode => {
                let args: ResolveCodeArgs = parse_args(name, arguments)?;
                let matches = self.require_mapping()?.resolve(&args.code);
                Ok(json!({
                    "code": args.code.trim(),
                    "count": matches.len(),
                    "matches": to_value(&matches)?,
                }))
            }
            ToolName::FindByName => {
                let args: FindByNameArgs = parse_args(name, arguments)?;
                let matches = self.require_mapping()?.find_by_name(&args.name);
                Ok(json!({
                    "name": args.name,
                    "count": matches.len(),
                    "matches": to_value(&matches)?,
                }))
            }
            ToolName::MappingText => {
                let mapping = self.require_mapping()?;
                Ok(json!({ "rows": mapping.len(), "text": mapping.mapping_text() }))
            }
        }
    }

    fn require_mapping(&self) -> Result<&CodeMapping> {
        self.mapping.as_ref().ok_or(ReconError::MappingUnavailable)
    }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, arguments: &Value) -> Result<T> {
    parse_arguments(arguments).map_err(|message| ReconError::InvalidArguments {
        tool: tool.to_string(),
        message,
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ReconError::InvalidDataset(format!("unserializable result: {e}")))
}
