use std::fmt;

use salesgrid_protocol::ErrorKind;
use thiserror::Error;

use crate::column::ColumnRole;

/// Which input of a reconciliation a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Target,
    Actual,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Actual => write!(f, "actual"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Registry key absent.
    #[error("dataset not found in registry: {key}")]
    NotFound { key: String },

    /// Key exists but was not produced by a reconciliation.
    #[error("'{key}' is not a reconciliation result; run compare_target_vs_actual first")]
    NotReconciled { key: String },

    /// A required semantic column could not be resolved.
    #[error("{side} dataset '{key}' is missing the {role}")]
    MissingColumn {
        side: Side,
        key: String,
        role: ColumnRole,
    },

    /// A dealer filter matched zero merged rows.
    #[error("no merged rows match dealer filter '{filter}'")]
    NoMatch { filter: String },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Merged datasets are only replaced by a new reconciliation.
    #[error("'{0}' holds a reconciliation result and cannot be overwritten by a load")]
    ReadOnlyKey(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("no dealer/site code mapping table is loaded")]
    MappingUnavailable,

    #[error("rules parse error: {0}")]
    RulesParse(String),

    #[error("rules validation error: {0}")]
    RulesValidation(String),
}

impl ReconError {
    /// Category reported to tool callers alongside the message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::NotReconciled { .. } => ErrorKind::NotFound,
            Self::MissingColumn { .. } => ErrorKind::MissingColumn,
            Self::NoMatch { .. } => ErrorKind::NoMatch,
            Self::InvalidDataset(_) => ErrorKind::InvalidDataset,
            Self::ReadOnlyKey(_) => ErrorKind::ReadOnlyKey,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::MappingUnavailable => ErrorKind::MappingUnavailable,
            Self::RulesParse(_) | Self::RulesValidation(_) => ErrorKind::InvalidRules,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;
