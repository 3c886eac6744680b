use std::fmt;

use crate::config::ReconRules;
use crate::error::{ReconError, Result, Side};
use crate::model::Dataset;

/// Semantic role a column plays in a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    TargetQuantity,
    ActualQuantity,
    DealerCode,
    TargetSiteCode,
    ActualSiteCode,
}

impl ColumnRole {
    /// Roles each side must resolve, in the order they are checked.
    pub fn required_for(side: Side) -> [ColumnRole; 3] {
        match side {
            Side::Target => [Self::DealerCode, Self::TargetSiteCode, Self::TargetQuantity],
            Side::Actual => [Self::DealerCode, Self::ActualSiteCode, Self::ActualQuantity],
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TargetQuantity => "target quantity column",
            Self::ActualQuantity => "actual quantity column",
            Self::DealerCode => "dealer code column",
            Self::TargetSiteCode => "target site code column",
            Self::ActualSiteCode => "actual site code column",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    Found(String),
    NotFound,
}

impl ColumnMatch {
    pub fn found(&self) -> Option<&str> {
        match self {
            Self::Found(name) => Some(name),
            Self::NotFound => None,
        }
    }
}

/// First column (in stored order) whose name contains any keyword.
///
/// Comparison ignores ASCII case, so `Target` matches `target`.
pub fn find_column<S: AsRef<str>>(columns: &[String], keywords: &[S]) -> ColumnMatch {
    for name in columns {
        let lower = name.to_lowercase();
        if let Some(k) = keywords
            .iter()
            .map(AsRef::as_ref)
            .find(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
        {
            log::debug!("column resolver: '{name}' matched keyword '{k}'");
            return ColumnMatch::Found(name.clone());
        }
    }
    ColumnMatch::NotFound
}

/// Column playing `role`: keyword search for quantities, exact name for codes.
pub fn resolve(columns: &[String], role: ColumnRole, rules: &ReconRules) -> ColumnMatch {
    let exact = |wanted: &str| match columns.iter().find(|c| c.as_str() == wanted) {
        Some(c) => ColumnMatch::Found(c.clone()),
        None => ColumnMatch::NotFound,
    };
    match role {
        ColumnRole::TargetQuantity => find_column(columns, &rules.quantity.target),
        ColumnRole::ActualQuantity => find_column(columns, &rules.quantity.actual),
        ColumnRole::DealerCode => exact(&rules.columns.dealer_code),
        ColumnRole::TargetSiteCode => exact(&rules.columns.target_site_code),
        ColumnRole::ActualSiteCode => exact(&rules.columns.actual_site_code),
    }
}

/// Column indices one side of a reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideColumns {
    pub dealer: usize,
    pub site: usize,
    pub quantity: usize,
    pub quantity_name: String,
}

/// Resolve every role `side` requires, failing on the first one absent.
pub fn require_side(dataset: &Dataset, side: Side, key: &str, rules: &ReconRules) -> Result<SideColumns> {
    let mut found = [0usize; 3];
    let mut quantity_name = String::new();
    for (slot, role) in ColumnRole::required_for(side).into_iter().enumerate() {
        let name = match resolve(dataset.columns(), role, rules) {
            ColumnMatch::Found(name) => name,
            ColumnMatch::NotFound => {
                log::warn!("{side} dataset '{key}' has no {role}");
                return Err(ReconError::MissingColumn {
                    side,
                    key: key.to_string(),
                    role,
                });
            }
        };
        found[slot] = dataset
            .column_index(&name)
            .ok_or_else(|| ReconError::InvalidDataset(format!("column '{name}' vanished")))?;
        quantity_name = name;
    }
    Ok(SideColumns {
        dealer: found[0],
        site: found[1],
        quantity: found[2],
        quantity_name,
    })
}
