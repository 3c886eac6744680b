use std::fmt::Write as _;

use serde::Serialize;

use crate::config::MappingColumns;
use crate::error::{ReconError, Result};
use crate::model::Dataset;

/// One dealer/site pairing from the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRow {
    pub dealer_name: String,
    pub dealer_code: String,
    pub site_name: String,
    pub site_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Dealer,
    Site,
}

/// One interpretation of a queried code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeMatch {
    pub match_type: MatchKind,
    #[serde(flatten)]
    pub row: MappingRow,
    pub description: String,
}

/// Read-only dealer/site code table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeMapping {
    rows: Vec<MappingRow>,
}

impl CodeMapping {
    pub fn new(rows: Vec<MappingRow>) -> Self {
        Self { rows }
    }

    /// Build from a loaded sheet. Columns are found by name; a sheet lacking
    /// any of them is read positionally from its first four columns.
    pub fn from_dataset(dataset: &Dataset, columns: &MappingColumns) -> Result<Self> {
        let wanted = [
            &columns.dealer_name,
            &columns.dealer_code,
            &columns.site_name,
            &columns.site_code,
        ];
        let by_name: Option<Vec<usize>> = wanted.iter().map(|n| dataset.column_index(n)).collect();
        let idx = match by_name {
            Some(idx) => idx,
            None if dataset.column_count() >= 4 => {
                log::warn!(
                    "mapping table lacks the named code columns; reading the first four columns ({})",
                    dataset.columns()[..4].join(", ")
                );
                vec![0, 1, 2, 3]
            }
            None => {
                return Err(ReconError::InvalidDataset(format!(
                    "mapping table needs columns {}, {}, {}, {}",
                    wanted[0], wanted[1], wanted[2], wanted[3]
                )))
            }
        };

        let rows = dataset
            .rows()
            .iter()
            .map(|r| {
                let text = |i: usize| r.get(idx[i]).map(|c| c.key_text()).unwrap_or_default();
                MappingRow {
                    dealer_name: text(0),
                    dealer_code: text(1),
                    site_name: text(2),
                    site_code: text(3),
                }
            })
            .filter(|r| {
                !(r.dealer_name.is_empty()
                    && r.dealer_code.is_empty()
                    && r.site_name.is_empty()
                    && r.site_code.is_empty())
            })
            .collect::<Vec<_>>();
        log::info!("mapping table loaded with {} row(s)", rows.len());
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[MappingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row whose dealer code or site code equals `code` after trimming.
    /// Dealer interpretations come first.
    pub fn resolve(&self, code: &str) -> Vec<CodeMatch> {
        let code = code.trim();
        if code.is_empty() {
            return Vec::new();
        }
        let dealers = self.rows.iter().filter(|r| r.dealer_code == code).map(|r| CodeMatch {
            match_type: MatchKind::Dealer,
            description: format!(
                "dealer code {} is {}, paired with site {} ({})",
                r.dealer_code, r.dealer_name, r.site_name, r.site_code
            ),
            row: r.clone(),
        });
        let sites = self.rows.iter().filter(|r| r.site_code == code).map(|r| CodeMatch {
            match_type: MatchKind::Site,
            description: format!(
                "site code {} is {}, belonging to dealer {} ({})",
                r.site_code, r.site_name, r.dealer_name, r.dealer_code
            ),
            row: r.clone(),
        });
        dealers.chain(sites).collect()
    }

    /// Rows whose dealer or site name contains `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Vec<&MappingRow> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.rows
            .iter()
            .filter(|r| {
                r.dealer_name.to_lowercase().contains(&needle)
                    || r.site_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// `(dealer, site) → (dealer code, site code)`, one line per row.
    pub fn mapping_text(&self) -> String {
        let mut out = String::new();
        for r in &self.rows {
            let _ = writeln!(
                out,
                "({}, {}) → ({}, {})",
                r.dealer_name, r.site_name, r.dealer_code, r.site_code
            );
        }
        out
    }
}
