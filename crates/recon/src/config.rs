use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

// ---------------------------------------------------------------------------
// Top-level rules
// ---------------------------------------------------------------------------

/// Every column name and keyword list the heuristics depend on.
///
/// `Default` reproduces the dealership workbook conventions. A rules file
/// only needs to list what differs:
///
/// ```toml
/// [columns]
/// target_site_code = "據點編號"
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconRules {
    pub columns: ColumnNames,
    pub quantity: QuantityKeywords,
    pub classify: ClassifyRules,
    pub mapping: MappingColumns,
}

// ---------------------------------------------------------------------------
// Join columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    /// Exact dealer code column name, same on both sides.
    pub dealer_code: String,
    /// Site code column on target sheets.
    pub target_site_code: String,
    /// Site code column on actual sheets; also the merged site column.
    pub actual_site_code: String,
    /// Dealer display name carried through from the actual side.
    pub dealer_name: String,
    /// Site display name carried through from the actual side.
    pub site_name: String,
    /// Columns searched by a summary's dealer filter, when present.
    pub filter_columns: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            dealer_code: "經銷商代碼".into(),
            target_site_code: "據點代碼".into(),
            actual_site_code: "營業所代碼".into(),
            dealer_name: "經銷商名稱".into(),
            site_name: "據點".into(),
            filter_columns: strings(&["經銷商名稱", "據點", "營業所"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Quantity columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuantityKeywords {
    pub target: Vec<String>,
    pub actual: Vec<String>,
}

impl Default for QuantityKeywords {
    fn default() -> Self {
        Self {
            target: strings(&["target", "目標", "目標數", "目標銷售數"]),
            actual: strings(&["實績", "銷售", "受訂"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifyRules {
    /// Matched against the lowercased file and sheet names.
    pub target_keywords: Vec<String>,
    pub actual_keywords: Vec<String>,
    /// Intersected with the lowercased column names.
    pub target_columns: Vec<String>,
    pub actual_columns: Vec<String>,
}

impl Default for ClassifyRules {
    fn default() -> Self {
        Self {
            target_keywords: strings(&["目標", "target"]),
            actual_keywords: strings(&["統計", "實際", "actual", "實績"]),
            target_columns: strings(&["目標", "target", "銷售目標", "經銷商"]),
            actual_columns: strings(&["實際", "actual", "銷售", "銷售數", "實績"]),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingColumns {
    pub dealer_name: String,
    pub dealer_code: String,
    pub site_name: String,
    pub site_code: String,
}

impl Default for MappingColumns {
    fn default() -> Self {
        Self {
            dealer_name: "經銷商名稱".into(),
            dealer_code: "經銷商代碼".into(),
            site_name: "營業所名稱".into(),
            site_code: "營業所代碼".into(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconRules {
    pub fn from_toml(input: &str) -> Result<Self> {
        let rules: ReconRules =
            toml::from_str(input).map_err(|e| ReconError::RulesParse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReconError::RulesParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.columns;
        for (field, value) in [
            ("columns.dealer_code", &c.dealer_code),
            ("columns.target_site_code", &c.target_site_code),
            ("columns.actual_site_code", &c.actual_site_code),
            ("columns.dealer_name", &c.dealer_name),
            ("columns.site_name", &c.site_name),
            ("mapping.dealer_name", &self.mapping.dealer_name),
            ("mapping.dealer_code", &self.mapping.dealer_code),
            ("mapping.site_name", &self.mapping.site_name),
            ("mapping.site_code", &self.mapping.site_code),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::RulesValidation(format!("{field} must not be empty")));
            }
        }

        // Merged dataset columns must stay unique.
        let mut merged = HashSet::new();
        for name in [
            &c.dealer_code,
            &c.actual_site_code,
            &c.dealer_name,
            &c.site_name,
        ]
        .into_iter()
        .map(String::as_str)
        .chain(crate::engine::MERGED_VALUE_COLUMNS)
        {
            if !merged.insert(name) {
                return Err(ReconError::RulesValidation(format!(
                    "column name '{name}' is used for more than one merged column"
                )));
            }
        }

        for (field, list) in [
            ("quantity.target", &self.quantity.target),
            ("quantity.actual", &self.quantity.actual),
            ("classify.target_keywords", &self.classify.target_keywords),
            ("classify.actual_keywords", &self.classify.actual_keywords),
            ("classify.target_columns", &self.classify.target_columns),
            ("classify.actual_columns", &self.classify.actual_columns),
        ] {
            if list.is_empty() {
                return Err(ReconError::RulesValidation(format!("{field} must list at least one entry")));
            }
            if list.iter().any(|k| k.is_empty()) {
                return Err(ReconError::RulesValidation(format!("{field} contains an empty entry")));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let rules = ReconRules::default();
        rules.validate().unwrap();
        assert_eq!(rules.columns.dealer_code, "經銷商代碼");
        assert_eq!(rules.columns.target_site_code, "據點代碼");
        assert_eq!(rules.columns.actual_site_code, "營業所代碼");
        assert_eq!(rules.quantity.actual, vec!["實績", "銷售", "受訂"]);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ReconRules::from_toml("").unwrap(), ReconRules::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let rules = ReconRules::from_toml(
            r#"
[columns]
target_site_code = "據點編號"

[quantity]
actual = ["販賣數"]
"#,
        )
        .unwrap();
        assert_eq!(rules.columns.target_site_code, "據點編號");
        assert_eq!(rules.columns.dealer_code, "經銷商代碼");
        assert_eq!(rules.quantity.actual, vec!["販賣數"]);
        assert_eq!(rules.quantity.target, QuantityKeywords::default().target);
    }

    #[test]
    fn reject_empty_keyword_list() {
        let err = ReconRules::from_toml("[classify]\ntarget_keywords = []\n").unwrap_err();
        assert!(err.to_string().contains("classify.target_keywords"));
    }

    #[test]
    fn reject_unknown_field() {
        let err = ReconRules::from_toml("[columns]\ndealer = \"x\"\n").unwrap_err();
        assert!(matches!(err, ReconError::RulesParse(_)));
    }

    #[test]
    fn reject_colliding_merged_columns() {
        let err = ReconRules::from_toml("[columns]\nsite_name = \"營業所代碼\"\n").unwrap_err();
        assert!(err.to_string().contains("more than one merged column"));
    }

    #[test]
    fn toml_round_trip() {
        let rules = ReconRules::default();
        let text = rules.to_toml().unwrap();
        assert_eq!(ReconRules::from_toml(&text).unwrap(), rules);
    }
}
