use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ClassifyRules, ReconRules};
use crate::error::{ReconError, Result};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Target,
    Actual,
    Unknown,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Actual => write!(f, "actual"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Label for one source plus the evidence that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifyResult {
    pub source: String,
    pub classification: Classification,
    pub reason: String,
    /// Sheet that fired the rule; absent for `unknown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched_columns: Vec<String>,
}

/// Every loaded source grouped by label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    pub target: Vec<String>,
    pub actual: Vec<String>,
    pub unknown: Vec<String>,
    pub results: Vec<ClassifyResult>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct Hit {
    keyword: String,
    columns: Vec<String>,
}

/// Name keyword found in the file or sheet name, and indicator columns
/// present in `lowered` (reported in indicator order).
fn evaluate(names: &[&str], lowered: &[String], keywords: &[String], indicators: &[String]) -> Option<Hit> {
    let keyword = keywords.iter().find(|k| {
        let k = k.to_lowercase();
        names.iter().any(|n| n.contains(&k))
    })?;
    let columns: Vec<String> = indicators
        .iter()
        .filter(|ind| lowered.contains(&ind.to_lowercase()))
        .cloned()
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some(Hit {
        keyword: keyword.clone(),
        columns,
    })
}

/// Apply the target rule, then the actual rule, to one sheet.
pub fn classify_sheet(
    source: &str,
    sheet: &str,
    columns: &[String],
    rules: &ClassifyRules,
) -> Option<ClassifyResult> {
    let source_lower = source.to_lowercase();
    let sheet_lower = sheet.to_lowercase();
    let names = [source_lower.as_str(), sheet_lower.as_str()];
    let lowered: Vec<String> = columns.iter().map(|c| c.trim().to_lowercase()).collect();

    let (classification, hit) = if let Some(hit) =
        evaluate(&names, &lowered, &rules.target_keywords, &rules.target_columns)
    {
        (Classification::Target, hit)
    } else if let Some(hit) =
        evaluate(&names, &lowered, &rules.actual_keywords, &rules.actual_columns)
    {
        (Classification::Actual, hit)
    } else {
        log::debug!("classify: '{source}' sheet '{sheet}' matched no rule");
        return None;
    };

    let reason = format!(
        "sheet '{sheet}': name contains '{}', columns {} indicate {classification}",
        hit.keyword,
        hit.columns.join(", ")
    );
    log::debug!("classify: '{source}' -> {classification} ({reason})");
    Some(ClassifyResult {
        source: source.to_string(),
        classification,
        reason,
        sheet: Some(sheet.to_string()),
        keyword: Some(hit.keyword),
        matched_columns: hit.columns,
    })
}

/// Classify a source from its sheets in stored order; the first sheet that
/// fires a rule decides.
pub fn classify<'a, I>(source: &str, sheets: I, rules: &ClassifyRules) -> ClassifyResult
where
    I: IntoIterator<Item = (&'a str, &'a [String])>,
{
    let mut evaluated = 0usize;
    for (sheet, columns) in sheets {
        evaluated += 1;
        if let Some(result) = classify_sheet(source, sheet, columns, rules) {
            return result;
        }
    }
    ClassifyResult {
        source: source.to_string(),
        classification: Classification::Unknown,
        reason: format!("no target or actual evidence in {evaluated} sheet(s)"),
        sheet: None,
        keyword: None,
        matched_columns: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Registry-backed
// ---------------------------------------------------------------------------

pub fn classify_source(registry: &Registry, source: &str, rules: &ReconRules) -> Result<ClassifyResult> {
    let sheets = registry.sheets(source);
    if sheets.is_empty() {
        return Err(ReconError::NotFound {
            key: source.to_string(),
        });
    }
    Ok(classify(
        source,
        sheets.iter().map(|(name, ds)| (*name, ds.columns())),
        &rules.classify,
    ))
}

pub fn classify_all(registry: &Registry, rules: &ReconRules) -> ClassificationReport {
    let mut report = ClassificationReport {
        target: Vec::new(),
        actual: Vec::new(),
        unknown: Vec::new(),
        results: Vec::new(),
    };
    for source in registry.sources() {
        let sheets = registry.sheets(source);
        let result = classify(
            source,
            sheets.iter().map(|(name, ds)| (*name, ds.columns())),
            &rules.classify,
        );
        let bucket = match result.classification {
            Classification::Target => &mut report.target,
            Classification::Actual => &mut report.actual,
            Classification::Unknown => &mut report.unknown,
        };
        bucket.push(source.to_string());
        report.results.push(result);
    }
    report
}
