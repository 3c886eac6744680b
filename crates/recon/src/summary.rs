use crate::aggregate::{coerce, missing_aware_sum};
use crate::config::ReconRules;
use crate::engine::{ACTUAL_SALES, MET_TARGET, TARGET_SALES};
use crate::error::{ReconError, Result};
use crate::metrics::{achievement_rate, percentage};
use crate::model::{Cell, Dataset, Summary};
use crate::registry::Registry;

/// Totals over a reconciliation result, optionally narrowed to rows whose
/// dealer or site name (or dealer code) contains `dealer_filter`.
///
/// Achievement counts come from the stored met flags; the raw inputs are
/// never reopened.
pub fn summarize(
    registry: &Registry,
    merged_key: &str,
    dealer_filter: Option<&str>,
    rules: &ReconRules,
) -> Result<Summary> {
    let merged = registry.require(merged_key)?;
    if !registry.origin(merged_key).is_some_and(|o| o.is_merged()) {
        return Err(ReconError::NotReconciled {
            key: merged_key.to_string(),
        });
    }

    let column = |name: &str| {
        merged.column_index(name).ok_or_else(|| {
            ReconError::InvalidDataset(format!("'{merged_key}' has no '{name}' column"))
        })
    };
    let target_col = column(TARGET_SALES)?;
    let actual_col = column(ACTUAL_SALES)?;
    let met_col = column(MET_TARGET)?;

    let filter = dealer_filter.map(str::trim).filter(|f| !f.is_empty());
    let rows: Vec<&Vec<Cell>> = match filter {
        Some(f) => {
            let selected = filter_rows(merged, f, rules);
            if selected.is_empty() {
                log::warn!("summary: filter '{f}' matched no rows of '{merged_key}'");
                return Err(ReconError::NoMatch {
                    filter: f.to_string(),
                });
            }
            selected
        }
        None => merged.rows().iter().collect(),
    };

    let record_count = rows.len();
    let met_count = rows
        .iter()
        .filter(|r| r.get(met_col).and_then(Cell::as_bool).unwrap_or(false))
        .count();
    let (total_target, _) = missing_aware_sum(rows.iter().filter_map(|r| r.get(target_col)).map(coerce));
    let (total_actual, _) = missing_aware_sum(rows.iter().filter_map(|r| r.get(actual_col)).map(coerce));
    let met_rate = percentage(met_count, record_count);
    let overall_rate = achievement_rate(total_actual, total_target);

    let scope = match filter {
        Some(f) => format!("'{f}'"),
        None => "all dealers".to_string(),
    };
    let summary_text = format!(
        "{scope}: {met_count} of {record_count} record(s) met target ({met_rate:.1}%), \
         actual {} vs target {} ({overall_rate:.1}%)",
        crate::model::format_number(total_actual),
        crate::model::format_number(total_target),
    );

    Ok(Summary {
        merged_key: merged_key.to_string(),
        dealer_filter: filter.map(str::to_string),
        record_count,
        met_count,
        met_rate,
        total_target,
        total_actual,
        overall_rate,
        summary_text,
    })
}

/// Rows where any filter column contains `filter`, ignoring case.
fn filter_rows<'a>(merged: &'a Dataset, filter: &str, rules: &ReconRules) -> Vec<&'a Vec<Cell>> {
    let needle = filter.to_lowercase();
    let searched: Vec<usize> = rules
        .columns
        .filter_columns
        .iter()
        .chain([&rules.columns.dealer_name, &rules.columns.dealer_code])
        .filter_map(|name| merged.column_index(name))
        .fold(Vec::new(), |mut acc, i| {
            if !acc.contains(&i) {
                acc.push(i);
            }
            acc
        });
    merged
        .rows()
        .iter()
        .filter(|row| {
            searched.iter().any(|&c| {
                row.get(c)
                    .is_some_and(|cell| cell.key_text().to_lowercase().contains(&needle))
            })
        })
        .collect()
}
