use crate::aggregate::aggregate;
use crate::column::require_side;
use crate::config::ReconRules;
use crate::error::{Result, Side};
use crate::matcher::join_on_codes;
use crate::metrics::percentage;
use crate::model::{Cell, Dataset, MergedRecord, ReconDiagnostics, ReconResult};
use crate::registry::{merge_key, Origin, Registry};

pub const TARGET_SALES: &str = "target_sales";
pub const ACTUAL_SALES: &str = "actual_sales";
pub const MET_TARGET: &str = "達標";

/// Value columns every merged dataset ends with.
pub const MERGED_VALUE_COLUMNS: [&str; 3] = [TARGET_SALES, ACTUAL_SALES, MET_TARGET];

/// Join one target dataset against one actual dataset by dealer and site
/// code, store the merged dataset under its merge key, and report it.
///
/// Both sides are aggregated first. Unparseable quantity cells count as
/// missing and add nothing; no input row is dropped before the join.
/// Codes present on only one side do not reach the result.
pub fn reconcile(
    registry: &mut Registry,
    target_key: &str,
    actual_key: &str,
    rules: &ReconRules,
) -> Result<ReconResult> {
    let target = registry.require(target_key)?;
    let actual = registry.require(actual_key)?;

    let tcols = require_side(target, Side::Target, target_key, rules)?;
    let acols = require_side(actual, Side::Actual, actual_key, rules)?;

    // Display names present on the actual side ride along as group keys.
    let carried: Vec<(String, usize)> = [&rules.columns.dealer_name, &rules.columns.site_name]
        .into_iter()
        .filter_map(|name| actual.column_index(name).map(|i| (name.clone(), i)))
        .collect();

    let target_agg = aggregate(target, &[tcols.dealer, tcols.site], tcols.quantity);
    let mut actual_keys = vec![acols.dealer, acols.site];
    actual_keys.extend(carried.iter().map(|(_, i)| *i));
    let actual_agg = aggregate(actual, &actual_keys, acols.quantity);

    for (key, missing) in [(target_key, target_agg.missing), (actual_key, actual_agg.missing)] {
        if missing > 0 {
            log::warn!("{missing} quantity cell(s) in '{key}' are not numeric and were excluded from sums");
        }
    }

    let joined = join_on_codes(&target_agg.groups, &actual_agg.groups);

    let mut columns = vec![
        rules.columns.dealer_code.clone(),
        rules.columns.actual_site_code.clone(),
        TARGET_SALES.to_string(),
    ];
    columns.extend(carried.iter().map(|(name, _)| name.clone()));
    columns.push(ACTUAL_SALES.to_string());
    columns.push(MET_TARGET.to_string());
    let merge_columns = columns.clone();
    let mut merged = Dataset::with_columns(columns)?;

    let has_dealer_name = carried.iter().any(|(n, _)| n == &rules.columns.dealer_name);
    let has_site_name = carried.iter().any(|(n, _)| n == &rules.columns.site_name);

    let mut records = Vec::with_capacity(joined.matched.len());
    for pair in &joined.matched {
        let target_sales = pair.target.total;
        let actual_sales = pair.actual.total;
        let met_target = actual_sales >= target_sales;
        let names = &pair.actual.key[2..];

        let mut row = vec![
            Cell::text(pair.target.key[0].clone()),
            Cell::text(pair.target.key[1].clone()),
            Cell::Number(target_sales),
        ];
        row.extend(names.iter().map(|n| {
            if n.is_empty() {
                Cell::Empty
            } else {
                Cell::text(n.clone())
            }
        }));
        row.push(Cell::Number(actual_sales));
        row.push(Cell::Bool(met_target));
        merged.push_row(row)?;

        let mut names = names.iter().cloned();
        records.push(MergedRecord {
            dealer_code: pair.target.key[0].clone(),
            site_code: pair.target.key[1].clone(),
            dealer_name: if has_dealer_name { names.next() } else { None },
            site_name: if has_site_name { names.next() } else { None },
            target_sales,
            actual_sales,
            met_target,
        });
    }

    let record_count = records.len();
    let met_count = records.iter().filter(|r| r.met_target).count();
    let met_rate = percentage(met_count, record_count);
    let merged_key = merge_key(target_key, actual_key);

    let diagnostics = ReconDiagnostics {
        target_rows: target_agg.rows,
        actual_rows: actual_agg.rows,
        missing_target_cells: target_agg.missing,
        missing_actual_cells: actual_agg.missing,
        unmatched_target: joined.target_only.len(),
        unmatched_actual: joined.actual_only.len(),
    };
    let summary_text = format!(
        "{record_count} dealer/site record(s) compared, {met_count} met target ({met_rate:.1}%)"
    );

    let result = ReconResult {
        merged_key: merged_key.clone(),
        target_key: target_key.to_string(),
        actual_key: actual_key.to_string(),
        merge_columns,
        target_quantity_column: tcols.quantity_name,
        actual_quantity_column: acols.quantity_name,
        record_count,
        met_count,
        met_rate,
        summary_text,
        diagnostics,
        records,
    };

    log::info!(
        "reconcile: {target_key} x {actual_key} -> {merged_key}: {record_count} records, {met_count} met, {} target-only, {} actual-only",
        result.diagnostics.unmatched_target,
        result.diagnostics.unmatched_actual
    );

    registry.insert_merged(
        merged_key,
        merged,
        Origin::Merged {
            target_key: target_key.to_string(),
            actual_key: actual_key.to_string(),
        },
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn target(rows: &[(&str, &str, Cell)]) -> Dataset {
        Dataset::new(
            cols(&["經銷商代碼", "據點代碼", "目標數"]),
            rows.iter()
                .map(|(d, s, q)| vec![Cell::from(*d), Cell::from(*s), q.clone()])
                .collect(),
        )
        .unwrap()
    }

    fn actual(rows: &[(&str, &str, &str, Cell)]) -> Dataset {
        Dataset::new(
            cols(&["經銷商代碼", "經銷商名稱", "營業所代碼", "銷售數"]),
            rows.iter()
                .map(|(d, n, s, q)| vec![Cell::from(*d), Cell::from(*n), Cell::from(*s), q.clone()])
                .collect(),
        )
        .unwrap()
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.insert(
            "目標.xlsx::s",
            target(&[("D1", "S1", Cell::from(100.0)), ("D1", "S2", Cell::from(50.0))]),
        )
        .unwrap();
        reg.insert(
            "實績.xlsx::s",
            actual(&[
                ("D1", "一號", "S1", Cell::from(70.0)),
                ("D1", "一號", "S1", Cell::from(50.0)),
                ("D1", "一號", "S2", Cell::from(40.0)),
            ]),
        )
        .unwrap();
        reg
    }

    #[test]
    fn merged_layout_and_flags() {
        let mut reg = registry();
        let rules = ReconRules::default();
        let res = reconcile(&mut reg, "目標.xlsx::s", "實績.xlsx::s", &rules).unwrap();

        assert_eq!(res.merged_key, "merged_目標.xlsx_實績.xlsx");
        assert_eq!(
            res.merge_columns,
            vec!["經銷商代碼", "營業所代碼", "target_sales", "經銷商名稱", "actual_sales", "達標"]
        );
        assert_eq!(res.record_count, 2);
        assert_eq!(res.met_count, 1);
        assert_eq!(res.met_rate, 50.0);
        assert_eq!(res.records[0].actual_sales, 120.0);
        assert_eq!(res.records[0].dealer_name.as_deref(), Some("一號"));
        assert_eq!(res.records[0].site_name, None);
        assert!(!res.records[1].met_target);
        assert_eq!(res.target_quantity_column, "目標數");
        assert_eq!(res.actual_quantity_column, "銷售數");
        assert_eq!(res.diagnostics.actual_rows, 3);

        let merged = reg.get(&res.merged_key).unwrap();
        assert_eq!(merged.row_count(), 2);
        assert_eq!(merged.cell(0, 5), Some(&Cell::Bool(true)));
        assert!(reg.origin(&res.merged_key).unwrap().is_merged());
    }

    #[test]
    fn tie_counts_as_met() {
        let mut reg = Registry::new();
        reg.insert("t::s", target(&[("D1", "S1", Cell::from(10.0))])).unwrap();
        reg.insert("a::s", actual(&[("D1", "x", "S1", Cell::from(10.0))])).unwrap();
        let res = reconcile(&mut reg, "t::s", "a::s", &ReconRules::default()).unwrap();
        assert!(res.records[0].met_target);
    }

    #[test]
    fn missing_key_is_not_found() {
        let mut reg = registry();
        let err = reconcile(&mut reg, "nope::s", "實績.xlsx::s", &ReconRules::default()).unwrap_err();
        assert!(matches!(err, ReconError::NotFound { ref key } if key == "nope::s"));
    }

    #[test]
    fn missing_quantity_column_names_role() {
        let mut reg = registry();
        reg.insert(
            "bad::s",
            Dataset::new(
                cols(&["經銷商代碼", "營業所代碼", "備註"]),
                vec![vec![Cell::from("D1"), Cell::from("S1"), Cell::Empty]],
            )
            .unwrap(),
        )
        .unwrap();
        let err = reconcile(&mut reg, "目標.xlsx::s", "bad::s", &ReconRules::default()).unwrap_err();
        assert!(err.to_string().contains("actual quantity column"));
        assert!(!reg.contains("merged_目標.xlsx_bad"));
    }

    #[test]
    fn empty_join_has_zero_rate() {
        let mut reg = Registry::new();
        reg.insert("t::s", target(&[("D1", "S1", Cell::from(10.0))])).unwrap();
        reg.insert("a::s", actual(&[("D9", "x", "S9", Cell::from(10.0))])).unwrap();
        let res = reconcile(&mut reg, "t::s", "a::s", &ReconRules::default()).unwrap();
        assert_eq!(res.record_count, 0);
        assert_eq!(res.met_rate, 0.0);
        assert_eq!(res.diagnostics.unmatched_target, 1);
        assert_eq!(res.diagnostics.unmatched_actual, 1);
    }
}
