//! `sgrid reconcile`: target vs actual for one pair of sheets.

use std::path::{Path, PathBuf};

use serde_json::json;

use salesgrid_io::source_name;
use salesgrid_recon::model::{format_number, Dataset};
use salesgrid_recon::{reconcile, summarize, Classification, ReconResult, Registry, Summary};

use crate::inputs::{load_all, pick_sheet, print_json, Context};
use crate::CliError;

pub struct ReconcileArgs {
    pub target: PathBuf,
    pub actual: PathBuf,
    pub target_sheet: Option<String>,
    pub actual_sheet: Option<String>,
    pub dealer: Option<String>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

pub fn cmd_reconcile(ctx: &Context, args: ReconcileArgs) -> Result<(), CliError> {
    let rules = ctx.rules()?;
    let mut registry = Registry::new();
    load_all(&mut registry, &[args.target.clone(), args.actual.clone()])?;

    let target_key = pick_sheet(
        &registry,
        &source_name(&args.target),
        args.target_sheet.as_deref(),
        Classification::Target,
        &rules,
    )?;
    let actual_key = pick_sheet(
        &registry,
        &source_name(&args.actual),
        args.actual_sheet.as_deref(),
        Classification::Actual,
        &rules,
    )?;

    let result = reconcile(&mut registry, &target_key, &actual_key, &rules)?;
    let summary = summarize(&registry, &result.merged_key, args.dealer.as_deref(), &rules)?;

    if let Some(path) = &args.output {
        let merged = registry.require(&result.merged_key)?;
        write_output(path, &result, &summary, merged)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        return print_json(&json!({ "reconciliation": result, "summary": summary }));
    }

    print_records(&result);
    println!();
    println!("{}", result.summary_text);
    println!("{}", summary.summary_text);

    let d = &result.diagnostics;
    if d.unmatched_target > 0 || d.unmatched_actual > 0 {
        eprintln!(
            "{} target and {} actual dealer/site key(s) had no counterpart",
            d.unmatched_target, d.unmatched_actual
        );
    }
    Ok(())
}

fn print_records(result: &ReconResult) {
    let name_width = result
        .records
        .iter()
        .filter_map(|r| r.dealer_name.as_deref())
        .map(|n| n.chars().count())
        .max();

    for r in &result.records {
        let name = match name_width {
            Some(w) => format!("{:<w$}  ", r.dealer_name.as_deref().unwrap_or("")),
            None => String::new(),
        };
        println!(
            "{:<10} {:<10} {name}{:>12} {:>12}  {}",
            r.dealer_code,
            r.site_code,
            format_number(r.target_sales),
            format_number(r.actual_sales),
            if r.met_target { "met" } else { "-" },
        );
    }
}

/// `.csv` writes the merged table; anything else the JSON result.
fn write_output(
    path: &Path,
    result: &ReconResult,
    summary: &Summary,
    merged: &Dataset,
) -> Result<(), CliError> {
    let is_csv = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        let write_err = |e: csv::Error| CliError::io(format!("cannot write {}: {e}", path.display()));
        writer.write_record(merged.columns()).map_err(write_err)?;
        for row in merged.rows() {
            writer
                .write_record(row.iter().map(|c| c.key_text()))
                .map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
        return Ok(());
    }

    let text = serde_json::to_string_pretty(&json!({ "reconciliation": result, "summary": summary }))
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    std::fs::write(path, text)
        .map_err(|e| CliError::io(format!("cannot write output: {e}")))
}
