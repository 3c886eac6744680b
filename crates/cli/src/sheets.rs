//! `sgrid load`, `preview`, `classify`, `resolve`.

use std::path::PathBuf;

use serde_json::json;

use salesgrid_io::source_name;
use salesgrid_recon::{classify_all, Registry, ReconError};

use crate::exit_codes::EXIT_NO_MATCH;
use crate::inputs::{load_all, print_json, read_mapping, Context};
use crate::CliError;

pub fn cmd_load(_ctx: &Context, files: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let mut registry = Registry::new();
    let loaded = load_all(&mut registry, &files)?;

    if json {
        return print_json(&json!({ "count": loaded.len(), "sheets": loaded }));
    }

    let width = loaded.iter().map(|l| l.key.chars().count()).max().unwrap_or(3);
    println!("{:<width$}  {:>6}  {:>4}", "KEY", "ROWS", "COLS");
    for sheet in &loaded {
        println!(
            "{:<width$}  {:>6}  {:>4}",
            sheet.key,
            sheet.rows,
            sheet.columns.len()
        );
    }
    Ok(())
}

pub fn cmd_preview(
    ctx: &Context,
    file: PathBuf,
    sheet: Option<String>,
    rows: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let mut registry = Registry::new();
    let loaded = load_all(&mut registry, std::slice::from_ref(&file))?;
    let rows = ctx.preview_rows(rows);

    let keys: Vec<&str> = match &sheet {
        Some(name) => {
            let found = loaded.iter().find(|l| &l.sheet == name).ok_or_else(|| {
                CliError::from(ReconError::NotFound {
                    key: salesgrid_recon::sheet_key(&source_name(&file), name),
                })
            })?;
            vec![found.key.as_str()]
        }
        None => loaded.iter().map(|l| l.key.as_str()).collect(),
    };

    let previews = keys
        .iter()
        .map(|key| registry.preview(key, rows))
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        return print_json(&previews);
    }

    for (i, preview) in previews.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let info = &preview.info;
        println!("{} ({} rows x {} columns)", info.key, info.rows, info.columns_count);
        let header: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
        println!("{}", header.join("\t"));
        for record in &preview.sample_data {
            let cells: Vec<String> = record
                .values()
                .map(|v| match v {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            println!("{}", cells.join("\t"));
        }
    }
    Ok(())
}

pub fn cmd_classify(ctx: &Context, files: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let rules = ctx.rules()?;
    let mut registry = Registry::new();
    load_all(&mut registry, &files)?;
    let report = classify_all(&registry, &rules);

    if json {
        return print_json(&report);
    }

    for result in &report.results {
        println!("{:<8} {}  ({})", result.classification, result.source, result.reason);
    }
    eprintln!(
        "{} target, {} actual, {} unknown",
        report.target.len(),
        report.actual.len(),
        report.unknown.len()
    );
    Ok(())
}

pub fn cmd_resolve(
    ctx: &Context,
    code: String,
    mapping: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let rules = ctx.rules()?;
    let path = ctx
        .mapping_path(mapping)
        .ok_or(ReconError::MappingUnavailable)?;
    let table = read_mapping(&path, &rules)?;
    let matches = table.resolve(&code);

    if json {
        print_json(&json!({ "code": code.trim(), "count": matches.len(), "matches": matches }))?;
    } else {
        for m in &matches {
            println!("{}", m.description);
        }
    }

    if matches.is_empty() {
        return Err(CliError {
            code: EXIT_NO_MATCH,
            message: format!("no dealer or site code '{}' in {}", code.trim(), path.display()),
            hint: Some("codes match exactly; try `sgrid serve` with find_by_name for names".to_string()),
        });
    }
    Ok(())
}
