//! Settings, rules, files and mapping shared by every command.

use std::path::{Path, PathBuf};

use salesgrid_config::Settings;
use salesgrid_io::{load_file, load_into, LoadedSheet};
use salesgrid_recon::classify::classify_sheet;
use salesgrid_recon::{sheet_key, Classification, CodeMapping, ReconRules, Registry};

use crate::exit_codes::{EXIT_INVALID_RULES, EXIT_NOT_FOUND};
use crate::CliError;

pub struct Context {
    rules_flag: Option<PathBuf>,
    pub settings: Settings,
}

impl Context {
    pub fn new(rules_flag: Option<PathBuf>) -> Self {
        let path = Settings::config_path();
        let mut settings = Settings::load_from(&path);
        if let Some(dir) = path.parent() {
            settings.resolve_relative(dir);
        }
        Self { rules_flag, settings }
    }

    /// `--rules`, else the settings file's rules, else built-in defaults.
    pub fn rules_path(&self) -> Option<&Path> {
        self.rules_flag
            .as_deref()
            .or(self.settings.rules_file.as_deref())
    }

    pub fn rules(&self) -> Result<ReconRules, CliError> {
        match self.rules_path() {
            Some(path) => read_rules(path),
            None => Ok(ReconRules::default()),
        }
    }

    /// `--mapping`, else the settings file's mapping.
    pub fn mapping_path(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.settings.mapping_file.clone())
    }

    pub fn preview_rows(&self, flag: Option<usize>) -> usize {
        match flag {
            Some(rows) => Settings {
                preview_rows: rows,
                ..self.settings.clone()
            }
            .effective_preview_rows(),
            None => self.settings.effective_preview_rows(),
        }
    }
}

pub fn read_rules(path: &Path) -> Result<ReconRules, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    ReconRules::from_toml(&text).map_err(|e| CliError {
        code: EXIT_INVALID_RULES,
        message: format!("{}: {e}", path.display()),
        hint: Some("`sgrid rules show` prints the defaults as TOML".to_string()),
    })
}

/// Load every file into the registry; a file given twice loads once.
pub fn load_all(registry: &mut Registry, files: &[PathBuf]) -> Result<Vec<LoadedSheet>, CliError> {
    let mut seen: Vec<&Path> = Vec::new();
    let mut loaded = Vec::new();
    for file in files {
        if seen.contains(&file.as_path()) {
            continue;
        }
        seen.push(file);
        loaded.extend(load_into(registry, file)?);
    }
    Ok(loaded)
}

/// Mapping table from the first sheet of a workbook.
pub fn read_mapping(path: &Path, rules: &ReconRules) -> Result<CodeMapping, CliError> {
    let sheets = load_file(path)?;
    let (sheet, dataset) = sheets.into_iter().next().ok_or_else(|| {
        CliError::io(format!("{} has no sheets", path.display()))
    })?;
    let mapping = CodeMapping::from_dataset(&dataset, &rules.mapping)?;
    log::info!(
        "mapping: {} row(s) from {} sheet '{sheet}'",
        mapping.len(),
        path.display()
    );
    Ok(mapping)
}

/// Registry key of the sheet to reconcile from `source`: the named sheet,
/// else the first sheet classified as `wanted`, else the only sheet.
pub fn pick_sheet(
    registry: &Registry,
    source: &str,
    named: Option<&str>,
    wanted: Classification,
    rules: &ReconRules,
) -> Result<String, CliError> {
    let sheets = registry.sheets(source);
    let names = || {
        sheets
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    };

    if let Some(name) = named {
        if sheets.iter().any(|(s, _)| *s == name) {
            return Ok(sheet_key(source, name));
        }
        return Err(CliError {
            code: EXIT_NOT_FOUND,
            message: format!("{source} has no sheet '{name}'"),
            hint: Some(format!("sheets: {}", names())),
        });
    }

    let classified = sheets.iter().find(|(name, ds)| {
        classify_sheet(source, name, ds.columns(), &rules.classify)
            .is_some_and(|r| r.classification == wanted)
    });
    if let Some((name, _)) = classified {
        log::debug!("{source}: using sheet '{name}' as {wanted}");
        return Ok(sheet_key(source, name));
    }
    if let [(only, _)] = sheets.as_slice() {
        return Ok(sheet_key(source, only));
    }
    Err(CliError::args(format!(
        "cannot tell which sheet of {source} holds the {wanted} data"
    ))
    .with_hint(format!(
        "pass --{wanted}-sheet with one of: {}",
        names()
    )))
}

/// Pretty JSON as the only stdout output.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesgrid_recon::Dataset;

    fn sheet(columns: &[&str]) -> Dataset {
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), Vec::new()).unwrap()
    }

    #[test]
    fn classified_sheet_wins_over_order() {
        let mut reg = Registry::new();
        reg.insert_sheet("plan.xlsx", "說明", sheet(&["備註"])).unwrap();
        reg.insert_sheet("plan.xlsx", "上半年目標", sheet(&["經銷商代碼", "目標"])).unwrap();
        let key = pick_sheet(&reg, "plan.xlsx", None, Classification::Target, &ReconRules::default())
            .unwrap();
        assert_eq!(key, "plan.xlsx::上半年目標");
    }

    #[test]
    fn single_sheet_is_used_without_evidence() {
        let mut reg = Registry::new();
        reg.insert_sheet("sales.csv", "sales", sheet(&["a"])).unwrap();
        let key = pick_sheet(&reg, "sales.csv", None, Classification::Actual, &ReconRules::default())
            .unwrap();
        assert_eq!(key, "sales.csv::sales");
    }

    #[test]
    fn ambiguous_sheets_are_a_usage_error() {
        let mut reg = Registry::new();
        reg.insert_sheet("book.xlsx", "A", sheet(&["a"])).unwrap();
        reg.insert_sheet("book.xlsx", "B", sheet(&["b"])).unwrap();
        let err = pick_sheet(&reg, "book.xlsx", None, Classification::Target, &ReconRules::default())
            .unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
        assert_eq!(err.hint.as_deref(), Some("pass --target-sheet with one of: A, B"));
    }

    #[test]
    fn unknown_named_sheet_is_not_found() {
        let mut reg = Registry::new();
        reg.insert_sheet("book.xlsx", "A", sheet(&["a"])).unwrap();
        let err = pick_sheet(&reg, "book.xlsx", Some("Z"), Classification::Target, &ReconRules::default())
            .unwrap_err();
        assert_eq!(err.code, EXIT_NOT_FOUND);
    }
}
