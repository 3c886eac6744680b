// File -> registry entries

use std::path::Path;

use serde::Serialize;

use salesgrid_recon::model::Dataset;
use salesgrid_recon::registry::{sheet_key, Registry};

use crate::clean::clean;
use crate::error::{IoError, Result};

/// Extensions read through calamine.
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];
/// Extensions read as delimited text.
pub const DELIMITED_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];

/// One registered sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedSheet {
    pub key: String,
    pub source: String,
    pub sheet: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Source identifier of a file: its file name.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every sheet of a file and apply load-time cleaning. Delimited files
/// yield one sheet named after the file stem.
pub fn load_file(path: &Path) -> Result<Vec<(String, Dataset)>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut sheets = if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
        crate::xlsx::import(path)?
    } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
        let dataset = if extension == "tsv" {
            crate::csv::import_with_delimiter(path, b'\t')?
        } else {
            crate::csv::import(path)?
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Sheet1".to_string());
        vec![(stem, dataset)]
    } else {
        return Err(IoError::Unsupported {
            path: path.to_path_buf(),
            extension,
        });
    };

    for (_, dataset) in &mut sheets {
        clean(dataset);
    }
    Ok(sheets)
}

/// Load a file into the registry as `<file name>::<sheet>` entries.
pub fn load_into(registry: &mut Registry, path: &Path) -> Result<Vec<LoadedSheet>> {
    let source = source_name(path);
    let sheets = load_file(path)?;
    let mut loaded = Vec::with_capacity(sheets.len());
    for (sheet, dataset) in sheets {
        let info = LoadedSheet {
            key: sheet_key(&source, &sheet),
            source: source.clone(),
            sheet: sheet.clone(),
            rows: dataset.row_count(),
            columns: dataset.columns().to_vec(),
        };
        registry.insert_sheet(&source, &sheet, dataset)?;
        loaded.push(info);
    }
    log::info!("loaded {} sheet(s) from {}", loaded.len(), path.display());
    Ok(loaded)
}
