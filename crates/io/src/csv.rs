// CSV/TSV import

use std::io::Read;
use std::path::Path;

use salesgrid_recon::model::{Cell, Dataset};

use crate::error::{IoError, Result};
use crate::table::{build_dataset, parse_text_cell};

pub fn import(path: &Path) -> Result<Dataset> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!(
        "csv: {} delimiter {:?}",
        path.display(),
        delimiter as char
    );
    import_from_string(&content, delimiter).map_err(|e| e.at(path))
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Dataset> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter).map_err(|e| e.at(path))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Consistent lines times field count; more columns breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel-exported CSVs are often Windows-1252).
/// A UTF-8 byte order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String> {
    let read_err = |source| IoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(match s.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => s,
        }),
        Err(e) => {
            log::debug!("csv: {} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

enum ParseError {
    Csv(csv::Error),
    Dataset(IoError),
}

impl ParseError {
    fn at(self, path: &Path) -> IoError {
        match self {
            Self::Csv(source) => IoError::Csv {
                path: path.to_path_buf(),
                source,
            },
            Self::Dataset(e) => e,
        }
    }
}

fn import_from_string(content: &str, delimiter: u8) -> std::result::Result<Dataset, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<Cell>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(ParseError::Csv)?;
        grid.push(record.iter().map(parse_text_cell).collect());
    }
    build_dataset(grid).map_err(ParseError::Dataset)
}
