use std::path::PathBuf;

use salesgrid_recon::ReconError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited text in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot open workbook {}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("workbook {} contains no sheets", path.display())]
    EmptyWorkbook { path: PathBuf },

    #[error("unsupported file type '{extension}' for {}", path.display())]
    Unsupported { path: PathBuf, extension: String },

    #[error(transparent)]
    Dataset(#[from] ReconError),
}

pub type Result<T> = std::result::Result<T, IoError>;
