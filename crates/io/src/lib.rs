// Spreadsheet loading: delimited text and Excel workbooks into registry datasets

pub mod clean;
pub mod csv;
pub mod error;
pub mod loader;
pub mod table;
pub mod xlsx;

pub use error::IoError;
pub use loader::{load_file, load_into, source_name, LoadedSheet};
