//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad args, unsupported file type)     |
//! | 3    | IO or parse error reading an input file           |
//! | 4    | Dataset, sheet or merge key not found             |
//! | 5    | Required column missing from an input sheet       |
//! | 6    | Filter or code lookup matched nothing             |
//! | 7    | Rules file invalid                                |
//! | 8    | Code mapping table needed but not loaded          |

use salesgrid_io::IoError;
use salesgrid_protocol::ErrorKind;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input file could not be read or parsed.
pub const EXIT_IO: u8 = 3;

/// Dataset, sheet, or merge key absent.
pub const EXIT_NOT_FOUND: u8 = 4;

/// Dealer code, site code, or quantity column could not be resolved.
pub const EXIT_MISSING_COLUMN: u8 = 5;

/// Dealer filter or code lookup matched zero rows.
pub const EXIT_NO_MATCH: u8 = 6;

/// Rules TOML failed to parse or validate.
pub const EXIT_INVALID_RULES: u8 = 7;

/// Code lookup requested without a mapping table.
pub const EXIT_MAPPING_UNAVAILABLE: u8 = 8;

/// Map an engine error category to its exit code.
pub fn kind_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::MissingColumn => EXIT_MISSING_COLUMN,
        ErrorKind::NoMatch => EXIT_NO_MATCH,
        ErrorKind::InvalidRules => EXIT_INVALID_RULES,
        ErrorKind::MappingUnavailable => EXIT_MAPPING_UNAVAILABLE,
        ErrorKind::InvalidArguments | ErrorKind::UnknownTool => EXIT_USAGE,
        ErrorKind::InvalidDataset => EXIT_IO,
        ErrorKind::ReadOnlyKey | ErrorKind::Protocol => EXIT_ERROR,
    }
}

/// Map a load failure to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Unsupported { .. } => EXIT_USAGE,
        IoError::Dataset(e) => kind_exit_code(e.kind()),
        _ => EXIT_IO,
    }
}
