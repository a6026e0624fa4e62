//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success                                                     |
//! | 1    | Differences found (only with `--fail-on-diff`)              |
//! | 2    | CLI usage error (bad args, missing subcommand)              |
//! | 3    | Workbook could not be loaded (unreadable, sheet or column)  |
//! | 4    | Report workbook could not be built                          |
//! | 5    | File I/O error (reading the input, writing the report)      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use stockcheck_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "quantities differ."
pub const EXIT_DIFFS: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Load error - unreadable workbook, missing sheet, missing column.
pub const EXIT_LOAD: u8 = 3;

/// Export error - the report workbook could not be produced.
pub const EXIT_EXPORT: u8 = 4;

/// File I/O error - input unreadable from disk, output not writable.
pub const EXIT_IO: u8 = 5;

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Workbook(_) | ReconError::SheetMissing { .. } | ReconError::MissingColumn { .. } => {
            EXIT_LOAD
        }
        ReconError::Export(_) => EXIT_EXPORT,
    }
}
