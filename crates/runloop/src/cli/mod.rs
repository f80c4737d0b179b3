//! Command implementations for the `runloop` binary.

pub mod drift;
pub mod error;
pub mod index;
pub mod run;
pub mod summary;

use error::HelpfulError;
use std::path::Path;

/// Read a text input, mapping I/O failures to helpful errors.
pub(crate) fn read_input(path: &Path) -> Result<String, HelpfulError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => HelpfulError::file_not_found(path),
        _ => HelpfulError::cannot_read_file(path, &e.to_string()),
    })
}
