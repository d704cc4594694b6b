//! Reading input files as text.

use std::path::Path;

use crate::error::{Error, Result};

/// Read `path` as UTF-8. An I/O failure is a config error; bytes that are
/// not UTF-8 are a validation error, the same as any other bad content.
pub(crate) fn read_text(path: &Path, what: &str) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::Config(format!("could not read {} {}: {}", what, path.display(), e)))?;

    String::from_utf8(bytes).map_err(|e| {
        Error::Validation(format!("{} {} is not valid UTF-8: {}", what, path.display(), e))
    })
}
