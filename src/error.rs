use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required file or value is missing or unreadable.
    #[error("config error: {0}")]
    Config(String),

    /// A loaded file is not the structured data it should be.
    #[error("validation error: {0}")]
    Validation(String),

    /// The input file a task points at does not exist.
    #[error("file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("generation failed: {0}")]
    Service(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
