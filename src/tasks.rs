//! Loading the task list.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::input::read_text;

/// One entry from the task list, tagged with its position in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub index: usize,
    pub descriptor: String,
}

/// Read a JSON array of strings. Order is preserved.
pub fn load_tasks(path: Option<&Path>) -> Result<Vec<String>> {
    let path = path.ok_or_else(|| {
        Error::Config(
            "you need to specify a task file containing an array of strings, each representing an LLM task"
                .to_string(),
        )
    })?;

    debug!("Reading tasks from file {}", path.display());

    parse_tasks(&read_text(path, "task file")?)
}

/// Parse task list text.
pub fn parse_tasks(text: &str) -> Result<Vec<String>> {
    serde_json::from_str(text).map_err(|e| {
        Error::Validation(format!(
            "task file must be a JSON array of strings, please check your JSON is valid and try again: {}",
            e
        ))
    })
}

/// Pair each descriptor with its index.
pub fn enumerate(descriptors: Vec<String>) -> Vec<Task> {
    descriptors
        .into_iter()
        .enumerate()
        .map(|(index, descriptor)| Task { index, descriptor })
        .collect()
}
