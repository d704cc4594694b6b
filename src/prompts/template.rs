use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use crate::consts::TASK_MARKER;
use crate::error::{Error, Result};
use crate::input::read_text;

/// The request skeleton every task is rendered into.
///
/// The text must be a JSON object, but it is kept and substituted as raw
/// text. Cloning is cheap; clones share the same buffer.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: Arc<str>,
    marker: Arc<str>,
}

impl PromptTemplate {
    /// Read and validate a template file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "failed to read prompt file {}",
                path.display()
            )));
        }

        debug!("Reading prompt JSON from file {}", path.display());

        Self::from_text(read_text(path, "prompt file")?)
    }

    /// Validate template text already in memory.
    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        let text = text.into();

        // Parsed only to prove the text is a JSON object; the value is dropped.
        serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&text).map_err(|e| {
            Error::Validation(format!(
                "failed to parse prompt JSON, please check your JSON is valid and try again: {}",
                e
            ))
        })?;

        debug!("JSON: {}", text);

        let template = Self {
            text: text.into(),
            marker: TASK_MARKER.into(),
        };
        if !template.has_marker() {
            warn!(
                "prompt template has no {} marker; every request will be identical",
                TASK_MARKER
            );
        }

        Ok(template)
    }

    /// Use a different substitution marker.
    pub fn with_marker(mut self, marker: &str) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn has_marker(&self) -> bool {
        self.text.contains(&*self.marker)
    }

    /// Replace the first marker with `payload`. Without a marker the
    /// template comes back unchanged.
    pub fn render(&self, payload: &str) -> RenderedRequest {
        RenderedRequest(self.text.replacen(&*self.marker, payload, 1))
    }
}

/// A template with one task substituted in, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRequest(String);

impl RenderedRequest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
