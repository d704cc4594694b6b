//! Resolved run configuration.
//!
//! Built once from command-line flags and passed down explicitly; nothing
//! reads process-wide state after startup.

use std::path::{Path, PathBuf};

use crate::dispatch::DispatchConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub prompt_path: Option<PathBuf>,
    pub tasks_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Reject values no run could succeed with, before touching any file.
    pub fn validate(&self) -> Result<()> {
        if self.prompt_path().is_none() {
            return Err(Error::Config(
                "you need to specify a prompt file in OpenAI chat format containing {{ .task }}"
                    .to_string(),
            ));
        }
        if self.dispatch.max_concurrency == 0 {
            return Err(Error::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(dir) = &self.dispatch.task_dir
            && !dir.is_dir()
        {
            return Err(Error::Config(format!(
                "task directory {} does not exist",
                dir.display()
            )));
        }
        Ok(())
    }

    /// The prompt path, treating an empty path as unset.
    pub fn prompt_path(&self) -> Option<&Path> {
        non_empty(self.prompt_path.as_deref())
    }

    pub fn tasks_path(&self) -> Option<&Path> {
        non_empty(self.tasks_path.as_deref())
    }

    pub fn rules_path(&self) -> Option<&Path> {
        non_empty(self.rules_path.as_deref())
    }
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
