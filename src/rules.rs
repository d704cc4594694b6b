//! Regex rewrite rules applied to generated text before it is emitted.

use std::path::Path;

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::input::read_text;

/// One pattern/replacement pair as written in the rules file.
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

/// Compiled rules, applied in file order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(Regex, String)>,
}

impl RuleSet {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading rewrite rules from file {}", path.display());

        let text = read_text(path, "rules file")?;

        let rules: Vec<RewriteRule> = serde_json::from_str(&text).map_err(|e| {
            Error::Validation(format!(
                "rules file must be a JSON array of {{\"pattern\", \"replacement\"}} objects: {}",
                e
            ))
        })?;

        Self::compile(rules)
    }

    pub fn compile(rules: Vec<RewriteRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| {
                    Error::Validation(format!("invalid rule pattern {:?}: {}", rule.pattern, e))
                })?;
                Ok((regex, rule.replacement))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule over `text`, each one seeing the previous one's output.
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, (regex, replacement)| {
                regex.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }
}
