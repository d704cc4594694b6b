//! The outermost boundary. main.rs only knows [`load`] and [`run`].

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use tokio::io::AsyncWrite;

use crate::collect::{Collector, Summary};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::prompts::PromptTemplate;
use crate::rules::RuleSet;
use crate::tasks::load_tasks;

/// Everything read from disk before any request goes out.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub template: PromptTemplate,
    pub tasks: Vec<String>,
    pub rules: RuleSet,
}

/// Load the prompt, then the tasks, then the rules. Any failure here
/// aborts the run before dispatch.
pub fn load(config: &Config) -> Result<Inputs> {
    config.validate()?;

    let prompt_path = config
        .prompt_path()
        .ok_or_else(|| Error::Config("no prompt file given".to_string()))?;
    let template = PromptTemplate::load(prompt_path)?;
    let tasks = load_tasks(config.tasks_path())?;
    let rules = match config.rules_path() {
        Some(path) => RuleSet::load(path)?,
        None => RuleSet::default(),
    };

    debug!(
        "Loaded {} task(s) and {} rewrite rule(s)",
        tasks.len(),
        rules.len()
    );

    Ok(Inputs {
        template,
        tasks,
        rules,
    })
}

/// Fan every task out to `generator` and write results to `out` as they
/// arrive.
pub async fn run<W: AsyncWrite + Unpin>(
    config: &Config,
    inputs: Inputs,
    generator: Arc<dyn Generator>,
    out: W,
) -> Result<Summary> {
    let started = Instant::now();
    let expected = inputs.tasks.len();

    let dispatcher = Dispatcher::new(inputs.template, generator, config.dispatch.clone());
    let rx = dispatcher.dispatch(inputs.tasks);

    let mut collector = Collector::new(out).with_rules(inputs.rules);
    let summary = collector.drain(rx, expected).await?;

    info!(
        "{} of {} task(s) succeeded, {} failed",
        summary.succeeded, summary.expected, summary.failed
    );
    debug!("Total time taken: {:?}", started.elapsed());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::echo::EchoGenerator;
    use std::fs;

    fn write_inputs(dir: &std::path::Path, prompt: &str, tasks: &str) -> Config {
        let prompt_path = dir.join("prompt.json");
        let tasks_path = dir.join("tasks.json");
        fs::write(&prompt_path, prompt).unwrap();
        fs::write(&tasks_path, tasks).unwrap();
        Config {
            prompt_path: Some(prompt_path),
            tasks_path: Some(tasks_path),
            ..Config::default()
        }
    }

    #[test]
    fn load_reads_everything() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), r#"{"task":"{{ .task }}"}"#, r#"["a"]"#);

        let inputs = load(&config).unwrap();
        assert_eq!(inputs.tasks, vec!["a"]);
        assert!(inputs.rules.is_empty());
    }

    #[test]
    fn load_without_tasks_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), r#"{"task":"{{ .task }}"}"#, "[]");
        config.tasks_path = None;

        assert!(matches!(load(&config), Err(Error::Config(_))));
    }

    #[test]
    fn load_with_missing_rules_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path(), r#"{"task":"{{ .task }}"}"#, "[]");
        config.rules_path = Some(dir.path().join("rules.json"));

        assert!(matches!(load(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn run_with_echo_emits_rendered_requests() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path(), r#"{"task":"{{ .task }}"}"#, r#"["a", "b"]"#);
        let inputs = load(&config).unwrap();

        let mut out = Vec::new();
        let summary = run(&config, inputs, Arc::new(EchoGenerator), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        let out = String::from_utf8(out).unwrap();
        let mut lines: Vec<&str> = out.lines().collect();
        lines.sort();
        assert_eq!(lines, vec![r#"{"task":"a"}"#, r#"{"task":"b"}"#]);
    }
}
