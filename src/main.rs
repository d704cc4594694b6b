use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use promptfill::config::Config;
use promptfill::consts::{API_KEY_ENV, DEFAULT_MAX_CONCURRENCY};
use promptfill::dispatch::DispatchConfig;
use promptfill::engine;
use promptfill::generator::Generator;
use promptfill::generator::echo::EchoGenerator;
use promptfill::generator::openai::OpenAiGenerator;

#[derive(Debug, Clone, ValueEnum)]
enum Provider {
    /// OpenAI-compatible chat completions API
    Openai,
    /// Print each rendered request instead of sending it
    Echo,
}

#[derive(Parser)]
#[command(
    name = "promptfill",
    version,
    about = "Fill one prompt per task and send them all to an LLM concurrently."
)]
struct Cli {
    /// Verbose output (debug logs and timings)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// The file to read the prompt from. Must be in OpenAI chat format and contain {{ .task }}
    #[arg(short, long)]
    prompt: Option<PathBuf>,

    /// A JSON file of regex rules to run over LLM outputs
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// A JSON file containing tasks to substitute into the prompt
    #[arg(short, long)]
    tasks: Option<PathBuf>,

    /// Treat each task as a file name in this directory and substitute the file's content
    #[arg(long)]
    task_dir: Option<PathBuf>,

    /// Maximum number of requests in flight at once
    #[arg(short, long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds (0 = wait forever)
    #[arg(long, default_value_t = 0)]
    timeout: u64,

    /// Where to send the rendered prompts
    #[arg(long, value_enum, default_value_t = Provider::Openai)]
    provider: Provider,

    /// Model to use when the prompt does not name one
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the chat completions API
    #[arg(long, env = "OPENAI_BASE_URL")]
    base_url: Option<String>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            prompt_path: self.prompt.clone(),
            tasks_path: self.tasks.clone(),
            rules_path: self.rules.clone(),
            dispatch: DispatchConfig {
                max_concurrency: self.concurrency,
                task_dir: self.task_dir.clone(),
                request_timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            },
        }
    }

    fn generator(&self) -> anyhow::Result<Arc<dyn Generator>> {
        Ok(match self.provider {
            Provider::Echo => {
                if self.model.is_some() {
                    log::warn!("--model is ignored for the echo provider");
                }
                Arc::new(EchoGenerator)
            }
            Provider::Openai => {
                let api_key = std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.is_empty())
                    .with_context(|| format!("no API key found. Set {}.", API_KEY_ENV))?;
                Arc::new(OpenAiGenerator::new(
                    self.model.clone(),
                    self.base_url.clone(),
                    api_key,
                ))
            }
        })
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("promptfill", level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = cli.config();
    let inputs = engine::load(&config).context("failed to load inputs")?;
    let generator = cli.generator()?;

    let summary = engine::run(&config, inputs, generator, tokio::io::stdout()).await?;

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} task(s) failed{}",
            summary.failed + summary.missing,
            summary.expected,
            if summary.missing > 0 {
                format!(" ({} without reporting)", summary.missing)
            } else {
                String::new()
            }
        );
    }

    Ok(())
}
