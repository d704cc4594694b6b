//! Fan-out: one concurrent unit of work per task, every unit reporting
//! exactly one outcome on a shared channel.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};
use tokio::sync::{Semaphore, mpsc};

use crate::consts::DEFAULT_MAX_CONCURRENCY;
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::prompts::PromptTemplate;
use crate::tasks::{self, Task};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on units running at once. Zero is treated as one.
    pub max_concurrency: usize,
    /// When set, each descriptor names a file in this directory whose
    /// content is substituted instead of the descriptor itself.
    pub task_dir: Option<PathBuf>,
    pub request_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            task_dir: None,
            request_timeout: None,
        }
    }
}

/// What one unit of work produced.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: Task,
    pub result: Result<String>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Shared, read-only state every unit needs.
struct Unit {
    template: PromptTemplate,
    generator: Arc<dyn Generator>,
    task_dir: Option<PathBuf>,
    request_timeout: Option<Duration>,
}

impl Unit {
    async fn run(&self, task: Task) -> TaskOutcome {
        let started = Instant::now();
        let result = self.fill(&task).await;

        match &result {
            Ok(_) => debug!(
                "Time taken for task {} ({}): {:?}",
                task.index,
                task.descriptor,
                started.elapsed()
            ),
            Err(e) => error!("task {} ({}) failed: {}", task.index, task.descriptor, e),
        }

        TaskOutcome { task, result }
    }

    async fn fill(&self, task: &Task) -> Result<String> {
        let payload = self.payload(task).await?;
        let request = self.template.render(&payload);

        let call = self.generator.generate(&request);
        let response = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => call.await,
        };

        response.map_err(|e| Error::Service(format!("{:#}", e)))
    }

    async fn payload(&self, task: &Task) -> Result<String> {
        let Some(dir) = &self.task_dir else {
            return Ok(task.descriptor.clone());
        };

        let path = resolve_in(dir, &task.descriptor)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Err(Error::NotFound(path)),
            Err(e) => {
                return Err(Error::Config(format!(
                    "could not check {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        debug!("Reading data from file {}", path.display());

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Config(format!("could not read {}: {}", path.display(), e)))?;
        String::from_utf8(bytes).map_err(|e| {
            Error::Validation(format!("{} is not valid UTF-8: {}", path.display(), e))
        })
    }
}

/// Join a task descriptor onto `dir`, refusing anything that would name a
/// file outside it.
fn resolve_in(dir: &Path, descriptor: &str) -> Result<PathBuf> {
    let relative = Path::new(descriptor);
    let mut named = false;
    for component in relative.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Validation(format!(
                    "task {:?} points outside the task directory",
                    descriptor
                )));
            }
        }
    }
    if !named {
        return Err(Error::Validation(format!(
            "task {:?} does not name a file",
            descriptor
        )));
    }
    Ok(dir.join(relative))
}

/// Renders and submits every task concurrently, at most
/// `max_concurrency` at a time.
pub struct Dispatcher {
    unit: Arc<Unit>,
    max_concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        template: PromptTemplate,
        generator: Arc<dyn Generator>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            unit: Arc::new(Unit {
                template,
                generator,
                task_dir: config.task_dir,
                request_timeout: config.request_timeout,
            }),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Start one unit per task and return the receiving end of the outcome
    /// channel. The channel closes once every unit has finished, so draining
    /// it to the end always terminates.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, descriptors: Vec<String>) -> mpsc::Receiver<TaskOutcome> {
        let (tx, rx) = mpsc::channel(1);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let unit = Arc::clone(&self.unit);

        debug!(
            "Dispatching {} task(s), at most {} in flight",
            descriptors.len(),
            self.max_concurrency
        );

        tokio::spawn(async move {
            for task in tasks::enumerate(descriptors) {
                // The semaphore is never closed, so this only fails if the
                // runtime is shutting down.
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let unit = Arc::clone(&unit);
                let tx = tx.clone();

                tokio::spawn(async move {
                    let outcome = unit.run(task).await;
                    drop(permit);
                    // The collector may have gone away; nothing left to do then.
                    let _ = tx.send(outcome).await;
                });
            }
        });

        rx
    }
}
