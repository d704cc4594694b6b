//! Draining the outcome channel and writing results as they arrive.

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::dispatch::TaskOutcome;
use crate::error::Result;
use crate::rules::RuleSet;

/// Counts from one drained run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub expected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Units that ended without reporting anything (e.g. they panicked).
    pub missing: usize,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.missing == 0
    }
}

/// Writes each successful result to `out` in arrival order.
pub struct Collector<W: AsyncWrite + Unpin> {
    out: W,
    rules: RuleSet,
}

impl<W: AsyncWrite + Unpin> Collector<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rules: RuleSet::default(),
        }
    }

    /// Rewrite every result with `rules` before writing it.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Receive until every unit has finished. Failures were already
    /// reported by the unit that hit them; here they are only counted.
    pub async fn drain(
        &mut self,
        mut rx: mpsc::Receiver<TaskOutcome>,
        expected: usize,
    ) -> Result<Summary> {
        let mut summary = Summary {
            expected,
            ..Summary::default()
        };

        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(text) => {
                    let mut line = self.rules.apply(&text);
                    line.push('\n');
                    self.out.write_all(line.as_bytes()).await?;
                    self.out.flush().await?;
                    summary.succeeded += 1;
                }
                Err(_) => summary.failed += 1,
            }
            debug!(
                "Received {}/{} outcome(s)",
                summary.succeeded + summary.failed,
                expected
            );
        }

        summary.missing = expected.saturating_sub(summary.succeeded + summary.failed);
        if summary.missing > 0 {
            warn!("{} task(s) finished without reporting a result", summary.missing);
        }

        Ok(summary)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::rules::RewriteRule;
    use crate::tasks::Task;

    fn outcome(index: usize, result: Result<String>) -> TaskOutcome {
        TaskOutcome {
            task: Task {
                index,
                descriptor: format!("t{}", index),
            },
            result,
        }
    }

    #[tokio::test]
    async fn writes_in_arrival_order() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(outcome(1, Ok("second".into()))).await.unwrap();
        tx.send(outcome(0, Ok("first".into()))).await.unwrap();
        drop(tx);

        let mut collector = Collector::new(Vec::new());
        let summary = collector.drain(rx, 2).await.unwrap();

        assert_eq!(summary.succeeded, 2);
        assert!(summary.is_success());
        let out = String::from_utf8(collector.into_inner()).unwrap();
        assert_eq!(out, "second\nfirst\n");
    }

    #[tokio::test]
    async fn failures_are_counted_not_written() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(outcome(0, Ok("ok".into()))).await.unwrap();
        tx.send(outcome(1, Err(Error::Service("boom".into()))))
            .await
            .unwrap();
        drop(tx);

        let mut collector = Collector::new(Vec::new());
        let summary = collector.drain(rx, 2).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(String::from_utf8(collector.into_inner()).unwrap(), "ok\n");
    }

    #[tokio::test]
    async fn closed_channel_with_missing_outcomes_returns() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(outcome(0, Ok("only".into()))).await.unwrap();
        drop(tx);

        let mut collector = Collector::new(Vec::new());
        let summary = collector.drain(rx, 3).await.unwrap();

        assert_eq!(summary.missing, 2);
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn empty_channel_returns_zero_summary() {
        let (tx, rx) = mpsc::channel::<TaskOutcome>(1);
        drop(tx);

        let mut collector = Collector::new(Vec::new());
        let summary = collector.drain(rx, 0).await.unwrap();

        assert_eq!(summary, Summary::default());
        assert!(collector.into_inner().is_empty());
    }

    #[tokio::test]
    async fn rules_rewrite_output() {
        let rules = RuleSet::compile(vec![RewriteRule {
            pattern: "secret".into(),
            replacement: "[redacted]".into(),
        }])
        .unwrap();

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            tx.send(outcome(0, Ok("the secret is out".into())))
                .await
                .unwrap();
        });

        let mut collector = Collector::new(Vec::new()).with_rules(rules);
        collector.drain(rx, 1).await.unwrap();

        assert_eq!(
            String::from_utf8(collector.into_inner()).unwrap(),
            "the [redacted] is out\n"
        );
    }

    #[tokio::test]
    async fn writer_backpressure_yields_instead_of_blocking() {
        use tokio::io::AsyncReadExt;

        // Much smaller than the output, so every write has to wait for the reader.
        let (writer, mut reader) = tokio::io::duplex(8);
        let reading = tokio::spawn(async move {
            let mut out = String::new();
            reader.read_to_string(&mut out).await.unwrap();
            out
        });

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            for i in 0..3 {
                tx.send(outcome(i, Ok(format!("result number {}", i))))
                    .await
                    .unwrap();
            }
        });

        let mut collector = Collector::new(writer);
        let summary = collector.drain(rx, 3).await.unwrap();
        drop(collector);

        assert_eq!(summary.succeeded, 3);
        assert_eq!(
            reading.await.unwrap(),
            "result number 0\nresult number 1\nresult number 2\n"
        );
    }
}
