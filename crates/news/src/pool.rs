//! Bounded worker pool with per-task deadlines.
//!
//! Tasks are driven through `futures::stream::buffered`, so at most
//! `workers` run at once and results come back in submission order, not
//! completion order. A task that overruns its deadline is dropped and
//! contributes nothing.

use std::future::Future;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use serde::Serialize;
use tokio::time::timeout;

use crate::errors::NewsError;

/// Default number of concurrent tasks.
pub const DEFAULT_WORKERS: usize = 5;

/// Default per-task deadline.
pub const DEFAULT_TASK_DEADLINE: Duration = Duration::from_secs(30);

/// What one task produced.
#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    /// Served from cache without touching the network
    pub cached: bool,
}

impl<T> Fetched<T> {
    pub fn fresh(items: Vec<T>) -> Self {
        Self { items, cached: false }
    }

    pub fn cached(items: Vec<T>) -> Self {
        Self { items, cached: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success { count: usize, cached: bool },
    Timeout,
    Failed { message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
    pub elapsed_ms: u64,
}

/// Per-task outcomes for one batch, in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub tasks: Vec<TaskReport>,
}

impl BatchReport {
    pub fn successful(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_success()).count()
    }

    /// Failures including timeouts.
    pub fn failed(&self) -> usize {
        self.tasks.len() - self.successful()
    }

    pub fn timed_out(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.outcome == TaskOutcome::Timeout)
            .count()
    }

    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.name == name).map(|t| &t.outcome)
    }

    pub fn extend(&mut self, other: BatchReport) {
        self.tasks.extend(other.tasks);
    }
}

/// Run named tasks with at most `workers` in flight, each bounded by
/// `deadline`.
///
/// Returns the items of every successful task concatenated in submission
/// order, plus the batch report.
pub async fn run_bounded<T, F>(
    tasks: Vec<(String, F)>,
    workers: usize,
    deadline: Duration,
) -> (Vec<T>, BatchReport)
where
    F: Future<Output = Result<Fetched<T>, NewsError>>,
{
    let results: Vec<_> = stream::iter(tasks)
        .map(|(name, task)| async move {
            let started = Instant::now();
            let result = timeout(deadline, task).await;
            (name, started.elapsed(), result)
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut items = Vec::new();
    let mut report = BatchReport::default();

    for (name, elapsed, result) in results {
        let outcome = match result {
            Ok(Ok(fetched)) => {
                debug!(
                    "Task '{}' returned {} items in {:?}{}",
                    name,
                    fetched.items.len(),
                    elapsed,
                    if fetched.cached { " (cached)" } else { "" }
                );
                let outcome = TaskOutcome::Success {
                    count: fetched.items.len(),
                    cached: fetched.cached,
                };
                items.extend(fetched.items);
                outcome
            }
            Ok(Err(e)) => {
                warn!("Task '{}' failed: {}", name, e);
                TaskOutcome::Failed {
                    message: e.to_string(),
                }
            }
            Err(_) => {
                warn!("Task '{}' exceeded its {:?} deadline", name, deadline);
                TaskOutcome::Timeout
            }
        };
        report.tasks.push(TaskReport {
            name,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    (items, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Task = BoxFuture<'static, Result<Fetched<u32>, NewsError>>;

    fn delayed(ms: u64, items: Vec<u32>) -> Task {
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(Fetched::fresh(items))
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let tasks = vec![
            ("slow".to_string(), delayed(60, vec![1, 2])),
            ("fast".to_string(), delayed(5, vec![3])),
            ("medium".to_string(), delayed(30, vec![4])),
        ];
        let (items, report) = run_bounded(tasks, 3, Duration::from_secs(5)).await;

        assert_eq!(items, vec![1, 2, 3, 4]);
        let names: Vec<_> = report.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "fast", "medium"]);
        assert_eq!(report.successful(), 3);
    }

    #[tokio::test]
    async fn test_timeout_and_failure_are_reported() {
        let failing: Task = async {
            Err(NewsError::Http {
                source_name: "broken".to_string(),
                status: 500,
            })
        }
        .boxed();
        let tasks = vec![
            ("ok".to_string(), delayed(1, vec![7])),
            ("hung".to_string(), delayed(5_000, vec![8])),
            ("broken".to_string(), failing),
        ];
        let (items, report) = run_bounded(tasks, 2, Duration::from_millis(50)).await;

        assert_eq!(items, vec![7]);
        assert_eq!(report.successful(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.timed_out(), 1);
        assert_eq!(report.outcome("hung"), Some(&TaskOutcome::Timeout));
        assert!(matches!(report.outcome("broken"), Some(TaskOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn test_worker_bound_is_respected() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<(String, Task)> = (0..8)
            .map(|i| {
                let running = running.clone();
                let peak = peak.clone();
                let task: Task = async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(Fetched::fresh(vec![i]))
                }
                .boxed();
                (format!("task-{}", i), task)
            })
            .collect();

        let (items, _) = run_bounded(tasks, 2, Duration::from_secs(5)).await;
        assert_eq!(items.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
