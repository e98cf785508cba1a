// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Concurrency Scheduler
 * Bounded worker pool for adapter invocations
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aggregator;
use crate::registry::ToolRegistry;
use crate::types::{InvocationError, ToolResult};

/// Runs a selected set of adapters against a target with a bounded number
/// of simultaneous invocations and a per-invocation time budget.
///
/// Invocations start in selection order as slots free up. A fault, timeout,
/// or cancellation of one invocation never aborts or delays its siblings;
/// every selected invocation settles into exactly one ToolResult, and the
/// collected output preserves selection order regardless of completion
/// order.
pub struct ConcurrencyScheduler {
    registry: Arc<ToolRegistry>,
    max_concurrent: usize,
    invocation_timeout: Duration,
}

impl ConcurrencyScheduler {
    pub fn new(
        registry: Arc<ToolRegistry>,
        max_concurrent: usize,
        invocation_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            max_concurrent: max_concurrent.max(1),
            invocation_timeout,
        }
    }

    /// Execute the selection and return one result per selected adapter,
    /// in selection order. Returns only once every invocation has reached
    /// a terminal state.
    pub async fn execute(
        &self,
        session_id: &str,
        target: &str,
        selection: &[String],
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        info!(
            "Scheduling {} adapters against {} (bound {}, budget {:.0}s)",
            selection.len(),
            target,
            self.max_concurrent,
            self.invocation_timeout.as_secs_f64()
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = Vec::with_capacity(selection.len());

        for name in selection {
            let adapter = self.registry.get(name);
            let sem = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let session_id = session_id.to_string();
            let target = target.to_string();
            let name = name.clone();
            let budget = self.invocation_timeout;

            tasks.push(tokio::spawn(async move {
                let Some(adapter) = adapter else {
                    return aggregator::unscheduled(
                        &session_id,
                        &name,
                        &target,
                        InvocationError::adapter_fault("adapter not registered"),
                    );
                };

                // Pending invocations wait for a slot or the session signal,
                // whichever comes first.
                let permit = tokio::select! {
                    _ = cancel.cancelled() => None,
                    permit = sem.acquire_owned() => permit.ok(),
                };

                match permit {
                    Some(_permit) => {
                        debug!("Invocation slot acquired for {}", name);
                        aggregator::invoke(adapter, &session_id, &target, budget, &cancel).await
                    }
                    None => aggregator::unscheduled(
                        &session_id,
                        &name,
                        &target,
                        InvocationError::cancelled("session cancelled before start"),
                    ),
                }
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (task, name) in tasks.into_iter().zip(selection) {
            match task.await {
                Ok(result) => results.push(result),
                Err(join_err) => {
                    // Scheduler wrapper task failed; the aggregator boundary
                    // still owes the session a terminal result.
                    results.push(aggregator::unscheduled(
                        session_id,
                        name,
                        target,
                        InvocationError::adapter_fault(format!("task failed: {}", join_err)),
                    ));
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            "Scheduler settled {} invocations for {} ({} succeeded)",
            results.len(),
            target,
            succeeded
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, AdapterOutput, ToolAdapter};
    use crate::types::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TimedAdapter {
        name: String,
        delay: Duration,
        fail: bool,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ToolAdapter for TimedAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        fn category(&self) -> &str {
            "test"
        }

        fn description(&self) -> &str {
            "timed adapter"
        }

        async fn run(&self, _target: &str) -> Result<AdapterOutput, AdapterError> {
            let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(AdapterError::Failed("scripted failure".to_string()))
            } else {
                Ok(AdapterOutput::new(serde_json::json!({"tool": self.name})))
            }
        }
    }

    struct Tracker {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Tracker {
        fn new() -> Self {
            Self {
                running: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn adapter(&self, name: &str, delay_ms: u64, fail: bool) -> Arc<dyn ToolAdapter> {
            Arc::new(TimedAdapter {
                name: name.to_string(),
                delay: Duration::from_millis(delay_ms),
                fail,
                running: Arc::clone(&self.running),
                peak: Arc::clone(&self.peak),
            })
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        for i in 0..6 {
            registry.register(tracker.adapter(&format!("tool{}", i), 80, false));
        }

        let selection = names(&["tool0", "tool1", "tool2", "tool3", "tool4", "tool5"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 2, Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.success));
        assert!(tracker.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_results_preserve_selection_order() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        // First adapter is the slowest so completion order inverts
        registry.register(tracker.adapter("slowest", 200, false));
        registry.register(tracker.adapter("medium", 80, false));
        registry.register(tracker.adapter("fastest", 5, false));

        let selection = names(&["slowest", "medium", "fastest"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 3, Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        let order: Vec<&str> = results.iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(order, vec!["slowest", "medium", "fastest"]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        registry.register(tracker.adapter("good", 10, false));
        registry.register(tracker.adapter("bad", 10, true));
        registry.register(tracker.adapter("also_good", 10, false));

        let selection = names(&["good", "bad", "also_good"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 2, Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        assert_eq!(
            results[1].error.as_ref().unwrap().kind,
            FailureKind::AdapterFault
        );
    }

    #[tokio::test]
    async fn test_timeout_frees_slot_for_next_invocation() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        registry.register(tracker.adapter("hung", 60_000, false));
        registry.register(tracker.adapter("quick", 10, false));

        // Bound of 1: "quick" can only start once "hung" times out.
        let selection = names(&["hung", "quick"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 1, Duration::from_millis(150));
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert_eq!(
            results[0].error.as_ref().unwrap().kind,
            FailureKind::Timeout
        );
        assert!(results[1].success);
        // Total wall time is two budgets at most, not the hung adapter's delay
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_unknown_adapter_settles_as_fault() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        registry.register(tracker.adapter("known", 10, false));

        let selection = names(&["known", "ghost"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 2, Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
    }

    #[tokio::test]
    async fn test_session_cancellation_keeps_settled_results() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        registry.register(tracker.adapter("fast", 10, false));
        registry.register(tracker.adapter("hung1", 60_000, false));
        registry.register(tracker.adapter("hung2", 60_000, false));

        let selection = names(&["fast", "hung1", "hung2"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 3, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let signal = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            signal.cancel();
        });

        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert_eq!(results.len(), 3);
        // Settled result is kept
        assert!(results[0].success);
        // In-flight invocations finalize as cancelled, not timeout
        assert_eq!(
            results[1].error.as_ref().unwrap().kind,
            FailureKind::Cancelled
        );
        assert_eq!(
            results[2].error.as_ref().unwrap().kind,
            FailureKind::Cancelled
        );
    }

    #[tokio::test]
    async fn test_session_cancellation_reaches_pending_invocations() {
        let tracker = Tracker::new();
        let mut registry = ToolRegistry::new();
        registry.register(tracker.adapter("hung", 60_000, false));
        registry.register(tracker.adapter("starved", 10, false));

        // Bound of 1: "starved" never acquires a slot before the signal.
        let selection = names(&["hung", "starved"]);
        let scheduler =
            ConcurrencyScheduler::new(Arc::new(registry), 1, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let signal = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            signal.cancel();
        });

        let results = scheduler.execute("s1", "example.com", &selection, &cancel).await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].error.as_ref().unwrap().kind,
            FailureKind::Cancelled
        );
        let starved = &results[1];
        assert_eq!(
            starved.error.as_ref().unwrap().kind,
            FailureKind::Cancelled
        );
        assert_eq!(starved.execution_time, 0.0);
    }
}
