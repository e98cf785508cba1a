// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Engine Integration Tests
 * End-to-end session orchestration against scripted adapters
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use harava::adapter::{AdapterError, AdapterOutput, ToolAdapter};
use harava::ai::{AiAnalyzer, AiPlanner, LlmProvider};
use harava::config::ToolsConfig;
use harava::errors::{EngineError, StorageError};
use harava::registry::ToolRegistry;
use harava::session::{SessionExport, SessionManager};
use harava::storage::{MemoryGateway, PersistenceGateway};
use harava::types::{AiAnalysis, FailureKind, SessionRecord, SessionStatus, Target, ToolResult};

struct ScriptedAdapter {
    name: String,
    delay: Duration,
    fail: bool,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl ToolAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        "test"
    }

    fn description(&self) -> &str {
        "scripted test adapter"
    }

    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError> {
        let current = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            Err(AdapterError::Failed("scripted failure".to_string()))
        } else {
            Ok(
                AdapterOutput::new(serde_json::json!({"target": target, "items": [1, 2, 3]}))
                    .with_metadata("source", serde_json::json!("scripted")),
            )
        }
    }
}

struct Harness {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    registry: ToolRegistry,
}

impl Harness {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            registry: ToolRegistry::new(),
        }
    }

    fn add(&mut self, name: &str, delay_ms: u64, fail: bool) {
        self.registry.register(Arc::new(ScriptedAdapter {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            fail,
            running: Arc::clone(&self.running),
            peak: Arc::clone(&self.peak),
        }));
    }

    fn manager(
        self,
        gateway: Arc<MemoryGateway>,
        max_concurrent: usize,
        timeout_secs: u64,
    ) -> SessionManager {
        let tools = ToolsConfig {
            timeout_secs,
            max_concurrent,
        };
        SessionManager::new(Arc::new(self.registry), gateway, &tools)
    }
}

/// Delegates to a MemoryGateway but refuses tool-result writes, to
/// exercise the persistence-fault path.
struct BrokenResultsGateway {
    inner: MemoryGateway,
    seen_session: std::sync::Mutex<Option<String>>,
}

#[async_trait::async_trait]
impl PersistenceGateway for BrokenResultsGateway {
    async fn create_or_get_target(&self, target: &Target) -> Result<(), StorageError> {
        self.inner.create_or_get_target(target).await
    }

    async fn begin_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        *self.seen_session.lock().unwrap() = Some(session.session_id.clone());
        self.inner.begin_session(session).await
    }

    async fn append_tool_result(&self, _result: &ToolResult) -> Result<(), StorageError> {
        Err(StorageError::QueryFailed {
            reason: "disk full".to_string(),
        })
    }

    async fn upsert_analysis(&self, analysis: &AiAnalysis) -> Result<(), StorageError> {
        self.inner.upsert_analysis(analysis).await
    }

    async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: chrono::DateTime<chrono::Utc>,
        tools_executed: &[String],
    ) -> Result<(), StorageError> {
        self.inner
            .finalize_session(session_id, status, end_time, tools_executed)
            .await
    }

    async fn load_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, StorageError> {
        self.inner.load_session(session_id).await
    }

    async fn load_results(&self, session_id: &str) -> Result<Vec<ToolResult>, StorageError> {
        self.inner.load_results(session_id).await
    }

    async fn load_analysis(
        &self,
        session_id: &str,
    ) -> Result<Option<AiAnalysis>, StorageError> {
        self.inner.load_analysis(session_id).await
    }
}

struct ScriptedProvider {
    response: Result<String, String>,
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => anyhow::bail!("{}", message.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

fn provider(response: Result<String, String>) -> Arc<dyn LlmProvider> {
    Arc::new(ScriptedProvider { response })
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_session_completes_with_mixed_outcomes() {
    let mut harness = Harness::new();
    harness.add("succeeds", 50, false);
    harness.add("fails", 1, true);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 2, 30);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert!(report.session.end_time.is_some());
    assert_eq!(report.session.tools_executed, vec!["succeeds", "fails"]);
    assert_eq!(report.results.len(), 2);
    assert!(report.results[0].success);
    assert!(!report.results[1].success);
    assert_eq!(
        report.results[1].error.as_ref().unwrap().kind,
        FailureKind::AdapterFault
    );

    // Gateway state matches the report
    let stored = gateway
        .load_session(&report.session.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.tools_executed, vec!["succeeds", "fails"]);
    let stored_results = gateway
        .load_results(&report.session.session_id)
        .await
        .unwrap();
    assert_eq!(stored_results.len(), 2);
}

#[tokio::test]
async fn test_timeout_produces_distinct_tagged_result() {
    let mut harness = Harness::new();
    harness.add("hung", 30_000, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 1, 1);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    let result = &report.results[0];
    assert!(!result.success);
    assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::Timeout);
    assert!(result.execution_time >= 1.0);
    assert!(result.execution_time < 2.0);
}

#[tokio::test]
async fn test_concurrency_bound_holds_across_session() {
    let mut harness = Harness::new();
    for i in 0..8 {
        harness.add(&format!("tool{}", i), 60, false);
    }
    let peak = Arc::clone(&harness.peak);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(gateway, 3, 30);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    assert_eq!(report.results.len(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_one_result_per_adapter_with_duplicate_selection() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);
    harness.add("bravo", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 2, 30);
    let cancel = CancellationToken::new();

    let requested = names(&["alpha", "bravo", "alpha", "alpha"]);
    let report = manager
        .run("t1.example", Some(requested.as_slice()), &cancel)
        .await
        .unwrap();

    // Duplicates dropped before scheduling, first occurrence wins
    assert_eq!(report.session.tools_executed, vec!["alpha", "bravo"]);
    assert_eq!(report.results.len(), 2);

    let stored = gateway
        .load_results(&report.session.session_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_explicit_unknown_adapter_is_validation_error() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 2, 30);
    let cancel = CancellationToken::new();

    let requested = names(&["alpha", "ghost-tool"]);
    let err = manager
        .run("t1.example", Some(requested.as_slice()), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
    assert!(err.to_string().contains("ghost-tool"));
    // Nothing was persisted
    assert_eq!(gateway.session_count().await, 0);
    assert_eq!(gateway.target_count().await, 0);
}

#[tokio::test]
async fn test_empty_target_is_validation_error() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 2, 30);
    let cancel = CancellationToken::new();

    let err = manager.run("   ", None, &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(gateway.session_count().await, 0);
}

#[tokio::test]
async fn test_persistence_fault_marks_session_failed() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(BrokenResultsGateway {
        inner: MemoryGateway::new(),
        seen_session: std::sync::Mutex::new(None),
    });
    let tools = ToolsConfig {
        timeout_secs: 30,
        max_concurrent: 2,
    };
    let manager = SessionManager::new(
        Arc::new(harness.registry),
        Arc::clone(&gateway) as Arc<dyn PersistenceGateway>,
        &tools,
    );
    let cancel = CancellationToken::new();

    let err = manager.run("t1.example", None, &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
    assert!(err.to_string().contains("disk full"));

    // Best-effort finalize recorded the terminal failed status
    let session_id = gateway.seen_session.lock().unwrap().clone().unwrap();
    let stored = gateway.inner.load_session(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Failed);
    assert!(stored.end_time.is_some());
}

#[tokio::test]
async fn test_planner_with_unknown_names_falls_back_to_known_subset() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);
    harness.add("bravo", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let planner = AiPlanner::new(
        provider(Ok(r#"["alpha", "ghost-tool"]"#.to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(Arc::clone(&gateway), 2, 30)
        .with_planner(planner);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    // Unknown planner name dropped, known subset executed
    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.session.tools_executed, vec!["alpha"]);
}

#[tokio::test]
async fn test_planner_with_only_unknown_names_uses_default_set() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);
    harness.add("bravo", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let planner = AiPlanner::new(
        provider(Ok(r#"["ghost-tool", "phantom"]"#.to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(gateway, 2, 30)
        .with_planner(planner);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();
    assert_eq!(report.session.tools_executed, vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn test_planner_failure_uses_default_set() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);
    harness.add("bravo", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let planner = AiPlanner::new(
        provider(Err("service unavailable".to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(gateway, 2, 30)
        .with_planner(planner);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();
    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.session.tools_executed, vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn test_analyzer_failure_still_completes_session() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let analyzer = AiAnalyzer::new(
        provider(Err("service unavailable".to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(Arc::clone(&gateway), 2, 30)
        .with_analyzer(analyzer);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert!(report.analysis.is_none());
    assert!(gateway
        .load_analysis(&report.session.session_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_analyzer_success_persists_single_analysis() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let analyzer = AiAnalyzer::new(
        provider(Ok(r#"{
            "summary": "One adapter succeeded",
            "key_findings": ["three items found"],
            "recommendations": [],
            "risk_level": "low",
            "interesting_targets": []
        }"#
        .to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(Arc::clone(&gateway), 2, 30)
        .with_analyzer(analyzer);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    let analysis = report.analysis.unwrap();
    assert_eq!(analysis.session_id, report.session.session_id);
    assert_eq!(analysis.summary, "One adapter succeeded");

    let stored = gateway
        .load_analysis(&report.session.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.summary, "One adapter succeeded");
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let mut harness_one = Harness::new();
    harness_one.add("alpha", 20, false);
    let mut harness_two = Harness::new();
    harness_two.add("alpha", 20, false);
    harness_two.add("bravo", 20, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager_one = harness_one.manager(Arc::clone(&gateway), 2, 30);
    let manager_two = harness_two.manager(Arc::clone(&gateway), 2, 30);
    let cancel = CancellationToken::new();

    let (one, two) = tokio::join!(
        manager_one.run("one.example", None, &cancel),
        manager_two.run("two.example", None, &cancel),
    );
    let one = one.unwrap();
    let two = two.unwrap();

    let results_one = gateway.load_results(&one.session.session_id).await.unwrap();
    let results_two = gateway.load_results(&two.session.session_id).await.unwrap();
    assert_eq!(results_one.len(), 1);
    assert_eq!(results_two.len(), 2);
    assert!(results_one.iter().all(|r| r.target == "one.example"));
    assert!(results_two.iter().all(|r| r.target == "two.example"));
}

#[tokio::test]
async fn test_session_cancellation_still_finalizes() {
    let mut harness = Harness::new();
    harness.add("fast", 10, false);
    harness.add("hung", 60_000, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(Arc::clone(&gateway), 2, 120);
    let cancel = CancellationToken::new();

    let signal = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        signal.cancel();
    });

    let report = manager.run("t1.example", None, &cancel).await.unwrap();

    assert_eq!(report.session.status, SessionStatus::Completed);
    assert_eq!(report.results.len(), 2);
    assert!(report.results[0].success);
    assert_eq!(
        report.results[1].error.as_ref().unwrap().kind,
        FailureKind::Cancelled
    );
}

#[tokio::test]
async fn test_export_round_trip_reconstructs_session() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);
    harness.add("bravo", 1, true);

    let gateway = Arc::new(MemoryGateway::new());
    let analyzer = AiAnalyzer::new(
        provider(Ok(r#"{
            "summary": "mixed results",
            "risk_level": "medium",
            "key_findings": ["bravo failed"],
            "recommendations": ["retry bravo"],
            "interesting_targets": ["dev.t1.example"]
        }"#
        .to_string())),
        Duration::from_secs(5),
    );
    let manager = harness
        .manager(gateway, 2, 30)
        .with_analyzer(analyzer);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();
    let export = manager.export(&report);

    let json = serde_json::to_string_pretty(&export).unwrap();
    assert!(json.contains("\"ai_analysis\""));

    let imported: SessionExport = serde_json::from_str(&json).unwrap();
    let rebuilt = imported.into_report();

    assert_eq!(rebuilt.session.session_id, report.session.session_id);
    assert_eq!(rebuilt.session.status, report.session.status);
    assert_eq!(rebuilt.session.tools_executed, report.session.tools_executed);
    assert_eq!(rebuilt.results.len(), report.results.len());
    for (rebuilt_result, original) in rebuilt.results.iter().zip(&report.results) {
        assert_eq!(rebuilt_result.tool_name, original.tool_name);
        assert_eq!(rebuilt_result.success, original.success);
        assert_eq!(rebuilt_result.data, original.data);
        assert_eq!(rebuilt_result.error, original.error);
        assert_eq!(rebuilt_result.timestamp, original.timestamp);
    }
    let rebuilt_analysis = rebuilt.analysis.unwrap();
    let original_analysis = report.analysis.unwrap();
    assert_eq!(rebuilt_analysis.summary, original_analysis.summary);
    assert_eq!(rebuilt_analysis.risk_level, original_analysis.risk_level);
    assert_eq!(rebuilt_analysis.raw, original_analysis.raw);
}

#[tokio::test]
async fn test_load_returns_stored_session() {
    let mut harness = Harness::new();
    harness.add("alpha", 1, false);

    let gateway = Arc::new(MemoryGateway::new());
    let manager = harness.manager(gateway, 2, 30);
    let cancel = CancellationToken::new();

    let report = manager.run("t1.example", None, &cancel).await.unwrap();
    let loaded = manager
        .load(&report.session.session_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.session.session_id, report.session.session_id);
    assert_eq!(loaded.results.len(), 1);
    assert!(manager.load("no-such-session").await.unwrap().is_none());
}
