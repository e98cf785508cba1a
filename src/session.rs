// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Session Manager
 * Session lifecycle, orchestration sequence, and interchange format
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ai::{AiAnalyzer, AiPlanner};
use crate::config::ToolsConfig;
use crate::errors::{EngineError, EngineResult, StorageError};
use crate::registry::ToolRegistry;
use crate::scheduler::ConcurrencyScheduler;
use crate::storage::PersistenceGateway;
use crate::types::{AiAnalysis, SessionRecord, SessionStatus, Target, TargetType, ToolResult};

/// Everything a finished session produced
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session: SessionRecord,
    pub results: Vec<ToolResult>,
    pub analysis: Option<AiAnalysis>,
}

/// Interchange document for a session. Round-trips through JSON with all
/// fields unchanged; the AI analysis lives under the reserved
/// `ai_analysis` key when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub session_id: String,
    pub target: String,
    pub target_type: TargetType,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub tools_executed: Vec<String>,
    pub results: BTreeMap<String, ToolResult>,
    #[serde(rename = "ai_analysis", skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
}

impl SessionExport {
    pub fn from_report(report: &SessionReport) -> Self {
        let results = report
            .results
            .iter()
            .map(|result| (result.tool_name.clone(), result.clone()))
            .collect();
        Self {
            session_id: report.session.session_id.clone(),
            target: report.session.target.identifier.clone(),
            target_type: report.session.target.target_type,
            status: report.session.status,
            start_time: report.session.start_time,
            end_time: report.session.end_time,
            tools_executed: report.session.tools_executed.clone(),
            results,
            ai_analysis: report.analysis.clone(),
        }
    }

    /// Reconstruct the session, its results, and its analysis. Results
    /// come back in `tools_executed` order.
    pub fn into_report(self) -> SessionReport {
        let mut results_by_name = self.results;
        let mut results = Vec::with_capacity(self.tools_executed.len());
        for name in &self.tools_executed {
            if let Some(result) = results_by_name.remove(name) {
                results.push(result);
            }
        }
        // Results for adapters outside tools_executed should not exist,
        // but a hand-edited document must not lose them on import.
        results.extend(results_by_name.into_values());

        SessionReport {
            session: SessionRecord {
                session_id: self.session_id,
                target: Target {
                    identifier: self.target,
                    target_type: self.target_type,
                },
                status: self.status,
                start_time: self.start_time,
                end_time: self.end_time,
                tools_executed: self.tools_executed,
            },
            results,
            analysis: self.ai_analysis,
        }
    }
}

/// Owns the session lifecycle: create, plan, execute, analyze, finalize,
/// persist. The sole writer of session status and of all gateway records.
pub struct SessionManager {
    registry: Arc<ToolRegistry>,
    gateway: Arc<dyn PersistenceGateway>,
    planner: Option<AiPlanner>,
    analyzer: Option<AiAnalyzer>,
    max_concurrent: usize,
    invocation_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        registry: Arc<ToolRegistry>,
        gateway: Arc<dyn PersistenceGateway>,
        tools: &ToolsConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            planner: None,
            analyzer: None,
            max_concurrent: tools.max_concurrent,
            invocation_timeout: tools.timeout(),
        }
    }

    pub fn with_planner(mut self, planner: AiPlanner) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_analyzer(mut self, analyzer: AiAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Run one reconnaissance session.
    ///
    /// `requested` restricts the run to an explicit adapter list; `None`
    /// lets the planner (when configured) propose a subset, falling back
    /// to the full registry in registration order.
    ///
    /// A session that ran to completion reports `completed` even if every
    /// adapter failed; only validation before any invocation starts and
    /// persistence faults after execution surface as errors.
    pub async fn run(
        &self,
        target: &str,
        requested: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> EngineResult<SessionReport> {
        let identifier = target.trim();
        if identifier.is_empty() {
            return Err(EngineError::Validation(
                "target identifier must not be empty".to_string(),
            ));
        }

        // An explicitly requested unknown adapter is a caller mistake and
        // fails fast; planner output is merely filtered later.
        if let Some(names) = requested {
            let (_, unknown) = self.registry.resolve(names);
            if !unknown.is_empty() {
                return Err(EngineError::Validation(format!(
                    "unknown adapters requested: {}",
                    unknown.join(", ")
                )));
            }
        }

        let target = Target::new(identifier);
        self.gateway.create_or_get_target(&target).await?;

        let mut session = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            target: target.clone(),
            status: SessionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            tools_executed: Vec::new(),
        };
        self.gateway.begin_session(&session).await?;

        info!(
            "Session {} started for {} ({})",
            session.session_id, target.identifier, target.target_type
        );

        let selection = self.select_adapters(&target.identifier, requested).await;
        info!("Execution plan: {:?}", selection);

        let scheduler = ConcurrencyScheduler::new(
            Arc::clone(&self.registry),
            self.max_concurrent,
            self.invocation_timeout,
        );
        let results = scheduler
            .execute(&session.session_id, &target.identifier, &selection, cancel)
            .await;
        session.tools_executed = selection;

        for result in &results {
            if let Err(err) = self.gateway.append_tool_result(result).await {
                return self.fail_session(session, err).await;
            }
        }

        let analysis = self.run_analysis(&session, &results, cancel).await;
        if let Some(ref analysis) = analysis {
            if let Err(err) = self.gateway.upsert_analysis(analysis).await {
                return self.fail_session(session, err).await;
            }
        }

        session.status = SessionStatus::Completed;
        session.end_time = Some(Utc::now());
        if let Err(err) = self
            .gateway
            .finalize_session(
                &session.session_id,
                session.status,
                session.end_time.unwrap_or_else(Utc::now),
                &session.tools_executed,
            )
            .await
        {
            return self.fail_session(session, err).await;
        }

        info!(
            "Session {} completed: {}/{} adapters succeeded",
            session.session_id,
            results.iter().filter(|r| r.success).count(),
            results.len()
        );

        Ok(SessionReport {
            session,
            results,
            analysis,
        })
    }

    /// Load a stored session back from the gateway
    pub async fn load(&self, session_id: &str) -> EngineResult<Option<SessionReport>> {
        let Some(session) = self.gateway.load_session(session_id).await? else {
            return Ok(None);
        };
        let results = self.gateway.load_results(session_id).await?;
        let analysis = self.gateway.load_analysis(session_id).await?;
        Ok(Some(SessionReport {
            session,
            results,
            analysis,
        }))
    }

    /// Produce the interchange document for a finished session
    pub fn export(&self, report: &SessionReport) -> SessionExport {
        SessionExport::from_report(report)
    }

    /// Decide what to run: explicit request, AI plan, or the full
    /// registry in registration order. Duplicate names are dropped
    /// silently, first occurrence wins.
    async fn select_adapters(
        &self,
        target: &str,
        requested: Option<&[String]>,
    ) -> Vec<String> {
        if let Some(names) = requested {
            return dedup_selection(names);
        }

        if let Some(planner) = &self.planner {
            if let Some(proposed) = planner.plan(target, &self.registry.descriptors()).await {
                let (known, unknown) = self.registry.resolve(&proposed);
                for name in &unknown {
                    warn!("Dropping unknown adapter from AI plan: {}", name);
                }
                let names: Vec<String> =
                    known.iter().map(|a| a.name().to_string()).collect();
                let selection = dedup_selection(&names);
                if !selection.is_empty() {
                    return selection;
                }
                warn!("AI plan contained no known adapters, using default set");
            }
        }

        self.registry.names()
    }

    async fn run_analysis(
        &self,
        session: &SessionRecord,
        results: &[ToolResult],
        cancel: &CancellationToken,
    ) -> Option<AiAnalysis> {
        if cancel.is_cancelled() {
            debug!("Session cancelled, skipping AI analysis");
            return None;
        }
        let analyzer = self.analyzer.as_ref()?;
        analyzer
            .analyze(&session.session_id, &session.target.identifier, results)
            .await
    }

    /// Mark the session failed after a persistence fault. Finalization is
    /// best effort; the original fault is what surfaces.
    async fn fail_session(
        &self,
        mut session: SessionRecord,
        err: StorageError,
    ) -> EngineResult<SessionReport> {
        error!("Session {} failed: {}", session.session_id, err);
        session.status = SessionStatus::Failed;
        session.end_time = Some(Utc::now());
        if let Err(finalize_err) = self
            .gateway
            .finalize_session(
                &session.session_id,
                SessionStatus::Failed,
                session.end_time.unwrap_or_else(Utc::now),
                &session.tools_executed,
            )
            .await
        {
            error!(
                "Could not record failed status for session {}: {}",
                session.session_id, finalize_err
            );
        }
        Err(EngineError::Persistence(err))
    }
}

fn dedup_selection(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut selection = Vec::with_capacity(names.len());
    for name in names {
        if seen.insert(name.as_str()) {
            selection.push(name.clone());
        } else {
            warn!("Duplicate adapter {} in selection, keeping first occurrence", name);
        }
    }
    selection
}
