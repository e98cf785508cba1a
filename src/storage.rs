// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Persistence Gateway
 * Narrow storage interface consumed by the session manager
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::StorageError;
use crate::types::{AiAnalysis, SessionRecord, SessionStatus, Target, ToolResult};

/// Storage operations the engine depends on. The session manager is the
/// sole writer for the duration of a session; adapters and the scheduler
/// never touch storage directly.
#[async_trait::async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Create the target on first reference; later references are no-ops
    async fn create_or_get_target(&self, target: &Target) -> Result<(), StorageError>;

    /// Record a new session with status running and its start time
    async fn begin_session(&self, session: &SessionRecord) -> Result<(), StorageError>;

    /// Append one tool result. Idempotent per (session, adapter name).
    async fn append_tool_result(&self, result: &ToolResult) -> Result<(), StorageError>;

    /// Store at most one AI analysis per session
    async fn upsert_analysis(&self, analysis: &AiAnalysis) -> Result<(), StorageError>;

    /// Terminal status, end time, and the attempted adapter list
    async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: DateTime<Utc>,
        tools_executed: &[String],
    ) -> Result<(), StorageError>;

    async fn load_session(&self, session_id: &str)
        -> Result<Option<SessionRecord>, StorageError>;

    async fn load_results(&self, session_id: &str) -> Result<Vec<ToolResult>, StorageError>;

    async fn load_analysis(&self, session_id: &str)
        -> Result<Option<AiAnalysis>, StorageError>;
}

#[derive(Default)]
struct MemoryState {
    targets: HashMap<String, Target>,
    sessions: HashMap<String, SessionRecord>,
    results: HashMap<String, Vec<ToolResult>>,
    analyses: HashMap<String, AiAnalysis>,
}

/// In-memory gateway used for tests and database-disabled runs
#[derive(Default)]
pub struct MemoryGateway {
    state: RwLock<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored targets, for assertions in tests
    pub async fn target_count(&self) -> usize {
        self.state.read().await.targets.len()
    }

    /// Number of stored sessions, for assertions in tests
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }
}

#[async_trait::async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn create_or_get_target(&self, target: &Target) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .targets
            .entry(target.identifier.clone())
            .or_insert_with(|| target.clone());
        Ok(())
    }

    async fn begin_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .sessions
            .insert(session.session_id.clone(), session.clone());
        state.results.insert(session.session_id.clone(), Vec::new());
        Ok(())
    }

    async fn append_tool_result(&self, result: &ToolResult) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let results = state.results.entry(result.session_id.clone()).or_default();
        match results.iter_mut().find(|r| r.tool_name == result.tool_name) {
            Some(existing) => *existing = result.clone(),
            None => results.push(result.clone()),
        }
        Ok(())
    }

    async fn upsert_analysis(&self, analysis: &AiAnalysis) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .analyses
            .insert(analysis.session_id.clone(), analysis.clone());
        Ok(())
    }

    async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: DateTime<Utc>,
        tools_executed: &[String],
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::UnknownSession {
                session_id: session_id.to_string(),
            })?;
        session.status = status;
        session.end_time = Some(end_time);
        session.tools_executed = tools_executed.to_vec();
        Ok(())
    }

    async fn load_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, StorageError> {
        Ok(self.state.read().await.sessions.get(session_id).cloned())
    }

    async fn load_results(&self, session_id: &str) -> Result<Vec<ToolResult>, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .results
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_analysis(
        &self,
        session_id: &str,
    ) -> Result<Option<AiAnalysis>, StorageError> {
        Ok(self.state.read().await.analyses.get(session_id).cloned())
    }
}
