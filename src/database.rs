// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - PostgreSQL Gateway
 * Persistence gateway backed by PostgreSQL with connection pooling
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::errors::StorageError;
use crate::storage::PersistenceGateway;
use crate::types::{
    AiAnalysis, InvocationError, RiskLevel, SessionRecord, SessionStatus, Target, TargetType,
    ToolResult,
};

/// PostgreSQL persistence gateway with connection pooling
pub struct PostgresGateway {
    pool: Pool,
    config: DatabaseConfig,
}

impl PostgresGateway {
    /// Create a new gateway with a connection pool
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let mut pg_config = Config::new();
        pg_config.url = Some(config.database_url.clone());
        pg_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg_config.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_size.max(1)));

        let pool = pg_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create PostgreSQL pool")?;

        if !config.enabled {
            info!("PostgreSQL disabled - gateway operations will be skipped");
            return Ok(Self { pool, config });
        }

        // Test connection
        let client = pool
            .get()
            .await
            .context("Failed to get connection from pool")?;
        client
            .query("SELECT 1", &[])
            .await
            .context("Failed to test database connection")?;

        info!("PostgreSQL connected: pool_size={}", config.pool_size);

        Ok(Self { pool, config })
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let client = self.pool.get().await?;

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS targets (
                    id SERIAL PRIMARY KEY,
                    target TEXT UNIQUE NOT NULL,
                    target_type VARCHAR(20),
                    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
                )
                "#,
                &[],
            )
            .await
            .context("Failed to create targets table")?;

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id SERIAL PRIMARY KEY,
                    session_id VARCHAR(64) UNIQUE NOT NULL,
                    target TEXT NOT NULL,
                    target_type VARCHAR(20),
                    status VARCHAR(20) NOT NULL,
                    start_time TIMESTAMP WITH TIME ZONE NOT NULL,
                    end_time TIMESTAMP WITH TIME ZONE,
                    tools_executed JSONB NOT NULL DEFAULT '[]'::jsonb,
                    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
                )
                "#,
                &[],
            )
            .await
            .context("Failed to create sessions table")?;

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS tool_results (
                    id SERIAL PRIMARY KEY,
                    session_id VARCHAR(64) NOT NULL,
                    tool_name VARCHAR(128) NOT NULL,
                    target TEXT NOT NULL,
                    success BOOLEAN NOT NULL,
                    data JSONB,
                    error JSONB,
                    execution_time DOUBLE PRECISION NOT NULL DEFAULT 0,
                    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                    timestamp TIMESTAMP WITH TIME ZONE NOT NULL,
                    UNIQUE (session_id, tool_name),
                    FOREIGN KEY (session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
                )
                "#,
                &[],
            )
            .await
            .context("Failed to create tool_results table")?;

        client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS ai_analysis (
                    id SERIAL PRIMARY KEY,
                    session_id VARCHAR(64) UNIQUE NOT NULL,
                    target TEXT NOT NULL,
                    summary TEXT,
                    key_findings JSONB NOT NULL DEFAULT '[]'::jsonb,
                    recommendations JSONB NOT NULL DEFAULT '[]'::jsonb,
                    risk_level VARCHAR(20),
                    interesting_targets JSONB NOT NULL DEFAULT '[]'::jsonb,
                    analysis_data JSONB,
                    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                    FOREIGN KEY (session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
                )
                "#,
                &[],
            )
            .await
            .context("Failed to create ai_analysis table")?;

        client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_sessions_session_id ON sessions(session_id)",
                &[],
            )
            .await?;
        client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_results_session_id ON tool_results(session_id)",
                &[],
            )
            .await?;
        client
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_sessions_target ON sessions(target)",
                &[],
            )
            .await?;

        info!("Database schema initialized");

        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, StorageError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait::async_trait]
impl PersistenceGateway for PostgresGateway {
    async fn create_or_get_target(&self, target: &Target) -> Result<(), StorageError> {
        if !self.config.enabled {
            debug!("PostgreSQL disabled, skipping create_or_get_target");
            return Ok(());
        }

        let client = self.client().await?;
        client
            .execute(
                r#"
                INSERT INTO targets (target, target_type)
                VALUES ($1, $2)
                ON CONFLICT (target) DO UPDATE SET updated_at = NOW()
                "#,
                &[&target.identifier, &target.target_type.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn begin_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        if !self.config.enabled {
            return Ok(());
        }

        let client = self.client().await?;
        let tools = serde_json::json!(session.tools_executed);
        client
            .execute(
                r#"
                INSERT INTO sessions (session_id, target, target_type, status, start_time, tools_executed)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
                &[
                    &session.session_id,
                    &session.target.identifier,
                    &session.target.target_type.as_str(),
                    &session.status.as_str(),
                    &session.start_time,
                    &tools,
                ],
            )
            .await?;
        Ok(())
    }

    async fn append_tool_result(&self, result: &ToolResult) -> Result<(), StorageError> {
        if !self.config.enabled {
            return Ok(());
        }

        let client = self.client().await?;
        let error = result
            .error
            .as_ref()
            .map(|e| serde_json::json!(e));
        let metadata = serde_json::json!(result.metadata);
        client
            .execute(
                r#"
                INSERT INTO tool_results
                    (session_id, tool_name, target, success, data, error, execution_time, metadata, timestamp)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (session_id, tool_name) DO UPDATE SET
                    success = EXCLUDED.success,
                    data = EXCLUDED.data,
                    error = EXCLUDED.error,
                    execution_time = EXCLUDED.execution_time,
                    metadata = EXCLUDED.metadata,
                    timestamp = EXCLUDED.timestamp
                "#,
                &[
                    &result.session_id,
                    &result.tool_name,
                    &result.target,
                    &result.success,
                    &result.data,
                    &error,
                    &result.execution_time,
                    &metadata,
                    &result.timestamp,
                ],
            )
            .await?;
        Ok(())
    }

    async fn upsert_analysis(&self, analysis: &AiAnalysis) -> Result<(), StorageError> {
        if !self.config.enabled {
            return Ok(());
        }

        let client = self.client().await?;
        let key_findings = serde_json::json!(analysis.key_findings);
        let recommendations = serde_json::json!(analysis.recommendations);
        let interesting_targets = serde_json::json!(analysis.interesting_targets);
        client
            .execute(
                r#"
                INSERT INTO ai_analysis
                    (session_id, target, summary, key_findings, recommendations,
                     risk_level, interesting_targets, analysis_data)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (session_id) DO UPDATE SET
                    summary = EXCLUDED.summary,
                    key_findings = EXCLUDED.key_findings,
                    recommendations = EXCLUDED.recommendations,
                    risk_level = EXCLUDED.risk_level,
                    interesting_targets = EXCLUDED.interesting_targets,
                    analysis_data = EXCLUDED.analysis_data
                "#,
                &[
                    &analysis.session_id,
                    &analysis.target,
                    &analysis.summary,
                    &key_findings,
                    &recommendations,
                    &analysis.risk_level.as_str(),
                    &interesting_targets,
                    &analysis.raw,
                ],
            )
            .await?;
        Ok(())
    }

    async fn finalize_session(
        &self,
        session_id: &str,
        status: SessionStatus,
        end_time: DateTime<Utc>,
        tools_executed: &[String],
    ) -> Result<(), StorageError> {
        if !self.config.enabled {
            return Ok(());
        }

        let client = self.client().await?;
        let tools = serde_json::json!(tools_executed);
        let updated = client
            .execute(
                r#"
                UPDATE sessions
                SET status = $2, end_time = $3, tools_executed = $4
                WHERE session_id = $1
                "#,
                &[&session_id, &status.as_str(), &end_time, &tools],
            )
            .await?;

        if updated == 0 {
            return Err(StorageError::UnknownSession {
                session_id: session_id.to_string(),
            });
        }
        Ok(())
    }

    async fn load_session(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, StorageError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let client = self.client().await?;
        let row = client
            .query_opt(
                r#"
                SELECT session_id, target, target_type, status, start_time, end_time, tools_executed
                FROM sessions WHERE session_id = $1
                "#,
                &[&session_id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let identifier: String = row.get("target");
        let target_type: Option<String> = row.get("target_type");
        let status: String = row.get("status");
        let tools: serde_json::Value = row.get("tools_executed");

        Ok(Some(SessionRecord {
            session_id: row.get("session_id"),
            target: Target {
                target_type: target_type
                    .as_deref()
                    .map(parse_target_type)
                    .unwrap_or_else(|| TargetType::detect(&identifier)),
                identifier,
            },
            status: status
                .parse()
                .map_err(|reason| StorageError::QueryFailed { reason })?,
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            tools_executed: serde_json::from_value(tools).unwrap_or_default(),
        }))
    }

    async fn load_results(&self, session_id: &str) -> Result<Vec<ToolResult>, StorageError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let client = self.client().await?;
        let rows = client
            .query(
                r#"
                SELECT session_id, tool_name, target, success, data, error,
                       execution_time, metadata, timestamp
                FROM tool_results WHERE session_id = $1 ORDER BY timestamp
                "#,
                &[&session_id],
            )
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let error: Option<serde_json::Value> = row.get("error");
            let metadata: serde_json::Value = row.get("metadata");
            results.push(ToolResult {
                session_id: row.get("session_id"),
                tool_name: row.get("tool_name"),
                target: row.get("target"),
                success: row.get("success"),
                data: row.get("data"),
                error: error
                    .map(serde_json::from_value::<InvocationError>)
                    .transpose()
                    .map_err(|e| StorageError::QueryFailed {
                        reason: e.to_string(),
                    })?,
                execution_time: row.get("execution_time"),
                metadata: serde_json::from_value(metadata).unwrap_or_default(),
                timestamp: row.get("timestamp"),
            });
        }
        Ok(results)
    }

    async fn load_analysis(
        &self,
        session_id: &str,
    ) -> Result<Option<AiAnalysis>, StorageError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let client = self.client().await?;
        let row = client
            .query_opt(
                r#"
                SELECT session_id, target, summary, key_findings, recommendations,
                       risk_level, interesting_targets, analysis_data
                FROM ai_analysis WHERE session_id = $1
                "#,
                &[&session_id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let risk_level: Option<String> = row.get("risk_level");
        let key_findings: serde_json::Value = row.get("key_findings");
        let recommendations: serde_json::Value = row.get("recommendations");
        let interesting_targets: serde_json::Value = row.get("interesting_targets");
        let raw: Option<serde_json::Value> = row.get("analysis_data");

        Ok(Some(AiAnalysis {
            session_id: row.get("session_id"),
            target: row.get("target"),
            summary: row.get::<_, Option<String>>("summary").unwrap_or_default(),
            key_findings: serde_json::from_value(key_findings).unwrap_or_default(),
            recommendations: serde_json::from_value(recommendations).unwrap_or_default(),
            risk_level: risk_level
                .as_deref()
                .map(parse_risk_level)
                .unwrap_or(RiskLevel::Low),
            interesting_targets: serde_json::from_value(interesting_targets).unwrap_or_default(),
            raw: raw.unwrap_or(serde_json::Value::Null),
        }))
    }
}

fn parse_target_type(value: &str) -> TargetType {
    match value {
        "ip" => TargetType::Ip,
        "email" => TargetType::Email,
        "username" => TargetType::Username,
        _ => TargetType::Domain,
    }
}

fn parse_risk_level(value: &str) -> RiskLevel {
    match value {
        "medium" => RiskLevel::Medium,
        "high" => RiskLevel::High,
        "critical" => RiskLevel::Critical,
        _ => RiskLevel::Low,
    }
}
