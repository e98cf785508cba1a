// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Core Data Model
 * Targets, sessions, tool results, and AI analysis records
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classification of a reconnaissance target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Domain,
    Ip,
    Email,
    Username,
}

impl TargetType {
    /// Infer the target type from its identifier
    pub fn detect(identifier: &str) -> Self {
        if identifier.contains('@') {
            TargetType::Email
        } else if identifier.contains(':')
            || identifier.replace('.', "").chars().all(|c| c.is_ascii_digit())
        {
            TargetType::Ip
        } else if identifier.contains('.') {
            TargetType::Domain
        } else {
            TargetType::Username
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Domain => "domain",
            TargetType::Ip => "ip",
            TargetType::Email => "email",
            TargetType::Username => "username",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable reconnaissance target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Target {
    pub identifier: String,
    pub target_type: TargetType,
}

impl Target {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let target_type = TargetType::detect(&identifier);
        Self {
            identifier,
            target_type,
        }
    }
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// One reconnaissance run against a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub target: Target,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Adapters actually attempted, in selection order. Set once at finalize.
    pub tools_executed: Vec<String>,
}

/// Stable classification of an invocation failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AdapterFault,
    Timeout,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AdapterFault => "adapter_fault",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error descriptor attached to a failed tool result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationError {
    pub kind: FailureKind,
    pub message: String,
}

impl InvocationError {
    pub fn adapter_fault(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::AdapterFault,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Canonical outcome of one adapter invocation within one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub session_id: String,
    pub tool_name: String,
    pub target: String,
    pub success: bool,
    /// Adapter-specific payload, opaque to the engine
    pub data: Option<serde_json::Value>,
    pub error: Option<InvocationError>,
    /// Seconds from invocation start to settlement
    pub execution_time: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Severity assigned by the advisory AI analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Advisory insight synthesized over a finished session. At most one per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub session_id: String,
    pub target: String,
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub interesting_targets: Vec<String>,
    /// Raw structured payload as returned by the advisory service
    pub raw: serde_json::Value,
}
