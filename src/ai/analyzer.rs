// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! AI result analyzer.
//!
//! Synthesizes a structured insight record over a finished session's tool
//! results. Any failure - timeout, service error, malformed response -
//! simply yields no analysis; the session finalizes either way.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::provider::{extract_json, LlmProvider};
use crate::types::{AiAnalysis, RiskLevel, ToolResult};

const ANALYSIS_TEMPERATURE: f32 = 0.5;

/// Per-result payload excerpt cap for the prompt
const SCALAR_PREVIEW_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a cybersecurity analyst. Analyze reconnaissance data and \
provide actionable insights in structured JSON format.";

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    summary: String,
    #[serde(default)]
    key_findings: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    risk_level: RiskLevel,
    #[serde(default)]
    interesting_targets: Vec<String>,
}

pub struct AiAnalyzer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl AiAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Synthesize at most one AiAnalysis for the session.
    ///
    /// Returns None on any failure; absence of an analysis never
    /// invalidates the session.
    pub async fn analyze(
        &self,
        session_id: &str,
        target: &str,
        results: &[ToolResult],
    ) -> Option<AiAnalysis> {
        let prompt = build_prompt(target, results);

        let response = match tokio::time::timeout(
            self.timeout,
            self.provider
                .complete(SYSTEM_PROMPT, &prompt, ANALYSIS_TEMPERATURE),
        )
        .await
        {
            Err(_) => {
                warn!(
                    "Analysis unavailable: no response within {:.0}s",
                    self.timeout.as_secs_f64()
                );
                return None;
            }
            Ok(Err(err)) => {
                warn!("Analysis unavailable: {:#}", err);
                return None;
            }
            Ok(Ok(response)) => response,
        };

        let cleaned = extract_json(&response);
        let raw: serde_json::Value = match serde_json::from_str(cleaned) {
            Ok(value) => value,
            Err(err) => {
                warn!("Analysis unavailable: response is not JSON ({})", err);
                return None;
            }
        };

        let payload: AnalysisPayload = match serde_json::from_value(raw.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Analysis unavailable: unexpected response shape ({})", err);
                return None;
            }
        };

        info!(
            "AI analysis completed for {} (risk level {})",
            target, payload.risk_level
        );

        Some(AiAnalysis {
            session_id: session_id.to_string(),
            target: target.to_string(),
            summary: payload.summary,
            key_findings: payload.key_findings,
            recommendations: payload.recommendations,
            risk_level: payload.risk_level,
            interesting_targets: payload.interesting_targets,
            raw,
        })
    }
}

/// Compact per-adapter summary. Full payloads stay out of the prompt;
/// arrays and objects collapse to item counts, scalars are truncated.
fn summarize_results(results: &[ToolResult]) -> serde_json::Value {
    let mut summary = serde_json::Map::new();
    for result in results {
        let line = if result.success {
            match &result.data {
                Some(serde_json::Value::Array(items)) => format!("Found {} items", items.len()),
                Some(serde_json::Value::Object(map)) => format!("Found {} keys", map.len()),
                Some(other) => {
                    let text = other.to_string();
                    text.chars().take(SCALAR_PREVIEW_CHARS).collect()
                }
                None => "Completed".to_string(),
            }
        } else {
            match &result.error {
                Some(error) => format!("Failed ({})", error.kind),
                None => "Failed".to_string(),
            }
        };
        summary.insert(result.tool_name.clone(), serde_json::Value::String(line));
    }
    serde_json::Value::Object(summary)
}

fn build_prompt(target: &str, results: &[ToolResult]) -> String {
    let summary = serde_json::to_string_pretty(&summarize_results(results))
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "Analyze reconnaissance results for target: {target}\n\n\
         Results summary:\n{summary}\n\n\
         Provide analysis in JSON format with:\n\
         1. \"summary\": Brief overview of findings\n\
         2. \"key_findings\": Array of important discoveries\n\
         3. \"recommendations\": Array of next steps or tools to run\n\
         4. \"risk_level\": \"low\", \"medium\", \"high\", or \"critical\"\n\
         5. \"interesting_targets\": Array of subdomains/IPs worth investigating\n\n\
         Respond with ONLY valid JSON, no markdown or code blocks."
    )
}
