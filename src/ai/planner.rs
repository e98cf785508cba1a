// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! AI execution planner.
//!
//! Asks the advisory service for an ordered adapter subset before a run.
//! The proposal is advisory only: unknown names are filtered by the
//! caller against the registry, and any failure here degrades to the
//! default adapter set.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::provider::{extract_json, LlmProvider};
use crate::adapter::AdapterDescriptor;

const PLANNING_TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = "You are a cybersecurity expert specializing in reconnaissance. \
Provide concise, actionable tool execution plans.";

pub struct AiPlanner {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl AiPlanner {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Request an ordered adapter-name subset for the target.
    ///
    /// Returns None when the service is unreachable, times out, or returns
    /// output that is not a JSON array of strings; the caller then falls
    /// back to the full default set. Returned names are NOT validated
    /// against the registry here.
    pub async fn plan(
        &self,
        target: &str,
        adapters: &[AdapterDescriptor],
    ) -> Option<Vec<String>> {
        let prompt = build_prompt(target, adapters);

        let response = match tokio::time::timeout(
            self.timeout,
            self.provider
                .complete(SYSTEM_PROMPT, &prompt, PLANNING_TEMPERATURE),
        )
        .await
        {
            Err(_) => {
                warn!(
                    "Planning degraded: no response within {:.0}s, using default adapter set",
                    self.timeout.as_secs_f64()
                );
                return None;
            }
            Ok(Err(err)) => {
                warn!("Planning degraded: {:#}, using default adapter set", err);
                return None;
            }
            Ok(Ok(response)) => response,
        };

        match serde_json::from_str::<Vec<String>>(extract_json(&response)) {
            Ok(plan) if !plan.is_empty() => {
                info!("AI proposed execution plan: {:?}", plan);
                Some(plan)
            }
            Ok(_) => {
                warn!("Planning degraded: empty plan, using default adapter set");
                None
            }
            Err(err) => {
                warn!(
                    "Planning degraded: unparseable plan ({}), using default adapter set",
                    err
                );
                None
            }
        }
    }
}

fn build_prompt(target: &str, adapters: &[AdapterDescriptor]) -> String {
    let mut listing = String::new();
    for descriptor in adapters {
        listing.push_str(&format!(
            "- {} [{}]: {}\n",
            descriptor.name, descriptor.category, descriptor.description
        ));
    }

    format!(
        "You are planning reconnaissance for target: {target}\n\n\
         Available tools:\n{listing}\n\
         Create an optimal execution plan. Consider:\n\
         1. Start with passive, non-intrusive tools (APIs, DNS lookups)\n\
         2. Then move to active enumeration\n\
         3. Finally, deep analysis tools\n\n\
         Respond with ONLY a JSON array of tool names in execution order, no other text.\n\
         Example: [\"crt_sh\", \"dns_lookup\", \"wayback\"]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    struct ScriptedProvider {
        response: Result<String, String>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String> {
            tokio::time::sleep(self.delay).await;
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

    fn planner_with(response: Result<String, String>, delay: Duration) -> AiPlanner {
        AiPlanner::new(
            Arc::new(ScriptedProvider { response, delay }),
            Duration::from_millis(300),
        )
    }

    fn descriptors() -> Vec<AdapterDescriptor> {
        vec![AdapterDescriptor {
            name: "crt_sh".to_string(),
            category: "dns".to_string(),
            description: "cert transparency".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_plan_parses_json_array() {
        let planner = planner_with(
            Ok(r#"["crt_sh", "wayback"]"#.to_string()),
            Duration::ZERO,
        );
        let plan = planner.plan("example.com", &descriptors()).await;
        assert_eq!(plan, Some(vec!["crt_sh".to_string(), "wayback".to_string()]));
    }

    #[tokio::test]
    async fn test_plan_strips_markdown_fences() {
        let planner = planner_with(
            Ok("```json\n[\"crt_sh\"]\n```".to_string()),
            Duration::ZERO,
        );
        let plan = planner.plan("example.com", &descriptors()).await;
        assert_eq!(plan, Some(vec!["crt_sh".to_string()]));
    }

    #[tokio::test]
    async fn test_malformed_plan_degrades_to_none() {
        let planner = planner_with(Ok("run everything!".to_string()), Duration::ZERO);
        assert!(planner.plan("example.com", &descriptors()).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_plan_degrades_to_none() {
        let planner = planner_with(Ok("[]".to_string()), Duration::ZERO);
        assert!(planner.plan("example.com", &descriptors()).await.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_degrades_to_none() {
        let planner = planner_with(Err("service unavailable".to_string()), Duration::ZERO);
        assert!(planner.plan("example.com", &descriptors()).await.is_none());
    }

    #[tokio::test]
    async fn test_slow_provider_degrades_to_none() {
        let planner = planner_with(
            Ok(r#"["crt_sh"]"#.to_string()),
            Duration::from_secs(10),
        );
        let started = std::time::Instant::now();
        assert!(planner.plan("example.com", &descriptors()).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
