// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Tool Adapter Contract
 * Capability interface implemented by every reconnaissance adapter
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Typed failure returned by an adapter invocation
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Failed(String),
}

/// Successful adapter payload plus free-form provenance metadata
#[derive(Debug, Clone, Default)]
pub struct AdapterOutput {
    pub data: serde_json::Value,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AdapterOutput {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Contract every reconnaissance capability implements.
///
/// Adapters are stateless from the engine's perspective: `run` must not
/// retain state observable across invocations for different targets, and
/// must suspend at I/O boundaries rather than block the scheduler.
#[async_trait::async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Stable unique adapter name
    fn name(&self) -> &str;

    /// Free-form classification tag, e.g. "dns", "web", "osint"
    fn category(&self) -> &str;

    /// Human-readable description, fed to the AI planner
    fn description(&self) -> &str;

    /// Execute the adapter against a target
    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError>;
}

/// Adapter metadata exposed for planning and listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub category: String,
    pub description: String,
}

impl AdapterDescriptor {
    pub fn of(adapter: &dyn ToolAdapter) -> Self {
        Self {
            name: adapter.name().to_string(),
            category: adapter.category().to_string(),
            description: adapter.description().to_string(),
        }
    }
}
