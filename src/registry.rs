// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Tool Registry
 * Central registry for all available reconnaissance adapters
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::adapter::{AdapterDescriptor, ToolAdapter};

/// Holds adapters keyed by unique name. Built once at process start and
/// treated as read-only afterwards; registration order is the default
/// execution order.
pub struct ToolRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register an adapter. A repeated name replaces the previous instance
    /// without changing its position in the default order.
    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.name().to_string();
        if self.adapters.insert(name.clone(), adapter).is_some() {
            warn!("Adapter {} registered twice, replacing previous instance", name);
        } else {
            self.order.push(name);
        }
    }

    /// Get an adapter by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// Check if an adapter exists
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// All adapter names in registration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Descriptors for all adapters in registration order
    pub fn descriptors(&self) -> Vec<AdapterDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.adapters.get(name))
            .map(|adapter| AdapterDescriptor::of(adapter.as_ref()))
            .collect()
    }

    /// Split a requested name list into known adapters and unknown names.
    /// Unknown names are filtered out and reported, never a hard error;
    /// request order is preserved.
    pub fn resolve(&self, names: &[String]) -> (Vec<Arc<dyn ToolAdapter>>, Vec<String>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match self.adapters.get(name) {
                Some(adapter) => known.push(Arc::clone(adapter)),
                None => unknown.push(name.clone()),
            }
        }
        (known, unknown)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
