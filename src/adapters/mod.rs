// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - Built-in Reconnaissance Adapters
 * Passive, unauthenticated adapters over public data sources
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::registry::ToolRegistry;

pub mod crtsh;
pub mod dns;
pub mod urlscan;
pub mod wayback;

pub use crtsh::CertTransparencyAdapter;
pub use dns::DnsLookupAdapter;
pub use urlscan::UrlscanAdapter;
pub use wayback::WaybackAdapter;

const USER_AGENT: &str = concat!("harava/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout inside adapters. The scheduler enforces the real
/// invocation budget independently of adapter cooperation.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP client for all built-in adapters
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client for adapters")
}

/// Build the default registry with all built-in adapters registered
pub fn default_registry() -> Result<ToolRegistry> {
    let client = http_client()?;
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CertTransparencyAdapter::new(client.clone())));
    registry.register(Arc::new(DnsLookupAdapter::new(client.clone())));
    registry.register(Arc::new(WaybackAdapter::new(client.clone())));
    registry.register(Arc::new(UrlscanAdapter::new(client)));
    Ok(registry)
}

/// Reduce a target to its bare host: strip scheme, path, and port
pub(crate) fn bare_host(target: &str) -> String {
    let stripped = target
        .trim()
        .strip_prefix("https://")
        .or_else(|| target.trim().strip_prefix("http://"))
        .unwrap_or(target.trim());
    let host = stripped.split('/').next().unwrap_or(stripped);
    host.split('@').last().unwrap_or(host).to_lowercase()
}
