// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Wayback Machine Adapter
 * Historical URL discovery via the archive.org CDX API
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::BTreeSet;

use super::bare_host;
use crate::adapter::{AdapterError, AdapterOutput, ToolAdapter};

const DEFAULT_BASE_URL: &str = "https://web.archive.org";

/// Cap on returned rows; the CDX index for a large domain is unbounded
const RESULT_LIMIT: usize = 500;

pub struct WaybackAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl WaybackAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl ToolAdapter for WaybackAdapter {
    fn name(&self) -> &str {
        "wayback"
    }

    fn category(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Extract historical URLs from the Wayback Machine"
    }

    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError> {
        let domain = bare_host(target);
        let url = format!(
            "{}/cdx/search/cdx?url=*.{}/*&output=json&fl=original&collapse=urlkey&limit={}",
            self.base_url, domain, RESULT_LIMIT
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Failed(format!("HTTP {}", status.as_u16())));
        }

        // CDX JSON output is an array of rows; the first row is the header
        let rows: Vec<Vec<String>> = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;

        let urls: BTreeSet<String> = rows
            .iter()
            .skip(1)
            .filter_map(|row| row.first().cloned())
            .collect();

        let urls: Vec<String> = urls.into_iter().collect();
        Ok(AdapterOutput::new(serde_json::json!({
            "urls": urls,
            "count": urls.len(),
        }))
        .with_metadata("source", serde_json::json!("web.archive.org")))
    }
}
