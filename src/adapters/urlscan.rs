// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * urlscan.io Adapter
 * Historical scan and related-domain discovery via urlscan.io search
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Deserialize;
use std::collections::BTreeSet;

use super::bare_host;
use crate::adapter::{AdapterError, AdapterOutput, ToolAdapter};

const DEFAULT_BASE_URL: &str = "https://urlscan.io";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct PageInfo {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub struct UrlscanAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl UrlscanAdapter {
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
impl ToolAdapter for UrlscanAdapter {
    fn name(&self) -> &str {
        "urlscan"
    }

    fn category(&self) -> &str {
        "web"
    }

    fn description(&self) -> &str {
        "Search urlscan.io for historical scans and related domains"
    }

    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError> {
        let domain = bare_host(target);
        let url = format!(
            "{}/api/v1/search/?q=domain:{}&size=100",
            self.base_url, domain
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Failed(format!("HTTP {}", status.as_u16())));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;

        let mut domains = BTreeSet::new();
        let mut urls = BTreeSet::new();
        for result in &search.results {
            if let Some(domain) = &result.page.domain {
                domains.insert(domain.clone());
            }
            if let Some(url) = &result.page.url {
                urls.insert(url.clone());
            }
        }

        Ok(AdapterOutput::new(serde_json::json!({
            "domains": domains.into_iter().collect::<Vec<_>>(),
            "urls": urls.into_iter().collect::<Vec<_>>(),
            "scan_count": search.results.len(),
        }))
        .with_metadata("source", serde_json::json!("urlscan.io")))
    }
}
