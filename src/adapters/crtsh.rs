// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Certificate Transparency Adapter
 * Subdomain discovery via crt.sh certificate logs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Deserialize;
use std::collections::BTreeSet;

use super::bare_host;
use crate::adapter::{AdapterError, AdapterOutput, ToolAdapter};

const DEFAULT_BASE_URL: &str = "https://crt.sh";

#[derive(Debug, Deserialize)]
struct CertEntry {
    #[serde(default)]
    name_value: String,
}

pub struct CertTransparencyAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl CertTransparencyAdapter {
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
impl ToolAdapter for CertTransparencyAdapter {
    fn name(&self) -> &str {
        "crt_sh"
    }

    fn category(&self) -> &str {
        "dns"
    }

    fn description(&self) -> &str {
        "Search certificate transparency logs for subdomains via crt.sh"
    }

    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError> {
        let domain = bare_host(target);
        let url = format!("{}/?q=%.{}&output=json", self.base_url, domain);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Failed(format!("HTTP {}", status.as_u16())));
        }

        let entries: Vec<CertEntry> = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;

        let mut subdomains = BTreeSet::new();
        for entry in &entries {
            // name_value may pack several names separated by newlines
            for name in entry.name_value.replace('\n', ",").split(',') {
                let name = name.trim().to_lowercase();
                if name.is_empty() || !name.contains(&domain) {
                    continue;
                }
                let name = name.replace("*.", "");
                let name = name.strip_prefix('.').unwrap_or(&name).to_string();
                subdomains.insert(name);
            }
        }

        let subdomains: Vec<String> = subdomains.into_iter().collect();
        Ok(AdapterOutput::new(serde_json::json!({
            "subdomains": subdomains,
            "count": subdomains.len(),
        }))
        .with_metadata("source", serde_json::json!("crt.sh"))
        .with_metadata("certificates_found", serde_json::json!(entries.len())))
    }
}
