// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * DNS Lookup Adapter
 * A/MX/NS record discovery via DNS-over-HTTPS
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Deserialize;

use super::bare_host;
use crate::adapter::{AdapterError, AdapterOutput, ToolAdapter};

const DEFAULT_BASE_URL: &str = "https://cloudflare-dns.com";

const RECORD_TYPES: &[&str] = &["A", "MX", "NS"];

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(default)]
    data: String,
}

pub struct DnsLookupAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl DnsLookupAdapter {
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

    async fn query(&self, domain: &str, record_type: &str) -> Result<Vec<String>, AdapterError> {
        let url = format!(
            "{}/dns-query?name={}&type={}",
            self.base_url, domain, record_type
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/dns-json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Failed(format!("HTTP {}", status.as_u16())));
        }

        let doh: DohResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;

        Ok(doh.answer.into_iter().map(|a| a.data).collect())
    }
}

#[async_trait::async_trait]
impl ToolAdapter for DnsLookupAdapter {
    fn name(&self) -> &str {
        "dns_lookup"
    }

    fn category(&self) -> &str {
        "dns"
    }

    fn description(&self) -> &str {
        "Resolve A, MX, and NS records over DNS-over-HTTPS"
    }

    async fn run(&self, target: &str) -> Result<AdapterOutput, AdapterError> {
        let domain = bare_host(target);

        let mut records = serde_json::Map::new();
        let mut total = 0usize;
        for record_type in RECORD_TYPES {
            let answers = self.query(&domain, record_type).await?;
            total += answers.len();
            records.insert(
                record_type.to_lowercase(),
                serde_json::Value::from(answers),
            );
        }

        Ok(AdapterOutput::new(serde_json::json!({
            "records": records,
            "count": total,
        }))
        .with_metadata("source", serde_json::json!("dns-over-https")))
    }
}
