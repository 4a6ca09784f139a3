//! REST content source speaking PostgREST query syntax.
//!
//! Each read becomes `GET {base}/rest/v1/{table}?select=*&col=eq.val&order=a.asc,b.asc`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ContentSource, Query};

/// Connection settings for the REST source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Base URL, e.g. "https://project.supabase.co"
    pub url: String,

    /// Sent as both `apikey` and bearer token
    pub api_key: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Content source backed by a PostgREST endpoint
pub struct RestContentSource {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RestContentSource {
    /// Create a new REST source
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            client,
        })
    }

    /// Build the table URL
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Translate a query into PostgREST parameters
    fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];

        for filter in &query.filters {
            params.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }

        if !query.order_by.is_empty() {
            let order = query
                .order_by
                .iter()
                .map(|col| format!("{}.asc", col))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        params
    }
}

#[async_trait]
impl ContentSource for RestContentSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn read(&self, query: &Query) -> Result<Vec<serde_json::Value>> {
        let table = query.entity.table();
        let mut request = self
            .client
            .get(self.table_url(table))
            .query(&Self::query_params(query));

        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to read '{}' from content source", table))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Content source returned {} for '{}': {}",
                status,
                table,
                body.trim()
            );
        }

        response
            .json::<Vec<serde_json::Value>>()
            .await
            .with_context(|| format!("Failed to parse '{}' response", table))
    }
}
