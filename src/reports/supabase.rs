//! Supabase (PostgREST) report store
//!
//! Issues `GET {base}/rest/v1/reports?select=*&order=created_at.desc` with the
//! project's anon key. Error bodies follow PostgREST's shape
//! (`{"code","details","hint","message"}`); the `message` field is surfaced as-is.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{Report, ReportStore, ReportStoreError, REPORTS_TABLE};

pub struct SupabaseReportStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

impl SupabaseReportStore {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Query URL for the full collection, newest first
    pub fn reports_url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &format!("{}/rest/v1/{}", self.base_url, REPORTS_TABLE),
            &[("select", "*"), ("order", "created_at.desc")],
        )
    }
}

/// Message for a failed response: PostgREST `message` if present, else the status line
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[async_trait]
impl ReportStore for SupabaseReportStore {
    async fn list_reports(&self) -> Result<Vec<Report>, ReportStoreError> {
        let url = self.reports_url()?;

        tracing::debug!(url = %url, "Querying reports");

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ReportStoreError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        // PostgREST returns `null` rather than `[]` in some proxy configurations
        let reports: Option<Vec<Report>> =
            serde_json::from_str(&body).map_err(|e| ReportStoreError::Decode(e.to_string()))?;

        Ok(reports.unwrap_or_default())
    }
}
