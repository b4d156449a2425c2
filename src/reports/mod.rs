//! Report retrieval and presentation
//!
//! - `models`: row types returned by the data store
//! - `supabase`: PostgREST-backed [`ReportStore`]
//! - `view`: display-state selection and card formatting
//!
//! The fetcher is the only place a data-layer failure is observed. It is logged
//! there and converted into a [`FetchResult::Failed`] so the page still renders.

pub mod models;
pub mod supabase;
pub mod view;

pub use models::{Report, ReportId};
pub use supabase::SupabaseReportStore;
pub use view::{ReportCard, ReportsView};

use async_trait::async_trait;

/// Table every query reads from
pub const REPORTS_TABLE: &str = "reports";

#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// Non-success response; carries the store's own message when it sent one
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid data store URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Read access to the reports collection
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// All reports, newest first
    async fn list_reports(&self) -> Result<Vec<Report>, ReportStoreError>;
}

/// Outcome of one fetch, recomputed on every page load
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Reports(Vec<Report>),
    Failed(String),
}

/// Perform the single reports read, turning any failure into a renderable value
pub async fn fetch_reports(store: &dyn ReportStore) -> FetchResult {
    match store.list_reports().await {
        Ok(reports) => {
            tracing::debug!(count = reports.len(), "Reports fetched");
            FetchResult::Reports(reports)
        }
        Err(e) => {
            tracing::error!(error = %e, table = REPORTS_TABLE, "Error fetching reports");
            FetchResult::Failed(e.to_string())
        }
    }
}
