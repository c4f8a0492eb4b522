pub mod analytics;
pub mod google_auth;
pub mod typeform;

#[cfg(test)]
pub(crate) mod stub_server;

use crate::domain::error::Result;
use crate::domain::report::{ReportRequest, ReportResult};
use crate::domain::survey::ResponsePage;
use async_trait::async_trait;

pub use analytics::AnalyticsClient;
pub use typeform::TypeformClient;

#[async_trait]
pub trait ReportSource {
    async fn run_report(&self, request: &ReportRequest) -> Result<ReportResult>;
}

#[async_trait]
pub trait ResponseSource {
    async fn fetch_responses(&self, form_id: &str, page_size: u32) -> Result<ResponsePage>;
}

fn join_url(base_url: &str, path: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}{}", base_url, path.trim_start_matches('/'))
    } else {
        format!("{}/{}", base_url, path.trim_start_matches('/'))
    }
}
