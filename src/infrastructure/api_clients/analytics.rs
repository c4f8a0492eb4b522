use super::google_auth::{ServiceAccountKey, ANALYTICS_READONLY_SCOPE};
use super::{join_url, ReportSource};
use crate::domain::error::{EtlError, Result};
use crate::domain::report::{ReportRequest, ReportResult, ReportRow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// GA4 Data API (`v1beta`) client authenticated with a service account.
pub struct AnalyticsClient {
    client: reqwest::Client,
    base_url: String,
    credentials: ServiceAccountKey,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<WireRow>,
    #[serde(default)]
    row_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRow {
    #[serde(default)]
    dimension_values: Vec<WireValue>,
    #[serde(default)]
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireValue {
    #[serde(default)]
    value: String,
}

impl From<WireRow> for ReportRow {
    fn from(row: WireRow) -> Self {
        Self {
            dimension_values: row.dimension_values.into_iter().map(|v| v.value).collect(),
            metric_values: row.metric_values.into_iter().map(|v| v.value).collect(),
        }
    }
}

impl AnalyticsClient {
    pub fn new(credentials: ServiceAccountKey, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            credentials,
        }
    }

    fn request_body(request: &ReportRequest) -> serde_json::Value {
        let dimensions: Vec<serde_json::Value> = request
            .dimensions
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();
        let metrics: Vec<serde_json::Value> = request
            .metrics
            .iter()
            .map(|name| json!({ "name": name }))
            .collect();

        json!({
            "dimensions": dimensions,
            "metrics": metrics,
            "dateRanges": [{
                "startDate": request.date_range.start_date,
                "endDate": request.date_range.end_date,
            }],
        })
    }

    pub async fn run_report_with_token(
        &self,
        access_token: &str,
        request: &ReportRequest,
    ) -> Result<ReportResult> {
        let url = join_url(
            &self.base_url,
            &format!("v1beta/{}:runReport", request.property()),
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| EtlError::Fetch(format!("Report request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EtlError::Fetch(format!(
                "Analytics API error ({}): {}",
                status, text
            )));
        }

        let body: RunReportResponse = response
            .json()
            .await
            .map_err(|e| EtlError::Fetch(format!("Failed to parse report response: {}", e)))?;

        let rows: Vec<ReportRow> = body.rows.into_iter().map(ReportRow::from).collect();
        if let Some(total) = body.row_count {
            if total > rows.len() as u64 {
                warn!(
                    returned = rows.len(),
                    total,
                    "Report truncated; only the returned rows will be loaded"
                );
            }
        }

        info!(
            property = %request.property(),
            rows = rows.len(),
            start_date = %request.date_range.start_date,
            "Fetched analytics report"
        );

        Ok(ReportResult {
            rows,
            row_count: body.row_count,
        })
    }
}

#[async_trait]
impl ReportSource for AnalyticsClient {
    async fn run_report(&self, request: &ReportRequest) -> Result<ReportResult> {
        let token = self
            .credentials
            .access_token(&self.client, ANALYTICS_READONLY_SCOPE)
            .await?;
        self.run_report_with_token(&token, request).await
    }
}
