use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::report_flattener::flatten_report;
use crate::domain::error::Result;
use crate::domain::report::{ReportRequest, ANALYTICS_TABLE};
use crate::infrastructure::api_clients::ReportSource;
use crate::infrastructure::db::TableSink;

use super::LoadOutcome;

/// Fetches the traffic report and replaces `google_analytics_data` with it.
pub struct AnalyticsPipeline {
    source: Arc<dyn ReportSource + Send + Sync>,
    sink: Arc<dyn TableSink + Send + Sync>,
}

impl AnalyticsPipeline {
    pub fn new(
        source: Arc<dyn ReportSource + Send + Sync>,
        sink: Arc<dyn TableSink + Send + Sync>,
    ) -> Self {
        Self { source, sink }
    }

    pub async fn execute(&self, request: &ReportRequest) -> Result<LoadOutcome> {
        let result = self.source.run_report(request).await?;

        if result.rows.is_empty() {
            info!(
                property = %request.property(),
                "Report returned no rows; leaving {} untouched",
                ANALYTICS_TABLE
            );
            return Ok(LoadOutcome::skipped(ANALYTICS_TABLE));
        }

        let table = flatten_report(request, &result.rows)?;
        let rows_written = self.sink.replace_table(ANALYTICS_TABLE, &table).await?;

        info!(table = ANALYTICS_TABLE, rows = rows_written, "Analytics data loaded");
        Ok(LoadOutcome::written(ANALYTICS_TABLE, rows_written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::fakes::{FixedReport, RecordingSink};
    use crate::domain::error::EtlError;
    use crate::domain::report::{ReportResult, ReportRow, REPORT_DIMENSIONS, REPORT_METRICS};
    use chrono::NaiveDate;

    fn request() -> ReportRequest {
        ReportRequest::traffic("42", NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
    }

    fn row(date: &str) -> ReportRow {
        ReportRow {
            dimension_values: vec![
                date.to_string(),
                "Lisbon".to_string(),
                "Portugal".to_string(),
                "desktop".to_string(),
                "google".to_string(),
                "cpc".to_string(),
            ],
            metric_values: (0..9).map(|i| i.to_string()).collect(),
        }
    }

    fn pipeline(
        result: Result<ReportResult>,
    ) -> (AnalyticsPipeline, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = AnalyticsPipeline::new(Arc::new(FixedReport(result)), sink.clone());
        (pipeline, sink)
    }

    #[tokio::test]
    async fn test_loads_every_fetched_row() {
        let rows = vec![row("20240601"), row("20240602"), row("20240603")];
        let (pipeline, sink) = pipeline(Ok(ReportResult {
            rows,
            row_count: Some(3),
        }));

        let outcome = pipeline.execute(&request()).await.unwrap();

        assert_eq!(outcome.rows_written, 3);
        assert!(outcome.written);
        let writes = sink.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "google_analytics_data");
        assert_eq!(writes[0].1.row_count(), 3);
    }

    #[tokio::test]
    async fn test_column_order_is_dimensions_then_metrics() {
        let (pipeline, sink) = pipeline(Ok(ReportResult {
            rows: vec![row("20240601")],
            row_count: None,
        }));

        pipeline.execute(&request()).await.unwrap();

        let expected: Vec<String> = REPORT_DIMENSIONS
            .iter()
            .chain(REPORT_METRICS.iter())
            .map(|s| s.to_string())
            .collect();
        assert_eq!(sink.writes()[0].1.columns, expected);
    }

    #[tokio::test]
    async fn test_zero_rows_skips_the_write() {
        let (pipeline, sink) = pipeline(Ok(ReportResult::default()));

        let outcome = pipeline.execute(&request()).await.unwrap();

        assert!(!outcome.written);
        assert_eq!(outcome.rows_written, 0);
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_without_write() {
        let (pipeline, sink) = pipeline(Err(EtlError::Fetch("403 Forbidden".to_string())));

        let err = pipeline.execute(&request()).await.unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_misaligned_row_is_transform_error() {
        let mut bad = row("20240601");
        bad.metric_values.pop();
        let (pipeline, sink) = pipeline(Ok(ReportResult {
            rows: vec![bad],
            row_count: Some(1),
        }));

        let err = pipeline.execute(&request()).await.unwrap_err();

        assert!(matches!(err, EtlError::Transform(_)));
        assert!(sink.writes().is_empty());
    }

    #[tokio::test]
    async fn test_load_error_propagates() {
        let sink = Arc::new(RecordingSink::failing("connection refused"));
        let pipeline = AnalyticsPipeline::new(
            Arc::new(FixedReport(Ok(ReportResult {
                rows: vec![row("20240601")],
                row_count: Some(1),
            }))),
            sink,
        );

        let err = pipeline.execute(&request()).await.unwrap_err();

        assert!(matches!(err, EtlError::Load(_)));
    }
}
