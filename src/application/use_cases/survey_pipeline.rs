use std::sync::Arc;

use tracing::{debug, info};

use crate::application::use_cases::response_flattener::{build_table, flatten_responses};
use crate::domain::error::Result;
use crate::domain::survey::SURVEY_TABLE;
use crate::infrastructure::api_clients::ResponseSource;
use crate::infrastructure::db::TableSink;

use super::LoadOutcome;

/// Fetches one page of form responses and replaces `typeform_responses`.
pub struct SurveyPipeline {
    source: Arc<dyn ResponseSource + Send + Sync>,
    sink: Arc<dyn TableSink + Send + Sync>,
}

impl SurveyPipeline {
    pub fn new(
        source: Arc<dyn ResponseSource + Send + Sync>,
        sink: Arc<dyn TableSink + Send + Sync>,
    ) -> Self {
        Self { source, sink }
    }

    pub async fn execute(&self, form_id: &str, page_size: u32) -> Result<LoadOutcome> {
        let page = self.source.fetch_responses(form_id, page_size).await?;

        let rows = flatten_responses(&page.items)?;
        let table = build_table(&rows);
        debug!(
            rows = table.row_count(),
            columns = table.columns.len(),
            "Flattened form responses"
        );

        let rows_written = self.sink.replace_table(SURVEY_TABLE, &table).await?;

        info!(
            table = SURVEY_TABLE,
            rows = rows_written,
            "Loaded {} responses into {}",
            rows_written,
            SURVEY_TABLE
        );
        Ok(LoadOutcome::written(SURVEY_TABLE, rows_written))
    }
}
