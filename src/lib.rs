//! Extract-and-load jobs for marketing data.
//!
//! Two pipelines share one layout: a source behind a trait, a flattener
//! producing a [`domain::table::Table`], and a [`infrastructure::db::TableSink`]
//! that replaces the destination table in a single transaction.
//!
//! - `google_analytics`: GA4 traffic report into `google_analytics_data`.
//! - `typeform_to_sql`: form responses into `typeform_responses`.

pub mod application;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::{AnalyticsPipeline, LoadOutcome, SurveyPipeline};
use crate::domain::error::Result;
use crate::domain::report::ReportRequest;
use crate::infrastructure::api_clients::google_auth::ServiceAccountKey;
use crate::infrastructure::api_clients::{AnalyticsClient, TypeformClient};
use crate::infrastructure::config::{AnalyticsConfig, SurveyConfig};
use crate::infrastructure::db::SqlTableWriter;

/// Installs the fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub async fn run_analytics(config: &AnalyticsConfig) -> Result<LoadOutcome> {
    info!(config = ?config, "Starting analytics pipeline");

    let writer = SqlTableWriter::new(&config.database_url)?;
    let credentials = ServiceAccountKey::from_file(&config.credentials_path)?;
    let client = AnalyticsClient::new(credentials, &config.api_base_url);

    let request = ReportRequest::traffic(
        &config.property_id,
        chrono::Local::now().date_naive(),
    );
    AnalyticsPipeline::new(Arc::new(client), Arc::new(writer))
        .execute(&request)
        .await
}

pub async fn run_survey(config: &SurveyConfig) -> Result<LoadOutcome> {
    info!(config = ?config, "Starting survey pipeline");

    let writer = SqlTableWriter::new(&config.database_url)?;
    let client = TypeformClient::new(&config.api_token, &config.api_base_url);

    SurveyPipeline::new(Arc::new(client), Arc::new(writer))
        .execute(&config.form_id, config.page_size)
        .await
}
