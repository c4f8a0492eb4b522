use std::process::ExitCode;

use marketing_etl::infrastructure::config::AnalyticsConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    marketing_etl::init_tracing();

    let result = match AnalyticsConfig::from_env() {
        Ok(config) => marketing_etl::run_analytics(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            info!(
                table = outcome.table,
                written = outcome.written,
                rows = outcome.rows_written,
                "Analytics pipeline finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Analytics pipeline failed");
            ExitCode::from(e.exit_code())
        }
    }
}
