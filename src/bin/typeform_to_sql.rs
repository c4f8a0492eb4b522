use std::process::ExitCode;

use marketing_etl::infrastructure::config::SurveyConfig;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    marketing_etl::init_tracing();

    let config = match SurveyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Survey pipeline failed");
            return ExitCode::from(e.exit_code());
        }
    };

    match marketing_etl::run_survey(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Survey pipeline failed");
            ExitCode::from(e.exit_code())
        }
    }
}
