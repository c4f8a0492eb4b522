pub mod use_cases;

pub use use_cases::analytics_pipeline::AnalyticsPipeline;
pub use use_cases::survey_pipeline::SurveyPipeline;
pub use use_cases::LoadOutcome;
