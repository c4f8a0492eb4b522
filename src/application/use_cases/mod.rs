pub mod analytics_pipeline;
pub mod report_flattener;
pub mod response_flattener;
pub mod survey_pipeline;

#[cfg(test)]
pub(crate) mod fakes;

/// What a pipeline run did to its destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub table: &'static str,
    pub written: bool,
    pub rows_written: u64,
}

impl LoadOutcome {
    pub fn written(table: &'static str, rows_written: u64) -> Self {
        Self {
            table,
            written: true,
            rows_written,
        }
    }

    /// Nothing to load; the existing table was left as it was.
    pub fn skipped(table: &'static str) -> Self {
        Self {
            table,
            written: false,
            rows_written: 0,
        }
    }
}
