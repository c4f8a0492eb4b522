use chrono::{Duration, NaiveDate};

pub const ANALYTICS_TABLE: &str = "google_analytics_data";

pub const REPORT_DIMENSIONS: [&str; 6] = [
    "date",
    "city",
    "country",
    "deviceCategory",
    "sessionSource",
    "sessionMedium",
];

pub const REPORT_METRICS: [&str; 9] = [
    "totalUsers",
    "newUsers",
    "activeUsers",
    "sessions",
    "engagedSessions",
    "averageSessionDuration",
    "screenPageViews",
    "conversions",
    "totalRevenue",
];

/// Days covered by the rolling report window, ending today.
pub const LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        let start = today - Duration::days(days);
        Self {
            start_date: start.format("%Y-%m-%d").to_string(),
            end_date: "today".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub property_id: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub date_range: DateRange,
}

impl ReportRequest {
    /// The fixed traffic report: 6 dimensions, 9 metrics, last 30 days.
    pub fn traffic(property_id: &str, today: NaiveDate) -> Self {
        Self {
            property_id: property_id.to_string(),
            dimensions: REPORT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            metrics: REPORT_METRICS.iter().map(|m| m.to_string()).collect(),
            date_range: DateRange::trailing_days(today, LOOKBACK_DAYS),
        }
    }

    pub fn property(&self) -> String {
        format!("properties/{}", self.property_id)
    }

    /// Dimension names followed by metric names.
    pub fn header(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .chain(self.metrics.iter())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportResult {
    pub rows: Vec<ReportRow>,
    /// Total rows the API says match the query, which may exceed `rows`.
    pub row_count: Option<u64>,
}
