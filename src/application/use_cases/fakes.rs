//! In-memory sources and sinks for pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::{EtlError, Result};
use crate::domain::report::{ReportRequest, ReportResult};
use crate::domain::survey::ResponsePage;
use crate::domain::table::Table;
use crate::infrastructure::api_clients::{ReportSource, ResponseSource};
use crate::infrastructure::db::TableSink;

#[derive(Default)]
pub struct RecordingSink {
    pub writes: Mutex<Vec<(String, Table)>>,
    pub fail_with: Option<String>,
}

impl RecordingSink {
    pub fn failing(message: &str) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn writes(&self) -> Vec<(String, Table)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TableSink for RecordingSink {
    async fn replace_table(&self, name: &str, table: &Table) -> Result<u64> {
        if let Some(message) = &self.fail_with {
            return Err(EtlError::Load(message.clone()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), table.clone()));
        Ok(table.row_count() as u64)
    }
}

pub struct FixedReport(pub Result<ReportResult>);

#[async_trait]
impl ReportSource for FixedReport {
    async fn run_report(&self, _request: &ReportRequest) -> Result<ReportResult> {
        self.0.clone()
    }
}

pub struct FixedResponses {
    pub result: Result<ResponsePage>,
    pub calls: Mutex<Vec<(String, u32)>>,
}

impl FixedResponses {
    pub fn new(result: Result<ResponsePage>) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ResponseSource for FixedResponses {
    async fn fetch_responses(&self, form_id: &str, page_size: u32) -> Result<ResponsePage> {
        self.calls
            .lock()
            .unwrap()
            .push((form_id.to_string(), page_size));
        self.result.clone()
    }
}
