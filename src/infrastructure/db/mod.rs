pub mod table_writer;

use crate::domain::error::Result;
use crate::domain::table::Table;
use async_trait::async_trait;

pub use table_writer::SqlTableWriter;

/// Destination for a flattened table.
#[async_trait]
pub trait TableSink {
    /// Drops `name` if it exists and recreates it holding exactly `table`.
    async fn replace_table(&self, name: &str, table: &Table) -> Result<u64>;
}
