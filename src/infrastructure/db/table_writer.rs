//! Full-table replace into PostgreSQL or SQLite.
//!
//! The writer only parses the URL up front. The connection is opened inside
//! `replace_table`, used for one transaction (drop, create, insert) and
//! closed again, so a run that fails before loading never touches the
//! database.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{debug, info};

use super::TableSink;
use crate::domain::error::{EtlError, Result};
use crate::domain::table::{Cell, ColumnType, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    fn type_name(self, column_type: ColumnType) -> &'static str {
        match (self, column_type) {
            (Dialect::Postgres, ColumnType::Integer) => "BIGINT",
            (Dialect::Postgres, ColumnType::Float) => "DOUBLE PRECISION",
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnType::Float) => "REAL",
            (_, ColumnType::Text) => "TEXT",
        }
    }

    fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", position),
            Dialect::Sqlite => "?".to_string(),
        }
    }
}

/// Splits off the scheme and drops SQLAlchemy driver suffixes
/// (`postgresql+psycopg2://` becomes `postgresql://`).
pub fn parse_database_url(raw: &str) -> Result<(Dialect, String)> {
    let raw = raw.trim();
    let (scheme, rest) = raw.split_once(':').ok_or_else(|| {
        EtlError::Config("DATABASE_URL has no scheme (expected postgresql:// or sqlite:)".to_string())
    })?;
    let base_scheme = scheme.split('+').next().unwrap_or(scheme).to_ascii_lowercase();

    let dialect = match base_scheme.as_str() {
        "postgres" | "postgresql" => Dialect::Postgres,
        "sqlite" => Dialect::Sqlite,
        other => {
            return Err(EtlError::Config(format!(
                "Unsupported database scheme '{}' in DATABASE_URL",
                other
            )))
        }
    };

    Ok((dialect, format!("{}:{}", base_scheme, rest)))
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_table_sql(dialect: Dialect, name: &str, table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .zip(table.column_types())
        .map(|(column, column_type)| {
            format!("{} {}", quote_ident(column), dialect.type_name(column_type))
        })
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(name), columns.join(", "))
}

pub fn insert_sql(dialect: Dialect, name: &str, columns: &[String]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len())
        .map(|i| dialect.placeholder(i))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// First pair of column names that only differ by ASCII case. SQLite treats
/// such identifiers as the same column.
fn case_folded_duplicate(columns: &[String]) -> Option<(&str, &str)> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for column in columns {
        if let Some(previous) = seen.insert(column.to_ascii_lowercase(), column.as_str()) {
            return Some((previous, column.as_str()));
        }
    }
    None
}

fn drop_table_sql(name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(name))
}

/// A cell converted to the storage class of its column.
#[derive(Debug, Clone, PartialEq)]
enum BoundValue {
    Integer(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
}

fn bind_value(cell: Option<&Cell>, column_type: ColumnType) -> BoundValue {
    match column_type {
        ColumnType::Integer => BoundValue::Integer(cell.and_then(Cell::as_i64)),
        ColumnType::Float => BoundValue::Float(cell.and_then(Cell::as_f64)),
        ColumnType::Text => BoundValue::Text(cell.map(Cell::as_text)),
    }
}

fn bound_rows(table: &Table) -> Vec<Vec<BoundValue>> {
    let types = table.column_types();
    table
        .rows
        .iter()
        .map(|row| {
            types
                .iter()
                .enumerate()
                .map(|(i, column_type)| bind_value(row.get(i).and_then(Option::as_ref), *column_type))
                .collect()
        })
        .collect()
}

/// Drop, create and fill `$name` in one transaction on `$pool`.
/// A macro because the query types differ per driver.
macro_rules! write_table {
    ($pool:expr, $dialect:expr, $name:expr, $table:expr) => {{
        let insert = insert_sql($dialect, $name, &$table.columns);
        let mut tx = $pool
            .begin()
            .await
            .map_err(|e| EtlError::Load(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(&drop_table_sql($name))
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Load(format!("Failed to drop table '{}': {}", $name, e)))?;
        sqlx::query(&create_table_sql($dialect, $name, $table))
            .execute(&mut *tx)
            .await
            .map_err(|e| EtlError::Load(format!("Failed to create table '{}': {}", $name, e)))?;

        let mut affected: u64 = 0;
        for row in bound_rows($table) {
            let mut query = sqlx::query(&insert);
            for value in row {
                query = match value {
                    BoundValue::Integer(v) => query.bind(v),
                    BoundValue::Float(v) => query.bind(v),
                    BoundValue::Text(v) => query.bind(v),
                };
            }
            let res = query
                .execute(&mut *tx)
                .await
                .map_err(|e| EtlError::Load(format!("Failed to insert into '{}': {}", $name, e)))?;
            affected += res.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| EtlError::Load(format!("Failed to commit transaction: {}", e)))?;
        affected
    }};
}

pub struct SqlTableWriter {
    dialect: Dialect,
    url: String,
}

impl SqlTableWriter {
    pub fn new(database_url: &str) -> Result<Self> {
        let (dialect, url) = parse_database_url(database_url)?;
        Ok(Self { dialect, url })
    }

    async fn replace_postgres(&self, name: &str, table: &Table) -> Result<u64> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|e| EtlError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| EtlError::Load(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let affected = write_table!(pool, self.dialect, name, table);
        pool.close().await;
        Ok(affected)
    }

    async fn replace_sqlite(&self, name: &str, table: &Table) -> Result<u64> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| EtlError::Config(format!("Invalid SQLite URL: {}", e)))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| EtlError::Load(format!("Failed to open SQLite database: {}", e)))?;

        let affected = write_table!(pool, self.dialect, name, table);
        pool.close().await;
        Ok(affected)
    }
}

#[async_trait]
impl TableSink for SqlTableWriter {
    async fn replace_table(&self, name: &str, table: &Table) -> Result<u64> {
        if table.columns.is_empty() {
            return Err(EtlError::Load(format!(
                "Refusing to create table '{}' without columns",
                name
            )));
        }

        if self.dialect == Dialect::Sqlite {
            if let Some((first, second)) = case_folded_duplicate(&table.columns) {
                return Err(EtlError::Load(format!(
                    "Columns '{}' and '{}' of table '{}' differ only by case, which SQLite cannot store",
                    first, second, name
                )));
            }
        }

        debug!(
            table = %name,
            columns = table.columns.len(),
            rows = table.row_count(),
            dialect = ?self.dialect,
            "Replacing table"
        );

        let affected = match self.dialect {
            Dialect::Postgres => self.replace_postgres(name, table).await?,
            Dialect::Sqlite => self.replace_sqlite(name, table).await?,
        };

        info!(table = %name, rows = affected, "Table replaced");
        Ok(affected)
    }
}
