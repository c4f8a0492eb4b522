//! In-memory tabular model shared by both pipelines.
//!
//! A `Table` is an ordered header plus rows of optional cells aligned to that
//! header. A `None` cell is written as SQL NULL.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Cell {
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Integer(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Converts a JSON number, keeping integral values as `Integer`.
    pub fn from_number(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Cell::Integer(i)
        } else if let Some(f) = n.as_f64() {
            Cell::Float(f)
        } else {
            Cell::Text(n.to_string())
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// Storage class of a column, inferred from the cells it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padding short rows with nulls. Extra cells are dropped.
    pub fn push_row(&mut self, mut row: Vec<Option<Cell>>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn column_type(&self, index: usize) -> ColumnType {
        let mut inferred: Option<ColumnType> = None;
        for cell in self.rows.iter().filter_map(|row| row.get(index)?.as_ref()) {
            let kind = match cell {
                Cell::Integer(_) => ColumnType::Integer,
                Cell::Float(_) => ColumnType::Float,
                Cell::Text(_) => return ColumnType::Text,
            };
            inferred = Some(match (inferred, kind) {
                (None, k) => k,
                (Some(ColumnType::Integer), ColumnType::Integer) => ColumnType::Integer,
                _ => ColumnType::Float,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len()).map(|i| self.column_type(i)).collect()
    }
}
