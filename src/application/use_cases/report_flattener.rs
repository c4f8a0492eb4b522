use crate::domain::error::{EtlError, Result};
use crate::domain::report::{ReportRequest, ReportRow};
use crate::domain::table::{Cell, Table};

/// One row per report row: dimension values then metric values, under the
/// request's header. Values stay as the strings the API returned.
pub fn flatten_report(request: &ReportRequest, rows: &[ReportRow]) -> Result<Table> {
    let mut table = Table::new(request.header());

    for (index, row) in rows.iter().enumerate() {
        if row.dimension_values.len() != request.dimensions.len()
            || row.metric_values.len() != request.metrics.len()
        {
            return Err(EtlError::Transform(format!(
                "report row {} has {} dimension and {} metric values, expected {} and {}",
                index,
                row.dimension_values.len(),
                row.metric_values.len(),
                request.dimensions.len(),
                request.metrics.len()
            )));
        }

        let cells = row
            .dimension_values
            .iter()
            .chain(row.metric_values.iter())
            .map(|value| Some(Cell::from(value.as_str())))
            .collect();
        table.push_row(cells);
    }

    Ok(table)
}
