use std::collections::HashMap;

use crate::pipeline::PipelineError;
use crate::table::{Cell, DataTable};

pub const METRIC_COL: &str = "metric";
pub const VALUE_COL: &str = "value";

/// Unpivot a wide table into long form: one output row per
/// (input row, metric), with `metric`/`value` columns appended to the ids.
/// The metric set in the long table is exactly `value_cols`, in order;
/// nothing is dropped or invented, missing cells included.
pub fn melt(
    table: &DataTable,
    id_cols: &[&str],
    value_cols: &[&str],
) -> Result<DataTable, PipelineError> {
    let ids: Vec<usize> = id_cols
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;
    let values: Vec<usize> = value_cols
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;

    let mut columns: Vec<String> = id_cols.iter().map(|c| c.to_string()).collect();
    columns.push(METRIC_COL.to_string());
    columns.push(VALUE_COL.to_string());

    let mut out = DataTable::new(table.name.clone(), columns);
    for row in &table.rows {
        for (&vc, name) in values.iter().zip(value_cols) {
            let mut long: Vec<Cell> = ids
                .iter()
                .map(|&c| row.get(c).cloned().unwrap_or(Cell::Missing))
                .collect();
            long.push(Cell::Str(name.to_string()));
            long.push(row.get(vc).cloned().unwrap_or(Cell::Missing));
            out.rows.push(long);
        }
    }
    Ok(out)
}

/// Inverse of [`melt`] for the same id and metric lists: collapses the
/// long rows back into one wide row per id key, metrics as columns.
pub fn pivot(
    long: &DataTable,
    id_cols: &[&str],
    value_cols: &[&str],
) -> Result<DataTable, PipelineError> {
    let ids: Vec<usize> = id_cols
        .iter()
        .map(|c| long.column_index(c))
        .collect::<Result<_, _>>()?;
    let metric = long.column_index(METRIC_COL)?;
    let value = long.column_index(VALUE_COL)?;

    let slot_of: HashMap<&str, usize> = value_cols
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, i))
        .collect();

    let mut columns: Vec<String> = id_cols.iter().map(|c| c.to_string()).collect();
    columns.extend(value_cols.iter().map(|c| c.to_string()));
    let mut out = DataTable::new(long.name.clone(), columns);

    // first-appearance order of keys preserves the original row order
    let mut row_of: HashMap<Vec<String>, usize> = HashMap::new();
    for row in &long.rows {
        let key: Vec<String> = ids
            .iter()
            .map(|&c| row.get(c).and_then(Cell::as_str).unwrap_or("").to_string())
            .collect();
        let idx = *row_of.entry(key.clone()).or_insert_with(|| {
            let mut wide: Vec<Cell> = key.iter().map(|k| Cell::Str(k.clone())).collect();
            wide.extend(std::iter::repeat(Cell::Missing).take(value_cols.len()));
            out.rows.push(wide);
            out.rows.len() - 1
        });

        let name = row.get(metric).and_then(Cell::as_str).unwrap_or("");
        if let Some(&slot) = slot_of.get(name) {
            out.rows[idx][id_cols.len() + slot] =
                row.get(value).cloned().unwrap_or(Cell::Missing);
        }
    }
    Ok(out)
}
