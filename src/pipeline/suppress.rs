use tracing::debug;

use crate::table::{Cell, DataTable};

/// Minimum backing sample size below which a statistic is not shown.
pub const MIN_SAMPLE: f64 = 30.0;

/// Null out the metric payload of every row whose sample count falls under
/// `threshold`. The row itself stays, keys intact, so joins and row counts
/// are unaffected; only the numbers disappear.
///
/// This runs once, straight after load, before any scope or demographic
/// filtering. Pooling first and suppressing after would hide adequate
/// EU-level samples behind individually small country cells.
pub fn suppress(
    table: &DataTable,
    count_col: usize,
    metric_cols: &[usize],
    threshold: f64,
) -> DataTable {
    let mut out = table.clone();
    let mut hit = 0usize;

    for row in &mut out.rows {
        // A missing count is itself unreliable; treat it as below threshold.
        let below = match row.get(count_col).and_then(Cell::as_num) {
            Some(n) => n < threshold,
            None => true,
        };
        if !below {
            continue;
        }
        hit += 1;
        for &col in metric_cols {
            if let Some(cell) = row.get_mut(col) {
                *cell = Cell::Missing;
            }
        }
    }

    if hit > 0 {
        debug!(sheet = %table.name, rows = hit, "suppressed small-sample rows");
    }
    out
}
