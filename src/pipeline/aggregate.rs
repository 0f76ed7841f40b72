use std::collections::BTreeMap;

use crate::table::{Cell, DataTable};

/// Unweighted group-by mean over a set of numeric columns.
///
/// Rows are grouped by the string values of `group_cols`; each metric in
/// `metric_cols` is averaged independently over the non-missing values in
/// the group. A suppressed or missing cell contributes nothing to the mean
/// (it is not a zero), and a group with no usable values for a metric keeps
/// an explicit missing cell.
///
/// The output columns are `group_cols` followed by `metric_cols`, one row
/// per group in sorted key order, which keeps EU pooling deterministic.
pub fn aggregate(table: &DataTable, group_cols: &[usize], metric_cols: &[usize]) -> DataTable {
    let mut groups: BTreeMap<Vec<String>, Vec<(f64, u32)>> = BTreeMap::new();

    for row in &table.rows {
        let key: Vec<String> = group_cols
            .iter()
            .map(|&c| row.get(c).and_then(Cell::as_str).unwrap_or("").to_string())
            .collect();

        let acc = groups
            .entry(key)
            .or_insert_with(|| vec![(0.0, 0); metric_cols.len()]);

        for (slot, &c) in metric_cols.iter().enumerate() {
            if let Some(v) = row.get(c).and_then(Cell::as_num) {
                acc[slot].0 += v;
                acc[slot].1 += 1;
            }
        }
    }

    let columns: Vec<String> = group_cols
        .iter()
        .chain(metric_cols.iter())
        .map(|&c| table.columns[c].clone())
        .collect();

    let mut out = DataTable::new(table.name.clone(), columns);
    for (key, acc) in groups {
        let mut row: Vec<Cell> = key.into_iter().map(Cell::Str).collect();
        for (sum, n) in acc {
            row.push(if n == 0 {
                Cell::Missing
            } else {
                Cell::Num(sum / n as f64)
            });
        }
        out.rows.push(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(demo: &str, cat: &str, v: Cell) -> Vec<Cell> {
        vec![Cell::Str(demo.into()), Cell::Str(cat.into()), v]
    }

    fn fixture() -> DataTable {
        let mut t = DataTable::new(
            "Section1",
            vec!["demographic".into(), "category".into(), "value2plot".into()],
        );
        t.rows = vec![
            row("Total sample", "Consumer", Cell::Num(0.20)),
            row("Total sample", "Consumer", Cell::Num(0.40)),
            row("Total sample", "Consumer", Cell::Missing),
            row("Total sample", "Housing", Cell::Num(0.10)),
        ];
        t
    }

    #[test]
    fn mean_skips_missing_values() {
        let pooled = aggregate(&fixture(), &[0, 1], &[2]);
        assert_eq!(pooled.len(), 2);
        // suppressed country excluded from the mean, not counted as zero
        assert!((pooled.num(0, 2).unwrap() - 0.30).abs() < 1e-12);
        assert!((pooled.num(1, 2).unwrap() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn all_missing_group_stays_missing() {
        let mut t = fixture();
        t.rows = vec![
            row("Male", "Consumer", Cell::Missing),
            row("Male", "Consumer", Cell::Missing),
        ];
        let pooled = aggregate(&t, &[0, 1], &[2]);
        assert_eq!(pooled.len(), 1);
        assert!(pooled.rows[0][2].is_missing());
    }

    #[test]
    fn groups_come_out_in_sorted_key_order() {
        let mut t = fixture();
        t.rows = vec![
            row("Male", "Housing", Cell::Num(0.5)),
            row("Female", "Consumer", Cell::Num(0.1)),
            row("Male", "Consumer", Cell::Num(0.3)),
        ];
        let pooled = aggregate(&t, &[0, 1], &[2]);
        let keys: Vec<(&str, &str)> = pooled
            .rows
            .iter()
            .map(|r| (r[0].as_str().unwrap(), r[1].as_str().unwrap()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Female", "Consumer"),
                ("Male", "Consumer"),
                ("Male", "Housing"),
            ]
        );
    }
}
