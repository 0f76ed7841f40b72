//! Per-view summary assembly: the boundary between the pure pipeline and
//! whatever renders charts. Each builder checks the access gate, runs
//! suppression before any filtering, resolves the requested scope, and
//! hands back plain summary rows. Values stay 0–1 fractions; multiplying
//! by 100 is the renderer's job.

pub mod effects;
pub mod gap;
pub mod journey;

use serde::Serialize;

use crate::gate::AccessGate;
use crate::pipeline::{
    melt, resolve_scope, suppress, Lens, PipelineError, Scope, DEMOGRAPHIC_COL, MIN_SAMPLE,
    TERRITORY_COL,
};
use crate::table::{Cell, DataTable};

/// One output record of the pipeline: a single metric value for one
/// (scope, demographic, category) cell. `value: None` renders as
/// "data not available", never as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub country: String,
    pub demographic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub metric: String,
    pub value: Option<f64>,
}

/// Shape of one justice-journey sheet: which column carries the backing
/// sample size, whether rows have a category dimension, which columns are
/// displayed metrics, and which extra numeric columns ride along (they are
/// suppressed and pooled with the metrics but not emitted as summary rows).
#[derive(Debug)]
pub struct SectionSpec {
    pub sheet: &'static str,
    pub count_col: &'static str,
    pub category_col: Option<&'static str>,
    pub metric_cols: &'static [&'static str],
    pub carry_cols: &'static [&'static str],
}

impl SectionSpec {
    fn numeric_cols(&self) -> Vec<&'static str> {
        self.metric_cols
            .iter()
            .chain(self.carry_cols.iter())
            .copied()
            .collect()
    }
}

/// Generic section pipeline: suppress, resolve scope, unpivot to one
/// summary row per (demographic, category, metric). This one function
/// replaces the per-section per-lens filter blocks of the upstream
/// dashboard; every sheet differs only by its [`SectionSpec`].
pub fn section_summary(
    gate: &AccessGate,
    table: &DataTable,
    spec: &SectionSpec,
    scope: &Scope,
    lens: Lens,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let resolved = resolved_section(table, spec, scope, lens)?;

    let mut id_cols = vec![TERRITORY_COL, DEMOGRAPHIC_COL];
    if let Some(cat) = spec.category_col {
        id_cols.push(cat);
    }
    let long = melt(&resolved, &id_cols, spec.metric_cols)?;

    let metric = long.column_index("metric")?;
    let value = long.column_index("value")?;
    let category = spec.category_col.map(|c| long.column_index(c)).transpose()?;

    let rows = long
        .rows
        .iter()
        .map(|row| SummaryRow {
            country: cell_text(row, 0),
            demographic: cell_text(row, 1),
            category: category.map(|c| cell_text(row, c)),
            metric: cell_text(row, metric),
            value: row.get(value).and_then(Cell::as_num),
        })
        .collect();
    Ok(rows)
}

/// The suppressed, scope-resolved table for one section, with all numeric
/// columns (metrics and carried counts) intact. Used by the summary path
/// and by the derived income-prevalence ratio.
fn resolved_section(
    table: &DataTable,
    spec: &SectionSpec,
    scope: &Scope,
    lens: Lens,
) -> Result<DataTable, PipelineError> {
    let count = table.column_index(spec.count_col)?;
    let numeric = spec.numeric_cols();
    let numeric_idx: Vec<usize> = numeric
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;

    let suppressed = suppress(table, count, &numeric_idx, MIN_SAMPLE);
    resolve_scope(&suppressed, scope, lens, spec.category_col, &numeric)
}

fn cell_text(row: &[Cell], col: usize) -> String {
    row.get(col)
        .and_then(Cell::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_gate() -> AccessGate {
        let mut gate = AccessGate::closed();
        gate.unlock("pw", "pw");
        gate
    }

    fn section4() -> DataTable {
        let mut t = DataTable::new(
            "Section4",
            vec![
                "country_name_ltn".into(),
                "demographic".into(),
                "fully_resolved".into(),
                "problem_persists".into(),
                "satisfaction".into(),
                "count".into(),
            ],
        );
        let mut push = |country: &str, demo: &str, a: f64, b: f64, c: f64, n: f64| {
            t.rows.push(vec![
                Cell::Str(country.into()),
                Cell::Str(demo.into()),
                Cell::Num(a),
                Cell::Num(b),
                Cell::Num(c),
                Cell::Num(n),
            ]);
        };
        push("France", "Total Sample", 0.50, 0.20, 0.60, 200.0);
        push("Austria", "Total Sample", 0.30, 0.10, 0.40, 150.0);
        push("Malta", "Total Sample", 0.90, 0.90, 0.90, 10.0);
        t
    }

    const SPEC4: SectionSpec = SectionSpec {
        sheet: "Section4",
        count_col: "count",
        category_col: None,
        metric_cols: &["fully_resolved", "problem_persists", "satisfaction"],
        carry_cols: &[],
    };

    #[test]
    fn closed_gate_means_no_computation() {
        let gate = AccessGate::closed();
        let err =
            section_summary(&gate, &section4(), &SPEC4, &Scope::Eu, Lens::TotalSample).unwrap_err();
        assert!(matches!(err, PipelineError::GateClosed));
    }

    #[test]
    fn eu_summary_pools_only_adequate_samples() {
        let rows = section_summary(
            &open_gate(),
            &section4(),
            &SPEC4,
            &Scope::Eu,
            Lens::TotalSample,
        )
        .unwrap();
        // one pooled group, three metrics
        assert_eq!(rows.len(), 3);
        let resolved = rows.iter().find(|r| r.metric == "fully_resolved").unwrap();
        assert_eq!(resolved.country, "European Union");
        assert_eq!(resolved.demographic, "Total sample");
        // Malta suppressed at 10 respondents, so the mean is (0.5 + 0.3) / 2
        assert!((resolved.value.unwrap() - 0.40).abs() < 1e-12);
    }

    #[test]
    fn country_summary_keeps_suppressed_cells_as_missing() {
        let rows = section_summary(
            &open_gate(),
            &section4(),
            &SPEC4,
            &Scope::Country("Malta".into()),
            Lens::TotalSample,
        )
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.value.is_none()));
        assert!(rows.iter().all(|r| r.country == "Malta"));
    }
}
