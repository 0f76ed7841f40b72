use std::fmt;

use tracing::debug;

use crate::pipeline::{aggregate::aggregate, Lens, PipelineError};
use crate::table::{Cell, DataTable};

/// Geographic aggregation level of a view: one member state, or the
/// EU-wide pool of every country in the extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Eu,
    Country(String),
}

pub const EU_LABEL: &str = "European Union";
pub const TERRITORY_COL: &str = "country_name_ltn";
pub const DEMOGRAPHIC_COL: &str = "demographic";

impl Scope {
    pub fn parse(label: &str) -> Scope {
        if label.trim().eq_ignore_ascii_case("eu") || label.trim() == EU_LABEL {
            Scope::Eu
        } else {
            Scope::Country(label.trim().to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::Eu => EU_LABEL,
            Scope::Country(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve a suppressed section table to the rows for one scope and lens.
///
/// Output columns are always `[country_name_ltn, demographic, category...,
/// metrics...]`. For a country scope that is a plain filter; for the EU it
/// is the unweighted mean per (demographic, category) across all countries,
/// computed over non-missing cells only. An empty selection is reported as
/// `MissingData`, never surfaced as a first-row index fault downstream.
pub fn resolve_scope(
    table: &DataTable,
    scope: &Scope,
    lens: Lens,
    category_col: Option<&str>,
    metric_cols: &[&str],
) -> Result<DataTable, PipelineError> {
    let territory = table.column_index(TERRITORY_COL)?;
    let demographic = table.column_index(DEMOGRAPHIC_COL)?;
    let category = category_col.map(|c| table.column_index(c)).transpose()?;
    let metrics: Vec<usize> = metric_cols
        .iter()
        .map(|c| table.column_index(c))
        .collect::<Result<_, _>>()?;

    // Project to the output shape and canonicalise the demographic spelling
    // so the extracts' mixed-case labels land in one group.
    let mut narrow = DataTable::new(
        table.name.clone(),
        std::iter::once(TERRITORY_COL.to_string())
            .chain(std::iter::once(DEMOGRAPHIC_COL.to_string()))
            .chain(category.map(|c| table.columns[c].clone()))
            .chain(metrics.iter().map(|&c| table.columns[c].clone()))
            .collect(),
    );
    for row in &table.rows {
        let demo = match row.get(demographic).and_then(Cell::as_str) {
            Some(d) => d,
            None => continue,
        };
        let canonical = match lens.canonical(demo) {
            Some(c) => c,
            None => continue,
        };
        let mut out = vec![
            row.get(territory).cloned().unwrap_or(Cell::Missing),
            Cell::Str(canonical.to_string()),
        ];
        if let Some(c) = category {
            out.push(row.get(c).cloned().unwrap_or(Cell::Missing));
        }
        for &c in &metrics {
            out.push(row.get(c).cloned().unwrap_or(Cell::Missing));
        }
        narrow.rows.push(out);
    }

    let resolved = match scope {
        Scope::Country(name) => {
            let filtered = narrow.filter(|row| {
                row[0]
                    .as_str()
                    .map(|c| c.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            });
            if filtered.is_empty() {
                return Err(PipelineError::MissingData {
                    country: name.clone(),
                    lens: lens.to_string(),
                });
            }
            filtered
        }
        Scope::Eu => {
            if narrow.is_empty() {
                return Err(PipelineError::MissingData {
                    country: EU_LABEL.to_string(),
                    lens: lens.to_string(),
                });
            }
            // Group on demographic (and category when present); the
            // territory column collapses to the pooled label.
            let n_keys = if category.is_some() { 2 } else { 1 };
            let group_cols: Vec<usize> = (1..=n_keys).collect();
            let metric_idx: Vec<usize> =
                (1 + n_keys..1 + n_keys + metrics.len()).collect();
            let pooled = aggregate(&narrow, &group_cols, &metric_idx);

            let mut out = DataTable::new(narrow.name.clone(), narrow.columns.clone());
            for row in pooled.rows {
                let mut full = vec![Cell::Str(EU_LABEL.to_string())];
                full.extend(row);
                out.rows.push(full);
            }
            out
        }
    };

    debug!(
        sheet = %table.name,
        scope = %scope,
        lens = %lens,
        rows = resolved.len(),
        "resolved scope"
    );
    Ok(resolved)
}
