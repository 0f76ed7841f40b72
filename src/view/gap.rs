use crate::gate::AccessGate;
use crate::pipeline::labels::{barrier_count_label, barrier_family};
use crate::pipeline::{melt, PipelineError};
use crate::table::{Cell, DataTable};
use crate::view::SummaryRow;

/// Columns of the justice-score summary extract. The barrier-count column
/// names are inconsistently pluralised upstream; these are the names as
/// they actually arrive.
pub const GAP_SHARE_COLS: [&str; 2] = ["pct_in_gap", "pct_not_in_gap"];

pub const BARRIER_COUNT_COLS: [&str; 5] = [
    "pct_0_barriers",
    "pct_1_barrier",
    "pct_2_barrier",
    "pct_3_barriers",
    "pct_4_barriers",
];

pub const BARRIER_FAMILY_COLS: [&str; 12] = [
    "pct_solution_barrier_barrier_1",
    "pct_solution_barrier_barrier_2",
    "pct_solution_barrier_barrier_3",
    "pct_info_barrier_barrier_1",
    "pct_info_barrier_barrier_2",
    "pct_info_barrier_barrier_3",
    "pct_dcf_barrier_barrier_1",
    "pct_dcf_barrier_barrier_2",
    "pct_dcf_barrier_barrier_3",
    "pct_representation_barrier_barrier_1",
    "pct_representation_barrier_barrier_2",
    "pct_representation_barrier_barrier_3",
];

const GAP_TERRITORY_COL: &str = "country_name_ltn";

const GENDER_COL: &str = "gender";
const FINTIGHT_COL: &str = "fintight";

/// Demographic split of the barrier drill-down. Gender and income arrive
/// in separate per-group extracts; the combined split carries both the
/// `gender` and the 0/1 `fintight` column in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapBreakdown {
    Gender,
    Income,
    Both,
}

impl GapBreakdown {
    pub fn parse(label: &str) -> Option<GapBreakdown> {
        match label.trim().to_ascii_lowercase().as_str() {
            "gender" => Some(GapBreakdown::Gender),
            "income" => Some(GapBreakdown::Income),
            "both" => Some(GapBreakdown::Both),
            _ => None,
        }
    }

    fn lens_name(&self) -> &'static str {
        match self {
            GapBreakdown::Gender => "gender",
            GapBreakdown::Income => "income",
            GapBreakdown::Both => "gender and income",
        }
    }
}

fn economic_label(fintight: f64) -> &'static str {
    if fintight == 1.0 {
        "Low ES"
    } else {
        "High ES"
    }
}

/// Resolved group-label columns for one drill-down extract.
struct SplitCols {
    breakdown: GapBreakdown,
    gender: Option<usize>,
    fintight: Option<usize>,
}

impl SplitCols {
    fn resolve(extract: &DataTable, breakdown: GapBreakdown) -> Result<Self, PipelineError> {
        let gender = match breakdown {
            GapBreakdown::Gender | GapBreakdown::Both => {
                Some(extract.column_index(GENDER_COL)?)
            }
            GapBreakdown::Income => None,
        };
        let fintight = match breakdown {
            GapBreakdown::Income | GapBreakdown::Both => {
                Some(extract.column_index(FINTIGHT_COL)?)
            }
            GapBreakdown::Gender => None,
        };
        Ok(Self {
            breakdown,
            gender,
            fintight,
        })
    }

    /// Display label for a row's demographic group, or `None` when the
    /// group cells themselves are missing.
    fn label(&self, row: &[Cell]) -> Option<String> {
        let gender = self
            .gender
            .and_then(|c| row.get(c))
            .and_then(Cell::as_str);
        let economic = self
            .fintight
            .and_then(|c| row.get(c))
            .and_then(Cell::as_num)
            .map(economic_label);
        match self.breakdown {
            GapBreakdown::Gender => gender.map(str::to_string),
            GapBreakdown::Income => economic.map(str::to_string),
            GapBreakdown::Both => Some(format!("{} - {}", gender?, economic?)),
        }
    }
}

/// In-gap / not-in-gap shares for a set of selected countries (the
/// extract carries an "EU" row alongside the member states). One summary
/// row per (country, share) for the stacked comparison chart.
pub fn gap_shares(
    gate: &AccessGate,
    barriers: &DataTable,
    countries: &[String],
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let selected = select_countries(barriers, countries)?;
    let long = melt(&selected, &[GAP_TERRITORY_COL], &GAP_SHARE_COLS)?;

    Ok(long
        .rows
        .iter()
        .map(|row| SummaryRow {
            country: text(row, 0),
            demographic: "Total sample".to_string(),
            category: None,
            metric: text(row, 1),
            value: row.get(2).and_then(Cell::as_num),
        })
        .collect())
}

/// How many barriers respondents in one country faced: one row per
/// barrier-count bucket, labelled for display.
pub fn barrier_distribution(
    gate: &AccessGate,
    barriers: &DataTable,
    country: &str,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let row = country_row(barriers, country)?;
    BARRIER_COUNT_COLS
        .iter()
        .map(|col| {
            let idx = barriers.column_index(col)?;
            Ok(SummaryRow {
                country: country.to_string(),
                demographic: "Total sample".to_string(),
                category: None,
                metric: barrier_count_label(col).to_string(),
                value: row.get(idx).and_then(Cell::as_num),
            })
        })
        .collect()
}

/// Which kinds of barriers made up each barrier count: one row per source
/// column, tagged with its barrier family for the share breakdown.
pub fn barrier_families(
    gate: &AccessGate,
    barriers: &DataTable,
    country: &str,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let row = country_row(barriers, country)?;
    BARRIER_FAMILY_COLS
        .iter()
        .map(|col| {
            let idx = barriers.column_index(col)?;
            Ok(SummaryRow {
                country: country.to_string(),
                demographic: "Total sample".to_string(),
                category: Some(barrier_family(col).to_string()),
                metric: col.to_string(),
                value: row.get(idx).and_then(Cell::as_num),
            })
        })
        .collect()
}

/// Barrier-count distribution split by demographic group: one row per
/// (group, barrier-count bucket) for the stacked comparison in one
/// country. Rows whose group cells are missing are skipped rather than
/// lumped into a phantom group.
pub fn disaggregated_barriers(
    gate: &AccessGate,
    extract: &DataTable,
    breakdown: GapBreakdown,
    country: &str,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let cols = SplitCols::resolve(extract, breakdown)?;
    let subset = country_rows(extract, country, breakdown)?;

    let mut out = Vec::new();
    for row in subset {
        let group = match cols.label(row) {
            Some(g) => g,
            None => continue,
        };
        for col in BARRIER_COUNT_COLS {
            let idx = extract.column_index(col)?;
            out.push(SummaryRow {
                country: country.to_string(),
                demographic: group.clone(),
                category: None,
                metric: barrier_count_label(col).to_string(),
                value: row.get(idx).and_then(Cell::as_num),
            });
        }
    }
    Ok(out)
}

/// Barrier families per demographic group, one set of the twelve source
/// columns for each group's share breakdown.
pub fn disaggregated_families(
    gate: &AccessGate,
    extract: &DataTable,
    breakdown: GapBreakdown,
    country: &str,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let cols = SplitCols::resolve(extract, breakdown)?;
    let subset = country_rows(extract, country, breakdown)?;

    let mut out = Vec::new();
    for row in subset {
        let group = match cols.label(row) {
            Some(g) => g,
            None => continue,
        };
        for col in BARRIER_FAMILY_COLS {
            let idx = extract.column_index(col)?;
            out.push(SummaryRow {
                country: country.to_string(),
                demographic: group.clone(),
                category: Some(barrier_family(col).to_string()),
                metric: col.to_string(),
                value: row.get(idx).and_then(Cell::as_num),
            });
        }
    }
    Ok(out)
}

/// Every row for one country in a drill-down extract, or `MissingData`
/// when the country is absent from it.
fn country_rows<'t>(
    extract: &'t DataTable,
    country: &str,
    breakdown: GapBreakdown,
) -> Result<Vec<&'t Vec<Cell>>, PipelineError> {
    let territory = extract.column_index(GAP_TERRITORY_COL)?;
    let rows: Vec<&Vec<Cell>> = extract
        .rows
        .iter()
        .filter(|row| {
            row.get(territory)
                .and_then(Cell::as_str)
                .map(|c| c.eq_ignore_ascii_case(country))
                .unwrap_or(false)
        })
        .collect();
    if rows.is_empty() {
        return Err(PipelineError::MissingData {
            country: country.to_string(),
            lens: breakdown.lens_name().to_string(),
        });
    }
    Ok(rows)
}

fn select_countries(
    barriers: &DataTable,
    countries: &[String],
) -> Result<DataTable, PipelineError> {
    let territory = barriers.column_index(GAP_TERRITORY_COL)?;
    let selected = barriers.filter(|row| {
        row.get(territory)
            .and_then(Cell::as_str)
            .map(|c| countries.iter().any(|want| want.eq_ignore_ascii_case(c)))
            .unwrap_or(false)
    });
    if selected.is_empty() {
        return Err(PipelineError::MissingData {
            country: countries.join(", "),
            lens: "total sample".to_string(),
        });
    }
    Ok(selected)
}

/// The single row for one country, or `MissingData`. Callers never index
/// row zero of an unchecked filter result.
fn country_row<'t>(
    barriers: &'t DataTable,
    country: &str,
) -> Result<&'t Vec<Cell>, PipelineError> {
    let territory = barriers.column_index(GAP_TERRITORY_COL)?;
    barriers
        .rows
        .iter()
        .find(|row| {
            row.get(territory)
                .and_then(Cell::as_str)
                .map(|c| c.eq_ignore_ascii_case(country))
                .unwrap_or(false)
        })
        .ok_or_else(|| PipelineError::MissingData {
            country: country.to_string(),
            lens: "total sample".to_string(),
        })
}

fn text(row: &[Cell], col: usize) -> String {
    row.get(col)
        .and_then(Cell::as_str)
        .unwrap_or_default()
        .to_string()
}
