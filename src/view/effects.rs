use serde::Serialize;
use tracing::warn;

use crate::gate::AccessGate;
use crate::pipeline::{PipelineError, Scope};
use crate::table::{Cell, DataTable};

/// 95% confidence multiplier applied at the display boundary. The
/// coefficients and standard errors themselves come pre-computed from the
/// external regression pipeline; nothing is estimated here.
const Z95: f64 = 1.96;

/// (coefficient column, display label). The standard error lives in the
/// `<column>_se` sibling.
const CHARACTERISTICS: [(&str, &str); 5] = [
    ("female", "Female"),
    ("urban", "Urban"),
    ("no_hs", "No High School Diploma"),
    ("less_than_30", "Younger than 30"),
    ("low_es", "Low Economic Status"),
];

/// One point of the sociodemographic forest plot: the average marginal
/// effect of a characteristic on justice-gap membership, with its 95%
/// interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectRow {
    pub country: String,
    pub characteristic: String,
    pub ame: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Effects for one scope. The regression extract keys its pooled row as
/// "EU" rather than the dashboard's spelled-out label.
pub fn socio_effects(
    gate: &AccessGate,
    regression: &DataTable,
    scope: &Scope,
) -> Result<Vec<EffectRow>, PipelineError> {
    gate.require()?;

    let wanted = match scope {
        Scope::Eu => "EU",
        Scope::Country(name) => name.as_str(),
    };

    let territory = regression.column_index("country_name_ltn")?;
    let row = regression
        .rows
        .iter()
        .find(|row| {
            row.get(territory)
                .and_then(Cell::as_str)
                .map(|c| c.eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
        })
        .ok_or_else(|| PipelineError::MissingData {
            country: wanted.to_string(),
            lens: "total sample".to_string(),
        })?;

    let mut out = Vec::new();
    for (col, label) in CHARACTERISTICS {
        let ame_idx = regression.column_index(col)?;
        let se_idx = regression.column_index(&format!("{col}_se"))?;
        match (
            row.get(ame_idx).and_then(Cell::as_num),
            row.get(se_idx).and_then(Cell::as_num),
        ) {
            (Some(ame), Some(se)) => out.push(EffectRow {
                country: wanted.to_string(),
                characteristic: label.to_string(),
                ame,
                lower: ame - Z95 * se,
                upper: ame + Z95 * se,
            }),
            _ => warn!(country = wanted, characteristic = col, "effect estimate missing"),
        }
    }

    if out.is_empty() {
        return Err(PipelineError::MissingData {
            country: wanted.to_string(),
            lens: "total sample".to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_gate() -> AccessGate {
        let mut gate = AccessGate::closed();
        gate.unlock("pw", "pw");
        gate
    }

    fn regression() -> DataTable {
        let mut columns = vec!["country_name_ltn".to_string()];
        for (col, _) in CHARACTERISTICS {
            columns.push(col.to_string());
            columns.push(format!("{col}_se"));
        }
        let mut t = DataTable::new("logit_reg_gap.csv", columns);
        let mut row = vec![Cell::Str("EU".into())];
        for i in 0..CHARACTERISTICS.len() {
            row.push(Cell::Num(0.1 * (i + 1) as f64));
            row.push(Cell::Num(0.05));
        }
        t.rows.push(row);
        t
    }

    #[test]
    fn bounds_are_ame_plus_minus_z_times_se() {
        let rows = socio_effects(&open_gate(), &regression(), &Scope::Eu).unwrap();
        assert_eq!(rows.len(), 5);
        let female = &rows[0];
        assert_eq!(female.characteristic, "Female");
        assert!((female.ame - 0.1).abs() < 1e-12);
        assert!((female.lower - (0.1 - 1.96 * 0.05)).abs() < 1e-12);
        assert!((female.upper - (0.1 + 1.96 * 0.05)).abs() < 1e-12);
    }

    #[test]
    fn country_without_estimates_is_missing_data() {
        let err = socio_effects(
            &open_gate(),
            &regression(),
            &Scope::Country("France".into()),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { .. }));
    }
}
