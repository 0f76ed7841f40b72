use tracing::warn;

use crate::gate::AccessGate;
use crate::pipeline::labels::adviser_label;
use crate::pipeline::{suppress, Lens, PipelineError, Scope, MIN_SAMPLE};
use crate::table::{Cell, DataTable};
use crate::view::{section_summary, SectionSpec, SummaryRow};

/// Sheet shapes of the six justice-journey sections, as wrangled upstream.
/// Section 1 carries its incident counts through suppression and pooling
/// because the income view derives a prevalence ratio from them.
pub const SECTION1: SectionSpec = SectionSpec {
    sheet: "Section1",
    count_col: "total_count",
    category_col: Some("category"),
    metric_cols: &["value2plot"],
    carry_cols: &["total_count", "total_incidents"],
};

pub const SECTION2: SectionSpec = SectionSpec {
    sheet: "Section2",
    count_col: "count",
    category_col: None,
    metric_cols: &["advice", "get_information", "get_expert", "confidence"],
    carry_cols: &[],
};

pub const SECTION3: SectionSpec = SectionSpec {
    sheet: "Section3",
    count_col: "total_sources",
    category_col: Some("adviser"),
    metric_cols: &["value2plot"],
    carry_cols: &[],
};

pub const SECTION4: SectionSpec = SectionSpec {
    sheet: "Section4",
    count_col: "count",
    category_col: None,
    metric_cols: &["fully_resolved", "problem_persists", "satisfaction"],
    carry_cols: &[],
};

pub const SECTION5: SectionSpec = SectionSpec {
    sheet: "Section5",
    count_col: "count",
    category_col: None,
    metric_cols: &["fair", "time", "financial_diff", "slow", "expensive"],
    carry_cols: &[],
};

pub const SECTION6: SectionSpec = SectionSpec {
    sheet: "Section6",
    count_col: "count",
    category_col: None,
    metric_cols: &["any_hardship", "health", "interpersonal", "economic", "drugs"],
    carry_cols: &[],
};

pub const SECTIONS: [&SectionSpec; 6] = [
    &SECTION1, &SECTION2, &SECTION3, &SECTION4, &SECTION5, &SECTION6,
];

/// Sources-of-help summary with adviser codes translated to display
/// labels. Codes the mapping table does not know come back as the explicit
/// fallback label rather than a blank.
pub fn advisers(
    gate: &AccessGate,
    section3: &DataTable,
    scope: &Scope,
    lens: Lens,
) -> Result<Vec<SummaryRow>, PipelineError> {
    let mut rows = section_summary(gate, section3, &SECTION3, scope, lens)?;
    for row in &mut rows {
        row.category = row.category.as_deref().map(|c| adviser_label(c).to_string());
    }
    Ok(rows)
}

/// Headline prevalence from the pre-computed datapoints extract: the share
/// who experienced a non-trivial legal problem in the last two years, one
/// row per lens member. The datapoints file keys EU rows by
/// (country = "European Union", level = "eu") and country rows by
/// (country name, level = "national").
pub fn prevalence_headline(
    gate: &AccessGate,
    gpp: &DataTable,
    scope: &Scope,
    lens: Lens,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let country_col = gpp.column_index("country")?;
    let level_col = gpp.column_index("level")?;
    let id_col = gpp.column_index("id")?;
    let demo_col = gpp.column_index("demographic")?;
    let value_col = gpp.column_index("value")?;

    let level = match scope {
        Scope::Eu => "eu",
        Scope::Country(_) => "national",
    };

    let mut out = Vec::new();
    for member in lens.members() {
        let value = gpp.rows.iter().find_map(|row| {
            let matches = row
                .get(country_col)
                .and_then(Cell::as_str)
                .map(|c| c.eq_ignore_ascii_case(scope.label()))
                .unwrap_or(false)
                && row.get(level_col).and_then(Cell::as_str) == Some(level)
                && row.get(id_col).and_then(Cell::as_str) == Some("prevalence2")
                && row
                    .get(demo_col)
                    .and_then(Cell::as_str)
                    .map(|d| d.eq_ignore_ascii_case(member))
                    .unwrap_or(false);
            if matches {
                Some(row.get(value_col).and_then(Cell::as_num))
            } else {
                None
            }
        });
        match value {
            Some(v) => out.push(SummaryRow {
                country: scope.label().to_string(),
                demographic: member.to_string(),
                category: None,
                metric: "prevalence2".to_string(),
                value: v,
            }),
            None => warn!(scope = %scope, member, "no prevalence datapoint"),
        }
    }

    if out.is_empty() {
        return Err(PipelineError::MissingData {
            country: scope.label().to_string(),
            lens: lens.to_string(),
        });
    }
    Ok(out)
}

/// Income-lens prevalence, derived the way the upstream dashboard does it:
/// for each economic group, the summed problem counts over the mean number
/// of reported incidents, from the suppressed Section 1 rows of the scope.
pub fn income_prevalence(
    gate: &AccessGate,
    section1: &DataTable,
    scope: &Scope,
) -> Result<Vec<SummaryRow>, PipelineError> {
    gate.require()?;

    let territory = section1.column_index("country_name_ltn")?;
    let demographic = section1.column_index("demographic")?;
    let count_col = section1.column_index("total_count")?;
    let incidents_col = section1.column_index("total_incidents")?;
    let value_col = section1.column_index("value2plot")?;

    let suppressed = suppress(
        section1,
        count_col,
        &[value_col, count_col, incidents_col],
        MIN_SAMPLE,
    );

    let mut out = Vec::new();
    for member in Lens::Income.members() {
        let rows: Vec<&Vec<Cell>> = suppressed
            .rows
            .iter()
            .filter(|row| {
                let demo_ok = row
                    .get(demographic)
                    .and_then(Cell::as_str)
                    .map(|d| d.eq_ignore_ascii_case(member))
                    .unwrap_or(false);
                let scope_ok = match scope {
                    Scope::Eu => true,
                    Scope::Country(name) => row
                        .get(territory)
                        .and_then(Cell::as_str)
                        .map(|c| c.eq_ignore_ascii_case(name))
                        .unwrap_or(false),
                };
                demo_ok && scope_ok
            })
            .collect();

        let count_sum: f64 = rows
            .iter()
            .filter_map(|r| r.get(count_col).and_then(Cell::as_num))
            .sum();
        let incidents: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.get(incidents_col).and_then(Cell::as_num))
            .collect();

        let value = if incidents.is_empty() {
            None
        } else {
            let mean = incidents.iter().sum::<f64>() / incidents.len() as f64;
            (mean != 0.0).then(|| count_sum / mean)
        };

        out.push(SummaryRow {
            country: scope.label().to_string(),
            demographic: member.to_string(),
            category: None,
            metric: "prevalence".to_string(),
            value,
        });
    }

    if out.iter().all(|r| r.value.is_none()) {
        return Err(PipelineError::MissingData {
            country: scope.label().to_string(),
            lens: Lens::Income.to_string(),
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

    fn section3() -> DataTable {
        let mut t = DataTable::new(
            "Section3",
            vec![
                "country_name_ltn".into(),
                "demographic".into(),
                "adviser".into(),
                "value2plot".into(),
                "total_sources".into(),
            ],
        );
        let mut push = |country: &str, code: &str, v: f64| {
            t.rows.push(vec![
                Cell::Str(country.into()),
                Cell::Str("Total sample".into()),
                Cell::Str(code.into()),
                Cell::Num(v),
                Cell::Num(80.0),
            ]);
        };
        push("France", "AJD_adviser_1", 0.35);
        push("France", "AJD_adviser_2", 0.25);
        push("France", "AJD_adviser_99", 0.05);
        t
    }

    #[test]
    fn adviser_codes_become_display_labels() {
        let rows = advisers(
            &open_gate(),
            &section3(),
            &Scope::Country("France".into()),
            Lens::TotalSample,
        )
        .unwrap();
        let labels: Vec<&str> = rows.iter().map(|r| r.category.as_deref().unwrap()).collect();
        assert!(labels.contains(&"Relatives and friends"));
        assert!(labels.contains(&"Lawyer or professional adviser"));
        // unmapped code falls back explicitly instead of going blank
        assert!(labels.contains(&"Other / unknown"));
    }

    fn gpp() -> DataTable {
        let mut t = DataTable::new(
            "data4web_gpp.csv",
            vec![
                "country".into(),
                "level".into(),
                "id".into(),
                "demographic".into(),
                "value".into(),
            ],
        );
        let mut push = |country: &str, level: &str, id: &str, demo: &str, v: f64| {
            t.rows.push(vec![
                Cell::Str(country.into()),
                Cell::Str(level.into()),
                Cell::Str(id.into()),
                Cell::Str(demo.into()),
                Cell::Num(v),
            ]);
        };
        push("France", "national", "prevalence2", "Total Sample", 0.47);
        push("France", "national", "prevalence2", "Male", 0.44);
        push("France", "national", "prevalence2", "Female", 0.50);
        push("European Union", "eu", "prevalence2", "Total Sample", 0.43);
        t
    }

    #[test]
    fn headline_looks_up_country_and_level() {
        let rows = prevalence_headline(
            &open_gate(),
            &gpp(),
            &Scope::Country("France".into()),
            Lens::Gender,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].demographic, "Male");
        assert_eq!(rows[0].value, Some(0.44));
        assert_eq!(rows[1].value, Some(0.50));
    }

    #[test]
    fn headline_country_match_ignores_case_like_every_other_view() {
        let rows = prevalence_headline(
            &open_gate(),
            &gpp(),
            &Scope::Country("france".into()),
            Lens::TotalSample,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, Some(0.47));
    }

    #[test]
    fn headline_for_unknown_country_is_missing_data() {
        let err = prevalence_headline(
            &open_gate(),
            &gpp(),
            &Scope::Country("Atlantis".into()),
            Lens::TotalSample,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { .. }));
    }

    fn section1_income() -> DataTable {
        let mut t = DataTable::new(
            "Section1",
            vec![
                "country_name_ltn".into(),
                "demographic".into(),
                "category".into(),
                "value2plot".into(),
                "total_count".into(),
                "total_incidents".into(),
            ],
        );
        let mut push = |demo: &str, cat: &str, count: f64, incidents: f64| {
            t.rows.push(vec![
                Cell::Str("France".into()),
                Cell::Str(demo.into()),
                Cell::Str(cat.into()),
                Cell::Num(0.2),
                Cell::Num(count),
                Cell::Num(incidents),
            ]);
        };
        push("Financially Tight", "Consumer", 60.0, 200.0);
        push("Financially Tight", "Housing", 40.0, 200.0);
        push("Financially Stable", "Consumer", 90.0, 300.0);
        push("Financially Stable", "Housing", 60.0, 300.0);
        t
    }

    #[test]
    fn income_prevalence_is_count_sum_over_mean_incidents() {
        let rows = income_prevalence(
            &open_gate(),
            &section1_income(),
            &Scope::Country("France".into()),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        // tight: (60 + 40) / 200 = 0.5
        assert_eq!(rows[0].demographic, "Financially Tight");
        assert_eq!(rows[0].value, Some(0.5));
        // stable: (90 + 60) / 300 = 0.5
        assert_eq!(rows[1].value, Some(0.5));
    }
}
