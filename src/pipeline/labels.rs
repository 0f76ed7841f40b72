use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Shown when a code has no entry in its mapping table. The upstream
/// extracts occasionally grow new codes before the label tables catch up;
/// a visible catch-all beats a silently blank label.
pub const FALLBACK_LABEL: &str = "Other / unknown";

static ADVISER_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AJD_adviser_1", "Relatives and friends"),
        ("AJD_adviser_2", "Lawyer or professional adviser"),
        ("AJD_adviser_3", "Government legal aid"),
        ("AJD_adviser_4", "Court, govt, police"),
        ("AJD_adviser_5", "Health or welfare adviser"),
        ("AJD_adviser_6", "Trade union or employer"),
        ("AJD_adviser_7", "Religious or community advisor"),
        ("AJD_adviser_8", "Civil society or charity"),
        ("AJD_adviser_9", "Other organization advisor"),
    ])
});

static BARRIER_COUNT_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("pct_0_barriers", "No Barriers"),
        ("pct_1_barrier", "1 Barrier"),
        ("pct_2_barrier", "2 Barriers"),
        ("pct_3_barriers", "3 Barriers"),
        ("pct_4_barriers", "4 Barriers"),
    ])
});

/// Display label for an adviser-source code.
pub fn adviser_label(code: &str) -> &'static str {
    ADVISER_LABELS.get(code.trim()).copied().unwrap_or(FALLBACK_LABEL)
}

/// Display label for a barrier-count column.
pub fn barrier_count_label(column: &str) -> &'static str {
    BARRIER_COUNT_LABELS
        .get(column.trim())
        .copied()
        .unwrap_or(FALLBACK_LABEL)
}

/// Collapse a per-barrier-count column like `pct_info_barrier_barrier_2`
/// into its barrier family for the share-of-barriers breakdown.
pub fn barrier_family(column: &str) -> &'static str {
    let c = column.trim();
    if c.starts_with("pct_solution_barrier") {
        "Solution"
    } else if c.starts_with("pct_info_barrier") {
        "Information"
    } else if c.starts_with("pct_dcf_barrier") {
        "Delays, Fairness, Cost"
    } else if c.starts_with("pct_representation_barrier") {
        "Representation"
    } else {
        FALLBACK_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_adviser_codes_map_to_display_labels() {
        assert_eq!(adviser_label("AJD_adviser_2"), "Lawyer or professional adviser");
        assert_eq!(adviser_label("AJD_adviser_9"), "Other organization advisor");
    }

    #[test]
    fn unknown_codes_get_the_fallback_deterministically() {
        assert_eq!(adviser_label("AJD_adviser_42"), FALLBACK_LABEL);
        assert_eq!(adviser_label("AJD_adviser_42"), FALLBACK_LABEL);
        assert_eq!(barrier_count_label("pct_9_barriers"), FALLBACK_LABEL);
    }

    #[test]
    fn barrier_columns_collapse_into_four_families() {
        assert_eq!(barrier_family("pct_solution_barrier_barrier_1"), "Solution");
        assert_eq!(barrier_family("pct_info_barrier_barrier_3"), "Information");
        assert_eq!(barrier_family("pct_dcf_barrier_barrier_2"), "Delays, Fairness, Cost");
        assert_eq!(
            barrier_family("pct_representation_barrier_barrier_2"),
            "Representation"
        );
        assert_eq!(barrier_family("pct_other"), FALLBACK_LABEL);
    }
}
