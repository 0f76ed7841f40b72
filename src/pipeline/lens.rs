use std::fmt;

/// The demographic grouping applied to a view. Exactly one lens is active
/// per view; every filter and pooling decision branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lens {
    TotalSample,
    Gender,
    Income,
}

impl Lens {
    /// The demographic labels this lens selects. The wrangled extracts are
    /// inconsistent about capitalisation ("Total sample" vs "Total Sample"),
    /// so matching is case-insensitive.
    pub fn members(&self) -> &'static [&'static str] {
        match self {
            Lens::TotalSample => &["Total sample"],
            Lens::Gender => &["Male", "Female"],
            Lens::Income => &["Financially Tight", "Financially Stable"],
        }
    }

    pub fn matches(&self, demographic: &str) -> bool {
        self.members()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(demographic.trim()))
    }

    /// Canonical spelling for a matched label, so downstream grouping does
    /// not split "Total sample" and "Total Sample" into two groups.
    pub fn canonical(&self, demographic: &str) -> Option<&'static str> {
        self.members()
            .iter()
            .find(|m| m.eq_ignore_ascii_case(demographic.trim()))
            .copied()
    }

    pub fn parse(label: &str) -> Option<Lens> {
        match label.trim().to_ascii_lowercase().as_str() {
            "total" | "total sample" => Some(Lens::TotalSample),
            "gender" => Some(Lens::Gender),
            "income" => Some(Lens::Income),
            _ => None,
        }
    }
}

impl fmt::Display for Lens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lens::TotalSample => "total sample",
            Lens::Gender => "gender",
            Lens::Income => "income",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive() {
        assert!(Lens::TotalSample.matches("Total Sample"));
        assert!(Lens::TotalSample.matches("Total sample"));
        assert!(!Lens::TotalSample.matches("Male"));
        assert!(Lens::Gender.matches("female"));
        assert!(Lens::Income.matches("Financially Tight"));
        assert!(!Lens::Income.matches("Financially Comfortable"));
    }

    #[test]
    fn canonical_collapses_spelling_variants() {
        assert_eq!(Lens::TotalSample.canonical("Total Sample"), Some("Total sample"));
        assert_eq!(Lens::Gender.canonical("FEMALE"), Some("Female"));
        assert_eq!(Lens::Gender.canonical("Nonbinary"), None);
    }
}
