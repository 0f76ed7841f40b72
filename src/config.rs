use std::env;

use anyhow::{Context, Result};

/// Runtime configuration, read from the environment the way the deployed
/// dashboard reads its secrets store. Credentials have no defaults; file
/// names and the territory exclusion list do.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_app_key: String,
    pub store_app_secret: String,
    pub store_refresh_token: String,
    pub dashboard_password: String,

    pub journey_file: String,
    pub gpp_file: String,
    pub barriers_file: String,
    pub regression_file: String,

    /// Per-demographic justice-gap extracts backing the barrier drill-down.
    pub gap_gender_file: String,
    pub gap_income_file: String,
    pub gap_combined_file: String,

    /// Territories excluded from the country selector for known upstream
    /// data-quality reasons. The extracts arrive pre-filtered; this list
    /// only shapes the selectable surface.
    pub excluded_territories: Vec<String>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            store_app_key: env::var("A2J_STORE_APP_KEY").context("A2J_STORE_APP_KEY not set")?,
            store_app_secret: env::var("A2J_STORE_APP_SECRET")
                .context("A2J_STORE_APP_SECRET not set")?,
            store_refresh_token: env::var("A2J_STORE_REFRESH_TOKEN")
                .context("A2J_STORE_REFRESH_TOKEN not set")?,
            dashboard_password: env::var("A2J_DASHBOARD_PASSWORD")
                .context("A2J_DASHBOARD_PASSWORD not set")?,
            journey_file: var_or("A2J_JOURNEY_FILE", "A2J_justicejourney_wrangled.xlsx"),
            gpp_file: var_or("A2J_GPP_FILE", "data4web_gpp.csv"),
            barriers_file: var_or("A2J_BARRIERS_FILE", "barriers.csv"),
            regression_file: var_or("A2J_REGRESSION_FILE", "logit_reg_gap.csv"),
            gap_gender_file: var_or("A2J_GAP_GENDER_FILE", "justice_gap_gend.csv"),
            gap_income_file: var_or("A2J_GAP_INCOME_FILE", "justice_gap_es.csv"),
            gap_combined_file: var_or(
                "A2J_GAP_COMBINED_FILE",
                "dem_breakdowns_justice_gap.csv",
            ),
            excluded_territories: vec!["Ireland".to_string()],
        })
    }

    /// Countries offered in the selector: everything in the datapoints
    /// extract minus the exclusion list.
    pub fn selectable_countries<'a>(
        &self,
        all: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut out: Vec<String> = all
            .into_iter()
            .filter(|c| !self.excluded_territories.iter().any(|x| x == c))
            .map(str::to_string)
            .collect();
        out.sort();
        out.dedup();
        out
    }
}
