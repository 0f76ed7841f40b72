use a2jboard::{
    config::Config,
    fetch::StoreClient,
    gate::AccessGate,
    pipeline::{Lens, PipelineError, Scope},
    store::TableStore,
    view::{self, effects, gap, journey},
};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) gate first: nothing is fetched before it opens ───────────
    let cfg = Config::from_env()?;
    let mut gate = AccessGate::closed();
    let attempt = std::env::var("A2J_PASSWORD").unwrap_or_default();
    if !gate.unlock(&attempt, &cfg.dashboard_password) {
        bail!("password incorrect; set A2J_PASSWORD");
    }

    // ─── 3) selectors ────────────────────────────────────────────────
    let scope = Scope::parse(&std::env::var("A2J_SCOPE").unwrap_or_else(|_| "EU".into()));
    let lens_label = std::env::var("A2J_LENS").unwrap_or_else(|_| "total".into());
    let lens = Lens::parse(&lens_label)
        .with_context(|| format!("unknown lens `{lens_label}` (total | gender | income)"))?;
    info!(scope = %scope, lens = %lens, "rendering");

    // ─── 4) connect store and warm the caches ────────────────────────
    let client = StoreClient::connect(
        &cfg.store_app_key,
        &cfg.store_app_secret,
        &cfg.store_refresh_token,
    )
    .await?;
    let store = TableStore::new(client);

    let gpp = store.csv(&cfg.gpp_file).await?;
    let barriers = store.csv(&cfg.barriers_file).await?;
    let regression = store.csv(&cfg.regression_file).await?;

    // ─── 5) validate a country selection against the selector list ───
    if let Scope::Country(name) = &scope {
        let country_col = gpp.column_index("country")?;
        let all: Vec<&str> = gpp
            .rows
            .iter()
            .filter_map(|r| r.get(country_col).and_then(|c| c.as_str()))
            .filter(|c| *c != "European Union")
            .collect();
        let selectable = cfg.selectable_countries(all);
        if !selectable.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            bail!("`{name}` is not in the country selector ({} available)", selectable.len());
        }
    }

    // ─── 6) render every view, recovering per-view failures ──────────
    let mut output = serde_json::Map::new();
    output.insert("scope".into(), json!(scope.label()));
    output.insert("lens".into(), json!(lens.to_string()));

    let headline = if lens == Lens::Income {
        let section1 = store.sheet(&cfg.journey_file, "Section1").await?;
        journey::income_prevalence(&gate, &section1, &scope)
    } else {
        journey::prevalence_headline(&gate, &gpp, &scope, lens)
    };
    output.insert("prevalence".into(), render("prevalence", headline));

    for spec in journey::SECTIONS {
        let table = store.sheet(&cfg.journey_file, spec.sheet).await?;
        let rows = if spec.sheet == "Section3" {
            journey::advisers(&gate, &table, &scope, lens)
        } else {
            view::section_summary(&gate, &table, spec, &scope, lens)
        };
        output.insert(spec.sheet.to_lowercase(), render(spec.sheet, rows));
    }

    let selection: Vec<String> = match &scope {
        Scope::Eu => vec!["EU".to_string()],
        Scope::Country(name) => vec!["EU".to_string(), name.clone()],
    };
    let gap_country = match &scope {
        Scope::Eu => "EU".to_string(),
        Scope::Country(name) => name.clone(),
    };
    output.insert(
        "justice_gap".into(),
        render("justice_gap", gap::gap_shares(&gate, &barriers, &selection)),
    );
    output.insert(
        "barrier_distribution".into(),
        render(
            "barrier_distribution",
            gap::barrier_distribution(&gate, &barriers, &gap_country),
        ),
    );
    output.insert(
        "barrier_families".into(),
        render(
            "barrier_families",
            gap::barrier_families(&gate, &barriers, &gap_country),
        ),
    );
    // The drill-down is opt-in, like the dashboard's disaggregation picker.
    if let Ok(label) = std::env::var("A2J_GAP_BREAKDOWN") {
        let breakdown = gap::GapBreakdown::parse(&label)
            .with_context(|| format!("unknown breakdown `{label}` (gender | income | both)"))?;
        let file = match breakdown {
            gap::GapBreakdown::Gender => &cfg.gap_gender_file,
            gap::GapBreakdown::Income => &cfg.gap_income_file,
            gap::GapBreakdown::Both => &cfg.gap_combined_file,
        };
        let extract = store.csv(file).await?;
        output.insert(
            "barrier_distribution_split".into(),
            render(
                "barrier_distribution_split",
                gap::disaggregated_barriers(&gate, &extract, breakdown, &gap_country),
            ),
        );
        output.insert(
            "barrier_families_split".into(),
            render(
                "barrier_families_split",
                gap::disaggregated_families(&gate, &extract, breakdown, &gap_country),
            ),
        );
    }

    output.insert(
        "socio_effects".into(),
        render("socio_effects", effects::socio_effects(&gate, &regression, &scope)),
    );

    println!("{}", serde_json::to_string_pretty(&output)?);
    info!("all views rendered");
    Ok(())
}

/// A failed view becomes a user-visible message in the output; it never
/// takes down the other views.
fn render<T: Serialize>(label: &str, result: Result<T, PipelineError>) -> serde_json::Value {
    match result {
        Ok(rows) => json!({ "rows": rows }),
        Err(e) => {
            error!(view = label, error = %e, "view failed");
            json!({ "error": e.to_string() })
        }
    }
}
