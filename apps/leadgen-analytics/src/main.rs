use anyhow::{Context, Result};
use clap::Parser;
use leadgen_analytics::services::dashboard::DashboardEngine;
use leadgen_analytics::services::insights::{filter_by_date_range, DateRange, InsightSubject};
use leadgen_analytics::{cli, config, records};

fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::AnalyticsConfig::from_env()?;

    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            anyhow::bail!("--from ({from}) must not be after --to ({to})");
        }
    }

    let raw = std::fs::read_to_string(&args.data)
        .with_context(|| format!("failed to read lead payload {}", args.data.display()))?;
    let payload = records::parse_payload(&raw)
        .with_context(|| format!("failed to parse lead payload {}", args.data.display()))?;
    tracing::info!(
        records = payload.records.len(),
        last_updated = payload.last_updated.as_deref().unwrap_or("unknown"),
        "lead payload loaded"
    );

    let all = payload.into_shared();
    let range = DateRange {
        from: args.from,
        to: args.to,
    };
    let records = if range.is_unbounded() {
        all
    } else {
        let filtered = filter_by_date_range(&all, &range);
        tracing::info!(kept = filtered.len(), total = all.len(), "date filter applied");
        filtered
    };

    let mut engine = DashboardEngine::new(config);
    let drill_down = args
        .country
        .as_deref()
        .map(|name| (InsightSubject::Country, name))
        .or_else(|| {
            args.generator
                .as_deref()
                .map(|name| (InsightSubject::Generator, name))
        });

    let output = match (drill_down, args.family) {
        (Some((subject, name)), _) => {
            serde_json::to_value(engine.insight(&records, subject, name, &range))?
        }
        (None, Some(family)) => engine.family_json(family.into(), &records)?,
        (None, None) => serde_json::to_value(engine.snapshot(&records))?,
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}
