use crate::services::cache::AggregateFamily;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "leadgen-analytics",
    version,
    about = "Lead-generation funnel rollups from an exported payload"
)]
pub struct Args {
    /// Payload file (`{"last_updated": ..., "data": [...]}`).
    #[arg(long)]
    pub data: PathBuf,
    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Print one aggregate family instead of the full snapshot.
    #[arg(long, value_enum)]
    pub family: Option<FamilyArg>,
    /// Drill down into a single country.
    #[arg(long, conflicts_with_all = ["family", "generator"])]
    pub country: Option<String>,
    /// Drill down into a single lead generator.
    #[arg(long, conflicts_with = "family")]
    pub generator: Option<String>,
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyArg {
    Funnel,
    Country,
    Weekly,
    Monthly,
    Leaderboard,
    Source,
    FunnelSummary,
    Quality,
    Timing,
    Aging,
    DailySnapshots,
    CountrySegments,
    TeamLoad,
}

impl From<FamilyArg> for AggregateFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Funnel => AggregateFamily::Funnel,
            FamilyArg::Country => AggregateFamily::Country,
            FamilyArg::Weekly => AggregateFamily::Weekly,
            FamilyArg::Monthly => AggregateFamily::Monthly,
            FamilyArg::Leaderboard => AggregateFamily::Leaderboard,
            FamilyArg::Source => AggregateFamily::Source,
            FamilyArg::FunnelSummary => AggregateFamily::FunnelSummary,
            FamilyArg::Quality => AggregateFamily::Quality,
            FamilyArg::Timing => AggregateFamily::Timing,
            FamilyArg::Aging => AggregateFamily::Aging,
            FamilyArg::DailySnapshots => AggregateFamily::DailySnapshots,
            FamilyArg::CountrySegments => AggregateFamily::CountrySegments,
            FamilyArg::TeamLoad => AggregateFamily::TeamLoad,
        }
    }
}
