use crate::records::{LeadMetrics, LeadRecord};
use crate::services::aggregation::OrderedGroups;
use crate::services::dated_records;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentThresholds {
    /// Minimum total `Created` for the medium tier.
    pub medium: f64,
    /// Minimum total `Created` for the enterprise tier.
    pub enterprise: f64,
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            medium: 50.0,
            enterprise: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityThresholds {
    pub medium_per_day: f64,
    pub high_per_day: f64,
}

impl Default for CapacityThresholds {
    fn default() -> Self {
        Self {
            medium_per_day: 10.0,
            high_per_day: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentTier {
    Small,
    Medium,
    Enterprise,
}

impl SegmentTier {
    pub const ALL: [SegmentTier; 3] = [
        SegmentTier::Small,
        SegmentTier::Medium,
        SegmentTier::Enterprise,
    ];

    pub fn classify(created: f64, thresholds: &SegmentThresholds) -> Self {
        if created >= thresholds.enterprise {
            SegmentTier::Enterprise
        } else if created >= thresholds.medium {
            SegmentTier::Medium
        } else {
            SegmentTier::Small
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadTier {
    Light,
    Medium,
    High,
}

impl LoadTier {
    pub fn classify(created_per_day: f64, thresholds: &CapacityThresholds) -> Self {
        if created_per_day >= thresholds.high_per_day {
            LoadTier::High
        } else if created_per_day >= thresholds.medium_per_day {
            LoadTier::Medium
        } else {
            LoadTier::Light
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySegmentRow {
    pub country: String,
    #[serde(flatten)]
    pub metrics: LeadMetrics,
    pub conversion_rate: f64,
    pub tier: SegmentTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTierSummary {
    pub tier: SegmentTier,
    pub countries: usize,
    pub created: f64,
    pub events: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountrySegments {
    pub rows: Vec<CountrySegmentRow>,
    pub tiers: Vec<SegmentTierSummary>,
}

/// Tiers each country by its total `Created` volume.
pub fn country_segments(
    records: &[LeadRecord],
    thresholds: &SegmentThresholds,
) -> CountrySegments {
    let mut groups = OrderedGroups::<LeadMetrics>::default();
    for record in records {
        *groups.entry(record.country_name()) += record.metrics();
    }

    let rows: Vec<CountrySegmentRow> = groups
        .into_entries()
        .into_iter()
        .map(|(country, metrics)| CountrySegmentRow {
            country,
            metrics,
            conversion_rate: metrics.conversion_rate(),
            tier: SegmentTier::classify(metrics.created, thresholds),
        })
        .collect();

    let tiers = SegmentTier::ALL
        .iter()
        .map(|&tier| {
            let mut countries = 0usize;
            let mut totals = LeadMetrics::default();
            for row in rows.iter().filter(|row| row.tier == tier) {
                countries += 1;
                totals += row.metrics;
            }
            SegmentTierSummary {
                tier,
                countries,
                created: totals.created,
                events: totals.events,
                conversion_rate: totals.conversion_rate(),
            }
        })
        .collect();

    CountrySegments { rows, tiers }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLoadRow {
    pub name: String,
    #[serde(flatten)]
    pub metrics: LeadMetrics,
    pub conversion_rate: f64,
    pub active_days: usize,
    pub created_per_day: f64,
    pub load: LoadTier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamLoad {
    pub rows: Vec<TeamLoadRow>,
}

#[derive(Debug, Default)]
struct GeneratorLoad {
    metrics: LeadMetrics,
    days: BTreeSet<NaiveDate>,
}

/// Tiers each generator by average `Created` per distinct active day.
///
/// Only dated records count, since an undated row has no day to attribute
/// its volume to.
pub fn team_load(records: &[LeadRecord], thresholds: &CapacityThresholds) -> TeamLoad {
    let mut groups = OrderedGroups::<GeneratorLoad>::default();
    for (date, record) in dated_records(records) {
        let entry = groups.entry(record.generator());
        entry.metrics += record.metrics();
        entry.days.insert(date);
    }

    let rows = groups
        .into_entries()
        .into_iter()
        .map(|(name, load)| {
            let active_days = load.days.len();
            let created_per_day = if active_days > 0 {
                load.metrics.created / active_days as f64
            } else {
                0.0
            };
            TeamLoadRow {
                name,
                metrics: load.metrics,
                conversion_rate: load.metrics.conversion_rate(),
                active_days,
                created_per_day,
                load: LoadTier::classify(created_per_day, thresholds),
            }
        })
        .collect();

    TeamLoad { rows }
}
