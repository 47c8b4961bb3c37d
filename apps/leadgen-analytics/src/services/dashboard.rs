use crate::config::AnalyticsConfig;
use crate::records::LeadRecord;
use crate::services::aggregation::{
    country_aggregates, daily_aggregates, daily_snapshots, leaderboard_aggregates,
    monthly_aggregates, source_aggregates, weekly_aggregates, AggregateSeries, DailySnapshots,
    SourceAggregates,
};
use crate::services::aging::{aging_buckets, AgingReport};
use crate::services::cache::{AggregateFamily, AggregationCache};
use crate::services::funnel::{funnel_dropoff, funnel_summary, FunnelStage, FunnelSummary};
use crate::services::insights::{
    date_bounds, dimension_insight, DateRange, DimensionInsight, InsightSubject,
};
use crate::services::quality::{lead_generator_quality, QualityReport};
use crate::services::segments::{country_segments, team_load, CountrySegments, TeamLoad};
use crate::services::timing::{timing_stats_with_limit, TimingReport};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub data_hash: String,
    pub record_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub funnel: AggregateSeries,
    pub country: AggregateSeries,
    pub weekly: AggregateSeries,
    pub monthly: AggregateSeries,
    pub leaderboard: AggregateSeries,
    pub source: SourceAggregates,
    pub funnel_summary: FunnelSummary,
    pub funnel_stages: Vec<FunnelStage>,
    pub quality: QualityReport,
    pub timing: TimingReport,
    pub aging: AgingReport,
    pub daily_snapshots: DailySnapshots,
    pub country_segments: CountrySegments,
    pub team_load: TeamLoad,
}

/// Computes dashboard families for a record set through the aggregation cache.
#[derive(Debug, Clone)]
pub struct DashboardEngine {
    config: AnalyticsConfig,
    cache: AggregationCache,
}

impl DashboardEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        let cache = AggregationCache::new(config.cache_hash_mode);
        Self { config, cache }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn cache(&self) -> &AggregationCache {
        &self.cache
    }

    pub fn funnel(&mut self, records: &Arc<[LeadRecord]>) -> &AggregateSeries {
        self.cache.get_or_compute(
            AggregateFamily::Funnel,
            records,
            |set| &mut set.funnel,
            daily_aggregates,
        )
    }

    pub fn country(&mut self, records: &Arc<[LeadRecord]>) -> &AggregateSeries {
        self.cache.get_or_compute(
            AggregateFamily::Country,
            records,
            |set| &mut set.country,
            country_aggregates,
        )
    }

    pub fn weekly(&mut self, records: &Arc<[LeadRecord]>) -> &AggregateSeries {
        self.cache.get_or_compute(
            AggregateFamily::Weekly,
            records,
            |set| &mut set.weekly,
            weekly_aggregates,
        )
    }

    pub fn monthly(&mut self, records: &Arc<[LeadRecord]>) -> &AggregateSeries {
        self.cache.get_or_compute(
            AggregateFamily::Monthly,
            records,
            |set| &mut set.monthly,
            monthly_aggregates,
        )
    }

    pub fn leaderboard(&mut self, records: &Arc<[LeadRecord]>) -> &AggregateSeries {
        self.cache.get_or_compute(
            AggregateFamily::Leaderboard,
            records,
            |set| &mut set.leaderboard,
            leaderboard_aggregates,
        )
    }

    pub fn source(&mut self, records: &Arc<[LeadRecord]>) -> &SourceAggregates {
        self.cache.get_or_compute(
            AggregateFamily::Source,
            records,
            |set| &mut set.source,
            source_aggregates,
        )
    }

    pub fn funnel_summary(&mut self, records: &Arc<[LeadRecord]>) -> &FunnelSummary {
        self.cache.get_or_compute(
            AggregateFamily::FunnelSummary,
            records,
            |set| &mut set.funnel_summary,
            funnel_summary,
        )
    }

    pub fn quality(&mut self, records: &Arc<[LeadRecord]>) -> &QualityReport {
        self.cache.get_or_compute(
            AggregateFamily::Quality,
            records,
            |set| &mut set.quality,
            lead_generator_quality,
        )
    }

    pub fn timing(&mut self, records: &Arc<[LeadRecord]>) -> &TimingReport {
        let max_days = self.config.timing_max_days;
        self.cache.get_or_compute(
            AggregateFamily::Timing,
            records,
            |set| &mut set.timing,
            move |rows| timing_stats_with_limit(rows, max_days),
        )
    }

    pub fn aging(&mut self, records: &Arc<[LeadRecord]>) -> &AgingReport {
        self.cache.get_or_compute(
            AggregateFamily::Aging,
            records,
            |set| &mut set.aging,
            aging_buckets,
        )
    }

    pub fn daily_snapshots(&mut self, records: &Arc<[LeadRecord]>) -> &DailySnapshots {
        self.cache.get_or_compute(
            AggregateFamily::DailySnapshots,
            records,
            |set| &mut set.daily_snapshots,
            daily_snapshots,
        )
    }

    pub fn country_segments(&mut self, records: &Arc<[LeadRecord]>) -> &CountrySegments {
        let thresholds = self.config.segments;
        self.cache.get_or_compute(
            AggregateFamily::CountrySegments,
            records,
            |set| &mut set.country_segments,
            move |rows| country_segments(rows, &thresholds),
        )
    }

    pub fn team_load(&mut self, records: &Arc<[LeadRecord]>) -> &TeamLoad {
        let thresholds = self.config.capacity;
        self.cache.get_or_compute(
            AggregateFamily::TeamLoad,
            records,
            |set| &mut set.team_load,
            move |rows| team_load(rows, &thresholds),
        )
    }

    /// Serializes a single family, computing it only if it is not cached.
    pub fn family_json(
        &mut self,
        family: AggregateFamily,
        records: &Arc<[LeadRecord]>,
    ) -> serde_json::Result<serde_json::Value> {
        match family {
            AggregateFamily::Funnel => serde_json::to_value(self.funnel(records)),
            AggregateFamily::Country => serde_json::to_value(self.country(records)),
            AggregateFamily::Weekly => serde_json::to_value(self.weekly(records)),
            AggregateFamily::Monthly => serde_json::to_value(self.monthly(records)),
            AggregateFamily::Leaderboard => serde_json::to_value(self.leaderboard(records)),
            AggregateFamily::Source => serde_json::to_value(self.source(records)),
            AggregateFamily::FunnelSummary => serde_json::to_value(self.funnel_summary(records)),
            AggregateFamily::Quality => serde_json::to_value(self.quality(records)),
            AggregateFamily::Timing => serde_json::to_value(self.timing(records)),
            AggregateFamily::Aging => serde_json::to_value(self.aging(records)),
            AggregateFamily::DailySnapshots => serde_json::to_value(self.daily_snapshots(records)),
            AggregateFamily::CountrySegments => {
                serde_json::to_value(self.country_segments(records))
            }
            AggregateFamily::TeamLoad => serde_json::to_value(self.team_load(records)),
        }
    }

    pub fn snapshot(&mut self, records: &Arc<[LeadRecord]>) -> DashboardSnapshot {
        let span = tracing::info_span!("dashboard_snapshot", records = records.len());
        let _guard = span.enter();
        let started = Instant::now();

        let bounds = date_bounds(records);
        let funnel_summary = *self.funnel_summary(records);
        let snapshot = DashboardSnapshot {
            record_count: records.len(),
            first_date: bounds.map(|(first, _)| first),
            last_date: bounds.map(|(_, last)| last),
            funnel: self.funnel(records).clone(),
            country: self.country(records).clone(),
            weekly: self.weekly(records).clone(),
            monthly: self.monthly(records).clone(),
            leaderboard: self.leaderboard(records).clone(),
            source: self.source(records).clone(),
            funnel_summary,
            funnel_stages: funnel_dropoff(&funnel_summary),
            quality: self.quality(records).clone(),
            timing: self.timing(records).clone(),
            aging: self.aging(records).clone(),
            daily_snapshots: self.daily_snapshots(records).clone(),
            country_segments: self.country_segments(records).clone(),
            team_load: self.team_load(records).clone(),
            data_hash: self.cache.data_hash().unwrap_or_default().to_string(),
        };

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            data_hash = %snapshot.data_hash,
            "dashboard snapshot computed"
        );
        snapshot
    }

    /// Drill-down for one country or generator, limited to the configured top-N.
    pub fn insight(
        &self,
        records: &[LeadRecord],
        subject: InsightSubject,
        name: &str,
        range: &DateRange,
    ) -> DimensionInsight {
        dimension_insight(records, subject, name, range, self.config.insight_top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::{should_recalculate, HashMode};
    use crate::services::insights::filter_by_date_range;
    use crate::test_support::{lead, shared};

    fn records() -> Arc<[LeadRecord]> {
        shared(vec![
            lead("01/01/2024")
                .name("Ana")
                .country("DE")
                .source("LinkedIn")
                .created(10.0)
                .sent(6.0)
                .connected(3.0)
                .build(),
            lead("04/01/2024")
                .name("Bo")
                .country("FR")
                .source("Email")
                .created(5.0)
                .replies(2.0)
                .positive(1.0)
                .events(1.0)
                .build(),
        ])
    }

    #[test]
    fn snapshot_covers_every_family() {
        let records = records();
        let mut engine = DashboardEngine::new(AnalyticsConfig::default());
        let snapshot = engine.snapshot(&records);

        assert_eq!(snapshot.record_count, 2);
        assert_eq!(snapshot.data_hash, "2-01/01/2024-04/01/2024");
        assert_eq!(snapshot.funnel.keys, vec!["01/01/2024", "04/01/2024"]);
        assert_eq!(snapshot.country.keys, vec!["DE", "FR"]);
        assert_eq!(snapshot.weekly.keys, vec!["2024-W01"]);
        assert_eq!(snapshot.monthly.keys, vec!["2024-01"]);
        assert_eq!(snapshot.funnel_summary.created, 15.0);
        assert_eq!(snapshot.funnel_stages.len(), 6);
        assert_eq!(snapshot.timing.steps.len(), 4);
        assert_eq!(snapshot.aging.rows.len(), 5);
        assert_eq!(snapshot.daily_snapshots.rows.len(), 2);
        assert_eq!(snapshot.team_load.rows.len(), 2);
        assert_eq!(snapshot.first_date, NaiveDate::from_ymd_opt(2024, 1, 1));

        for family in [
            AggregateFamily::Funnel,
            AggregateFamily::Quality,
            AggregateFamily::CountrySegments,
            AggregateFamily::TeamLoad,
        ] {
            assert!(engine.cache().aggregates().contains(family), "{family:?}");
        }
        assert!(!should_recalculate(&records, engine.cache()));
    }

    #[test]
    fn repeated_snapshots_are_identical() {
        let records = records();
        let mut engine = DashboardEngine::new(AnalyticsConfig::default());
        let first = engine.snapshot(&records);
        let second = engine.snapshot(&records);
        assert_eq!(first, second);
    }

    #[test]
    fn refiltered_set_replaces_cached_families() {
        let mut config = AnalyticsConfig::default();
        config.cache_hash_mode = HashMode::Content;
        let mut engine = DashboardEngine::new(config);

        let all = records();
        assert_eq!(engine.country(&all).keys, vec!["DE", "FR"]);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 3).expect("date"),
            NaiveDate::from_ymd_opt(2024, 1, 31).expect("date"),
        );
        let narrowed = filter_by_date_range(&all, &range);
        assert_eq!(engine.country(&narrowed).keys, vec!["FR"]);
        assert!(!engine.cache().aggregates().contains(AggregateFamily::Weekly));
    }

    #[test]
    fn family_json_serializes_camel_case() {
        let records = records();
        let mut engine = DashboardEngine::new(AnalyticsConfig::default());
        let value = engine
            .family_json(AggregateFamily::Leaderboard, &records)
            .expect("serialize");
        assert_eq!(value["keys"], serde_json::json!(["Ana", "Bo"]));
        assert_eq!(value["conversionRates"], serde_json::json!([0.0, 20.0]));
    }

    #[test]
    fn insight_uses_configured_top_n() {
        let mut config = AnalyticsConfig::default();
        config.insight_top_n = 1;
        let engine = DashboardEngine::new(config);
        let records = shared(vec![
            lead("01/01/2024").name("Ana").country("DE").created(2.0).build(),
            lead("02/01/2024").name("Ana").country("FR").created(2.0).events(1.0).build(),
        ]);
        let insight = engine.insight(
            &records,
            InsightSubject::Generator,
            "Ana",
            &DateRange::default(),
        );
        assert_eq!(insight.top.len(), 1);
        assert_eq!(insight.top[0].name, "FR");
    }
}
