//! Aggregation cache keyed by the filtered record set.
//!
//! A record set is identified by its `Arc` allocation plus a data hash. The
//! default boundary hash only looks at the record count and the first and last
//! raw `Date` strings, so two different sets with equal boundaries hash the
//! same; the pointer check catches that case when callers pass a freshly
//! filtered set. [`HashMode::Content`] additionally checksums every field.

use crate::records::LeadRecord;
use crate::services::aggregation::{AggregateSeries, DailySnapshots, SourceAggregates};
use crate::services::aging::AgingReport;
use crate::services::funnel::FunnelSummary;
use crate::services::quality::QualityReport;
use crate::services::segments::{CountrySegments, TeamLoad};
use crate::services::timing::TimingReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64_with_seed;

pub const EMPTY_DATA_HASH: &str = "empty";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HashMode {
    #[default]
    Boundary,
    Content,
}

impl HashMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "boundary" => Some(HashMode::Boundary),
            "content" => Some(HashMode::Content),
            _ => None,
        }
    }
}

/// `"{count}-{firstDate}-{lastDate}"` over unparsed dates, or `"empty"`.
pub fn data_hash(records: &[LeadRecord], mode: HashMode) -> String {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return EMPTY_DATA_HASH.to_string();
    };
    let boundary = format!(
        "{}-{}-{}",
        records.len(),
        first.date_text(),
        last.date_text()
    );
    match mode {
        HashMode::Boundary => boundary,
        HashMode::Content => format!("{boundary}-{:016x}", content_checksum(records)),
    }
}

fn content_checksum(records: &[LeadRecord]) -> u64 {
    let mut seed = 0u64;
    let mut buffer = Vec::with_capacity(128);
    for record in records {
        buffer.clear();
        for text in [&record.date, &record.name, &record.country, &record.source] {
            match text {
                Some(value) => {
                    buffer.push(1);
                    buffer.extend_from_slice(value.as_bytes());
                }
                None => buffer.push(0),
            }
            buffer.push(0x1f);
        }
        let metrics = record.metrics();
        for value in [
            metrics.created,
            metrics.sent,
            metrics.connected,
            metrics.replies,
            metrics.positive,
            metrics.events,
        ] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        seed = xxh3_64_with_seed(&buffer, seed);
    }
    seed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateFamily {
    /// Daily funnel series keyed by raw date text.
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

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSet {
    pub funnel: Option<AggregateSeries>,
    pub country: Option<AggregateSeries>,
    pub weekly: Option<AggregateSeries>,
    pub monthly: Option<AggregateSeries>,
    pub leaderboard: Option<AggregateSeries>,
    pub source: Option<SourceAggregates>,
    pub funnel_summary: Option<FunnelSummary>,
    pub quality: Option<QualityReport>,
    pub timing: Option<TimingReport>,
    pub aging: Option<AgingReport>,
    pub daily_snapshots: Option<DailySnapshots>,
    pub country_segments: Option<CountrySegments>,
    pub team_load: Option<TeamLoad>,
}

fn merge_slot<T>(target: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *target = incoming;
    }
}

impl AggregateSet {
    /// Key-wise merge; families present in `other` replace ours.
    pub fn merge(&mut self, other: AggregateSet) {
        merge_slot(&mut self.funnel, other.funnel);
        merge_slot(&mut self.country, other.country);
        merge_slot(&mut self.weekly, other.weekly);
        merge_slot(&mut self.monthly, other.monthly);
        merge_slot(&mut self.leaderboard, other.leaderboard);
        merge_slot(&mut self.source, other.source);
        merge_slot(&mut self.funnel_summary, other.funnel_summary);
        merge_slot(&mut self.quality, other.quality);
        merge_slot(&mut self.timing, other.timing);
        merge_slot(&mut self.aging, other.aging);
        merge_slot(&mut self.daily_snapshots, other.daily_snapshots);
        merge_slot(&mut self.country_segments, other.country_segments);
        merge_slot(&mut self.team_load, other.team_load);
    }

    pub fn contains(&self, family: AggregateFamily) -> bool {
        match family {
            AggregateFamily::Funnel => self.funnel.is_some(),
            AggregateFamily::Country => self.country.is_some(),
            AggregateFamily::Weekly => self.weekly.is_some(),
            AggregateFamily::Monthly => self.monthly.is_some(),
            AggregateFamily::Leaderboard => self.leaderboard.is_some(),
            AggregateFamily::Source => self.source.is_some(),
            AggregateFamily::FunnelSummary => self.funnel_summary.is_some(),
            AggregateFamily::Quality => self.quality.is_some(),
            AggregateFamily::Timing => self.timing.is_some(),
            AggregateFamily::Aging => self.aging.is_some(),
            AggregateFamily::DailySnapshots => self.daily_snapshots.is_some(),
            AggregateFamily::CountrySegments => self.country_segments.is_some(),
            AggregateFamily::TeamLoad => self.team_load.is_some(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregationCache {
    mode: HashMode,
    data_hash: Option<String>,
    records: Option<Arc<[LeadRecord]>>,
    aggregates: AggregateSet,
}

impl AggregationCache {
    pub fn new(mode: HashMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn data_hash(&self) -> Option<&str> {
        self.data_hash.as_deref()
    }

    pub fn aggregates(&self) -> &AggregateSet {
        &self.aggregates
    }

    fn is_bound_to(&self, records: &Arc<[LeadRecord]>) -> bool {
        self.records
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, records))
    }

    /// Drops every family and binds the cache to `records`.
    fn rebind(&mut self, records: &Arc<[LeadRecord]>) {
        self.aggregates = AggregateSet::default();
        self.data_hash = Some(data_hash(records, self.mode));
        self.records = Some(Arc::clone(records));
    }

    /// Returns the cached family or computes, stores and returns it.
    ///
    /// A stale cache is rebound to `records` first, so families computed for
    /// an earlier record set are never returned.
    pub fn get_or_compute<T>(
        &mut self,
        family: AggregateFamily,
        records: &Arc<[LeadRecord]>,
        slot: fn(&mut AggregateSet) -> &mut Option<T>,
        compute: impl FnOnce(&[LeadRecord]) -> T,
    ) -> &T {
        if should_recalculate(records, self) {
            tracing::debug!(?family, "aggregation cache stale; rebinding");
            self.rebind(records);
        }
        let entry = slot(&mut self.aggregates);
        if entry.is_some() {
            tracing::debug!(?family, "aggregation cache hit");
        } else {
            tracing::debug!(?family, "aggregation cache miss");
        }
        let rows: &[LeadRecord] = records;
        entry.get_or_insert_with(|| compute(rows))
    }
}

/// True when the cache has no hash, the hash changed or `records` is a
/// different allocation than the one last stored.
pub fn should_recalculate(records: &Arc<[LeadRecord]>, cache: &AggregationCache) -> bool {
    let Some(cached_hash) = cache.data_hash.as_deref() else {
        return true;
    };
    if data_hash(records, cache.mode) != cached_hash {
        return true;
    }
    !cache.is_bound_to(records)
}

/// Stores `aggregates` for `records`, merging into what is cached for the
/// same set and replacing everything cached for a different one.
pub fn update_cache(
    cache: &mut AggregationCache,
    records: &Arc<[LeadRecord]>,
    aggregates: AggregateSet,
) {
    let fresh_hash = data_hash(records, cache.mode);
    let same_set = cache.is_bound_to(records) && cache.data_hash.as_deref() == Some(&fresh_hash);
    if !same_set {
        cache.aggregates = AggregateSet::default();
    }
    cache.data_hash = Some(fresh_hash);
    cache.records = Some(Arc::clone(records));
    cache.aggregates.merge(aggregates);
}
