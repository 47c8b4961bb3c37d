//! Dimensional rollups over lead records.
//!
//! Every family here folds the six funnel counters into one bucket per
//! grouping key and emits parallel arrays, which is the shape the dashboard
//! charts consume directly.

pub mod snapshots;
pub mod source;

use crate::records::{Dimension, LeadMetrics, LeadRecord};
use crate::time::IsoWeekKey;
use serde::Serialize;
use std::collections::HashMap;

pub use snapshots::{daily_snapshots, DailySnapshot, DailySnapshots};
pub use source::{source_aggregates, SourceAggregates};

/// Insertion-ordered grouping keyed by string.
#[derive(Debug, Clone)]
pub(crate) struct OrderedGroups<T> {
    index: HashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedGroups<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<T> OrderedGroups<T> {
    pub(crate) fn entry_with(&mut self, key: String, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(key.clone(), slot);
                self.entries.push((key, init()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let slot = *self.index.get(key)?;
        Some(&mut self.entries[slot].1)
    }

    pub(crate) fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

impl<T: Default> OrderedGroups<T> {
    pub(crate) fn entry(&mut self, key: String) -> &mut T {
        self.entry_with(key, T::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSeries {
    pub keys: Vec<String>,
    pub created: Vec<f64>,
    pub sent: Vec<f64>,
    pub connected: Vec<f64>,
    pub replies: Vec<f64>,
    pub positive: Vec<f64>,
    pub events: Vec<f64>,
    pub conversion_rates: Vec<f64>,
}

impl AggregateSeries {
    pub(crate) fn from_rows(rows: Vec<(String, LeadMetrics)>) -> Self {
        let mut series = Self::with_capacity(rows.len());
        for (key, metrics) in rows {
            series.push(key, metrics);
        }
        series
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            created: Vec::with_capacity(capacity),
            sent: Vec::with_capacity(capacity),
            connected: Vec::with_capacity(capacity),
            replies: Vec::with_capacity(capacity),
            positive: Vec::with_capacity(capacity),
            events: Vec::with_capacity(capacity),
            conversion_rates: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, key: String, metrics: LeadMetrics) {
        self.keys.push(key);
        self.created.push(metrics.created);
        self.sent.push(metrics.sent);
        self.connected.push(metrics.connected);
        self.replies.push(metrics.replies);
        self.positive.push(metrics.positive);
        self.events.push(metrics.events);
        self.conversion_rates.push(metrics.conversion_rate());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn metrics_at(&self, index: usize) -> Option<LeadMetrics> {
        if index >= self.len() {
            return None;
        }
        Some(LeadMetrics {
            created: self.created[index],
            sent: self.sent[index],
            connected: self.connected[index],
            replies: self.replies[index],
            positive: self.positive[index],
            events: self.events[index],
        })
    }

    /// Sum across every bucket.
    pub fn totals(&self) -> LeadMetrics {
        let mut totals = LeadMetrics::default();
        for index in 0..self.len() {
            if let Some(metrics) = self.metrics_at(index) {
                totals += metrics;
            }
        }
        totals
    }
}

/// Groups `records` by `dimension`.
///
/// Keys keep first-seen order, except ISO weeks (numeric year then week) and
/// months (lexicographic `YYYY-MM`). Records without a parseable date are
/// skipped for the date-derived dimensions.
pub fn aggregate_by(records: &[LeadRecord], dimension: Dimension) -> AggregateSeries {
    let mut groups = OrderedGroups::<LeadMetrics>::default();
    let mut skipped = 0usize;
    for record in records {
        let Some(key) = record.dimension(dimension) else {
            skipped = skipped.saturating_add(1);
            continue;
        };
        *groups.entry(key) += record.metrics();
    }
    if skipped > 0 {
        tracing::debug!(?dimension, skipped, "records without a parseable date skipped");
    }

    let mut rows = groups.into_entries();
    match dimension {
        Dimension::IsoWeek => rows.sort_by_key(|(key, _)| IsoWeekKey::parse(key)),
        Dimension::Month => rows.sort_by(|a, b| a.0.cmp(&b.0)),
        _ => {}
    }
    AggregateSeries::from_rows(rows)
}

/// Keyed by the literal `Date` text, unparseable values included.
pub fn daily_aggregates(records: &[LeadRecord]) -> AggregateSeries {
    aggregate_by(records, Dimension::Day)
}

pub fn country_aggregates(records: &[LeadRecord]) -> AggregateSeries {
    aggregate_by(records, Dimension::Country)
}

pub fn weekly_aggregates(records: &[LeadRecord]) -> AggregateSeries {
    aggregate_by(records, Dimension::IsoWeek)
}

pub fn monthly_aggregates(records: &[LeadRecord]) -> AggregateSeries {
    aggregate_by(records, Dimension::Month)
}

pub fn leaderboard_aggregates(records: &[LeadRecord]) -> AggregateSeries {
    aggregate_by(records, Dimension::Generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lead, LeadBuilder};

    #[test]
    fn totals_are_conserved_across_dimensions() {
        let records = vec![
            lead("01/01/2024").name("Ana").country("DE").created(5.0).events(1.0).build(),
            lead("02/01/2024").name("Bo").country("FR").created(3.0).sent(2.0).build(),
            lead("not a date").name("Ana").country("DE").created(7.0).replies(4.0).build(),
        ];
        let expected = records
            .iter()
            .fold(LeadMetrics::default(), |mut acc, record| {
                acc += record.metrics();
                acc
            });

        for dimension in [
            Dimension::Day,
            Dimension::Country,
            Dimension::Source,
            Dimension::Generator,
        ] {
            assert_eq!(aggregate_by(&records, dimension).totals(), expected, "{dimension:?}");
        }

        let dated_only = weekly_aggregates(&records).totals();
        assert_eq!(dated_only.created, 8.0);
        assert_eq!(monthly_aggregates(&records).totals(), dated_only);
    }

    #[test]
    fn keeps_first_seen_order_for_categorical_keys() {
        let records = vec![
            lead("01/01/2024").country("FR").build(),
            lead("01/01/2024").country("DE").build(),
            lead("01/01/2024").country("FR").build(),
            lead("01/01/2024").build(),
        ];
        let series = country_aggregates(&records);
        assert_eq!(series.keys, vec!["FR", "DE", "Unknown"]);
    }

    #[test]
    fn sorts_weeks_numerically() {
        let records = vec![
            // 2024-W51, 2023-W02, 2024-W01
            lead("18/12/2024").created(1.0).build(),
            lead("10/01/2023").created(2.0).build(),
            lead("03/01/2024").created(3.0).build(),
        ];
        let series = weekly_aggregates(&records);
        assert_eq!(series.keys, vec!["2023-W02", "2024-W01", "2024-W51"]);
        assert_eq!(series.created, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn skips_dates_without_a_representable_week() {
        let records = vec![
            lead("31/12/262142").created(1.0).build(),
            lead("03/01/2024").created(3.0).build(),
        ];
        let series = weekly_aggregates(&records);
        assert_eq!(series.keys, vec!["2024-W01"]);
        assert_eq!(series.totals().created, 3.0);
        assert_eq!(monthly_aggregates(&records).len(), 2);
    }

    #[test]
    fn sorts_months_lexicographically() {
        let records = vec![
            lead("05/03/2024").build(),
            lead("20/11/2023").build(),
            lead("01/01/2024").build(),
        ];
        let series = monthly_aggregates(&records);
        assert_eq!(series.keys, vec!["2023-11", "2024-01", "2024-03"]);
    }

    #[test]
    fn daily_keys_use_literal_date_text() {
        let records = vec![
            lead("02/01/2024").created(1.0).build(),
            lead("garbage").created(2.0).build(),
            LeadBuilder::undated().created(4.0).build(),
        ];
        let series = daily_aggregates(&records);
        assert_eq!(series.keys, vec!["02/01/2024", "garbage", "Unknown"]);
    }

    #[test]
    fn conversion_rate_defaults_to_zero() {
        let records = vec![
            lead("01/01/2024").name("Ana").events(2.0).build(),
            lead("01/01/2024").name("Bo").created(4.0).events(1.0).build(),
        ];
        let series = leaderboard_aggregates(&records);
        assert_eq!(series.conversion_rates, vec![0.0, 25.0]);
        assert!(series.conversion_rates.iter().all(|rate| rate.is_finite()));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            lead("01/01/2024").country("DE").created(2.0).build(),
            lead("09/01/2024").country("FR").created(3.0).build(),
        ];
        assert_eq!(weekly_aggregates(&records), weekly_aggregates(&records));
        assert_eq!(country_aggregates(&records), country_aggregates(&records));
    }

    #[test]
    fn empty_input_yields_empty_series() {
        let series = aggregate_by(&[], Dimension::Source);
        assert!(series.is_empty());
        assert_eq!(series.totals(), LeadMetrics::default());
    }
}
