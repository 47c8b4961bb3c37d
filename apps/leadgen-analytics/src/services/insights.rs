//! Date-range filtering and single-country / single-generator drill-downs.

use crate::records::{percent_or_zero, Dimension, LeadMetrics, LeadRecord};
use crate::services::aggregation::OrderedGroups;
use crate::time;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inclusive day range; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Keeps records whose parsed date falls inside `range`. Undated records are
/// dropped once either side is bounded; an unbounded range keeps everything.
pub fn filter_by_date_range(records: &[LeadRecord], range: &DateRange) -> Arc<[LeadRecord]> {
    if range.is_unbounded() {
        return records.into();
    }
    records
        .iter()
        .filter(|record| record.parsed_date().is_some_and(|date| range.contains(date)))
        .cloned()
        .collect()
}

/// Earliest and latest parseable dates.
pub fn date_bounds(records: &[LeadRecord]) -> Option<(NaiveDate, NaiveDate)> {
    records
        .iter()
        .filter_map(LeadRecord::parsed_date)
        .fold(None, |bounds, date| match bounds {
            None => Some((date, date)),
            Some((min, max)) => Some((min.min(date), max.max(date))),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightSubject {
    Country,
    Generator,
}

impl InsightSubject {
    pub fn dimension(self) -> Dimension {
        match self {
            InsightSubject::Country => Dimension::Country,
            InsightSubject::Generator => Dimension::Generator,
        }
    }

    /// The dimension ranked inside the drill-down.
    pub fn counterpart(self) -> Dimension {
        match self {
            InsightSubject::Country => Dimension::Generator,
            InsightSubject::Generator => Dimension::Country,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    #[serde(flatten)]
    pub metrics: LeadMetrics,
    pub conversion_rate: f64,
    pub sent_to_connected_pct: f64,
    pub positive_to_replies_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyVolume {
    pub months: Vec<String>,
    pub created: Vec<f64>,
    pub events: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartRow {
    pub name: String,
    pub created: f64,
    pub events: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionInsight {
    pub subject: InsightSubject,
    pub name: String,
    pub summary: InsightSummary,
    pub monthly: MonthlyVolume,
    pub top: Vec<CounterpartRow>,
}

pub fn dimension_insight(
    records: &[LeadRecord],
    subject: InsightSubject,
    name: &str,
    range: &DateRange,
    top_n: usize,
) -> DimensionInsight {
    let mut totals = LeadMetrics::default();
    let mut by_month: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut counterparts = OrderedGroups::<(f64, f64)>::default();

    for record in records {
        if record.dimension(subject.dimension()).as_deref() != Some(name) {
            continue;
        }
        let Some(date) = record.parsed_date() else {
            continue;
        };
        if !range.contains(date) {
            continue;
        }

        totals += record.metrics();

        let month = by_month.entry(time::month_key(date)).or_default();
        month.0 += record.created;
        month.1 += record.events_created;

        if let Some(key) = record.dimension(subject.counterpart()) {
            let entry = counterparts.entry(key);
            entry.0 += record.created;
            entry.1 += record.events_created;
        }
    }

    let mut monthly = MonthlyVolume::default();
    for (month, (created, events)) in by_month {
        monthly.months.push(month);
        monthly.created.push(created);
        monthly.events.push(events);
    }

    let mut top: Vec<CounterpartRow> = counterparts
        .into_entries()
        .into_iter()
        .map(|(name, (created, events))| CounterpartRow {
            name,
            created,
            events,
            conversion_rate: percent_or_zero(events, created),
        })
        .collect();
    top.sort_by(|a, b| {
        b.conversion_rate
            .partial_cmp(&a.conversion_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.events.partial_cmp(&a.events).unwrap_or(Ordering::Equal))
    });
    top.truncate(top_n);

    DimensionInsight {
        subject,
        name: name.to_string(),
        summary: InsightSummary {
            metrics: totals,
            conversion_rate: totals.conversion_rate(),
            sent_to_connected_pct: percent_or_zero(totals.connected, totals.sent),
            positive_to_replies_pct: percent_or_zero(totals.positive, totals.replies),
        },
        monthly,
        top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lead, LeadBuilder};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample() -> Vec<LeadRecord> {
        vec![
            lead("05/01/2024")
                .name("Ana")
                .country("DE")
                .created(10.0)
                .sent(8.0)
                .connected(4.0)
                .replies(2.0)
                .positive(1.0)
                .events(1.0)
                .build(),
            lead("20/02/2024").name("Bo").country("DE").created(4.0).events(2.0).build(),
            lead("21/02/2024").name("Cy").country("DE").created(4.0).events(1.0).build(),
            lead("22/02/2024").name("Dee").country("DE").created(2.0).events(1.0).build(),
            lead("01/03/2024").name("Ana").country("FR").created(5.0).build(),
            LeadBuilder::undated().name("Ana").country("DE").created(100.0).build(),
        ]
    }

    #[test]
    fn filters_inclusively_and_drops_undated() {
        let records = sample();
        let filtered =
            filter_by_date_range(&records, &DateRange::new(day(2024, 1, 5), day(2024, 2, 21)));
        assert_eq!(filtered.len(), 3);

        let half_open = DateRange {
            from: Some(day(2024, 2, 21)),
            to: None,
        };
        assert_eq!(filter_by_date_range(&records, &half_open).len(), 3);
    }

    #[test]
    fn unbounded_range_keeps_every_record() {
        let records = sample();
        let open = filter_by_date_range(&records, &DateRange::default());
        assert_eq!(open.len(), records.len());
        assert_eq!(&open[..], &records[..]);
    }

    #[test]
    fn computes_date_bounds() {
        assert_eq!(
            date_bounds(&sample()),
            Some((day(2024, 1, 5), day(2024, 3, 1)))
        );
        assert_eq!(date_bounds(&[LeadBuilder::undated().build()]), None);
    }

    #[test]
    fn country_insight_ranks_generators() {
        let insight = dimension_insight(
            &sample(),
            InsightSubject::Country,
            "DE",
            &DateRange::default(),
            5,
        );
        assert_eq!(insight.summary.metrics.created, 20.0);
        assert_eq!(insight.summary.conversion_rate, 25.0);
        assert_eq!(insight.summary.sent_to_connected_pct, 50.0);
        assert_eq!(insight.summary.positive_to_replies_pct, 50.0);

        assert_eq!(insight.monthly.months, vec!["2024-01", "2024-02"]);
        assert_eq!(insight.monthly.created, vec![10.0, 10.0]);
        assert_eq!(insight.monthly.events, vec![1.0, 4.0]);

        // Bo and Dee tie at 50%; Bo wins on events.
        let names: Vec<&str> = insight.top.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["Bo", "Dee", "Cy", "Ana"]);
    }

    #[test]
    fn generator_insight_respects_range_and_limit() {
        let insight = dimension_insight(
            &sample(),
            InsightSubject::Generator,
            "Ana",
            &DateRange::new(day(2024, 2, 1), day(2024, 3, 31)),
            1,
        );
        assert_eq!(insight.summary.metrics.created, 5.0);
        assert_eq!(insight.top.len(), 1);
        assert_eq!(insight.top[0].name, "FR");
        assert_eq!(insight.top[0].conversion_rate, 0.0);
    }

    #[test]
    fn unknown_subject_yields_empty_insight() {
        let insight = dimension_insight(
            &sample(),
            InsightSubject::Country,
            "JP",
            &DateRange::default(),
            5,
        );
        assert_eq!(insight.summary.metrics, LeadMetrics::default());
        assert!(insight.monthly.months.is_empty());
        assert!(insight.top.is_empty());
    }
}
