use super::{AggregateSeries, OrderedGroups};
use crate::records::{LeadMetrics, LeadRecord};
use crate::time;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAggregates {
    #[serde(flatten)]
    pub series: AggregateSeries,
    /// Event-weighted mean days from the source's first dated record to each
    /// event; `None` when the source has no dated events.
    pub avg_days_to_event: Vec<Option<f64>>,
}

#[derive(Debug, Default)]
struct SourceGroup {
    metrics: LeadMetrics,
    min_date: Option<NaiveDate>,
    event_weighted_days: f64,
    events_for_avg: f64,
}

pub fn source_aggregates(records: &[LeadRecord]) -> SourceAggregates {
    let mut groups = OrderedGroups::<SourceGroup>::default();
    let dated: Vec<(String, Option<NaiveDate>)> = records
        .iter()
        .map(|record| (record.source_name(), record.parsed_date()))
        .collect();

    for (record, (source, date)) in records.iter().zip(dated.iter()) {
        let group = groups.entry(source.clone());
        group.metrics += record.metrics();
        if let Some(date) = *date {
            group.min_date = Some(group.min_date.map_or(date, |current| current.min(date)));
        }
    }

    // Second pass so lags are measured from each group's final minimum date.
    for (record, (source, date)) in records.iter().zip(dated.iter()) {
        let events = record.events_created;
        let Some(date) = *date else {
            continue;
        };
        if events <= 0.0 {
            continue;
        }
        let Some(group) = groups.get_mut(source) else {
            continue;
        };
        let Some(min_date) = group.min_date else {
            continue;
        };
        group.event_weighted_days += time::days_between(min_date, date).max(0.0) * events;
        group.events_for_avg += events;
    }

    let entries = groups.into_entries();
    let avg_days_to_event = entries
        .iter()
        .map(|(_, group)| {
            (group.events_for_avg > 0.0).then(|| group.event_weighted_days / group.events_for_avg)
        })
        .collect();
    let series = AggregateSeries::from_rows(
        entries
            .into_iter()
            .map(|(source, group)| (source, group.metrics))
            .collect(),
    );

    SourceAggregates {
        series,
        avg_days_to_event,
    }
}
