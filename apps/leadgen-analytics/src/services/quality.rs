use crate::records::{ratio_or_zero, LeadMetrics, LeadRecord};
use crate::services::aggregation::OrderedGroups;
use crate::services::dated_records;
use crate::time;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRow {
    pub name: String,
    #[serde(flatten)]
    pub metrics: LeadMetrics,
    /// Reply-weighted mean days from first activity to each reply.
    pub avg_response_time_days: Option<f64>,
    pub positive_rate: f64,
    pub created_to_positive: f64,
    pub positive_to_events: f64,
    pub events_per_week: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub rows: Vec<QualityRow>,
    pub weeks_in_range: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityColumn {
    Name,
    Created,
    Sent,
    Connected,
    Replies,
    Positive,
    Events,
    AvgResponseTimeDays,
    PositiveRate,
    CreatedToPositive,
    PositiveToEvents,
    EventsPerWeek,
}

impl QualityRow {
    fn value(&self, column: QualityColumn) -> Option<f64> {
        match column {
            QualityColumn::Name => None,
            QualityColumn::Created => Some(self.metrics.created),
            QualityColumn::Sent => Some(self.metrics.sent),
            QualityColumn::Connected => Some(self.metrics.connected),
            QualityColumn::Replies => Some(self.metrics.replies),
            QualityColumn::Positive => Some(self.metrics.positive),
            QualityColumn::Events => Some(self.metrics.events),
            QualityColumn::AvgResponseTimeDays => self.avg_response_time_days,
            QualityColumn::PositiveRate => Some(self.positive_rate),
            QualityColumn::CreatedToPositive => Some(self.created_to_positive),
            QualityColumn::PositiveToEvents => Some(self.positive_to_events),
            QualityColumn::EventsPerWeek => Some(self.events_per_week),
        }
    }
}

impl QualityReport {
    /// Stable sort of the rows; missing values stay at the bottom in either direction.
    pub fn sorted_by(mut self, column: QualityColumn, descending: bool) -> Self {
        self.rows.sort_by(|a, b| {
            if column == QualityColumn::Name {
                let ordering = a.name.cmp(&b.name);
                return if descending { ordering.reverse() } else { ordering };
            }
            match (a.value(column), b.value(column)) {
                (Some(x), Some(y)) => {
                    let ordering = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        self
    }
}

#[derive(Debug)]
struct GeneratorStats {
    metrics: LeadMetrics,
    first_activity: NaiveDate,
    reply_lag_weighted: f64,
    total_replies_for_lag: f64,
}

pub fn lead_generator_quality(records: &[LeadRecord]) -> QualityReport {
    let dated = dated_records(records);
    let (Some(first), Some(last)) = (dated.first(), dated.last()) else {
        return QualityReport::default();
    };

    let span_days = time::days_between(first.0, last.0).round();
    let total_days = (span_days + 1.0).max(1.0);
    let weeks_in_range = total_days / 7.0;

    let mut groups = OrderedGroups::<GeneratorStats>::default();
    for (date, record) in &dated {
        let date = *date;
        let stats = groups.entry_with(record.generator(), || GeneratorStats {
            metrics: LeadMetrics::default(),
            first_activity: date,
            reply_lag_weighted: 0.0,
            total_replies_for_lag: 0.0,
        });
        if date < stats.first_activity {
            stats.first_activity = date;
        }
        stats.metrics += record.metrics();

        let replies = record.total_replies;
        if replies > 0.0 {
            let lag_days = time::days_between(stats.first_activity, date).max(0.0);
            stats.reply_lag_weighted += lag_days * replies;
            stats.total_replies_for_lag += replies;
        }
    }

    let rows = groups
        .into_entries()
        .into_iter()
        .map(|(name, stats)| {
            let metrics = stats.metrics;
            let avg_response_time_days = (stats.total_replies_for_lag > 0.0)
                .then(|| stats.reply_lag_weighted / stats.total_replies_for_lag);
            let events_per_week = if weeks_in_range > 0.0 {
                metrics.events / weeks_in_range
            } else {
                metrics.events
            };
            QualityRow {
                name,
                metrics,
                avg_response_time_days,
                positive_rate: ratio_or_zero(metrics.positive, metrics.sent),
                created_to_positive: ratio_or_zero(metrics.positive, metrics.created),
                positive_to_events: ratio_or_zero(metrics.events, metrics.positive),
                events_per_week,
            }
        })
        .collect();

    QualityReport {
        rows,
        weeks_in_range,
    }
}
