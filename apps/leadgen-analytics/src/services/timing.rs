//! Cycle-time estimates between consecutive funnel stages.
//!
//! Records carry daily counts rather than per-lead timestamps, so each unit of
//! a stage counter is treated as a dated event and the `from` and `to` event
//! streams are paired greedily: the i-th `from` unit is matched with the first
//! `to` unit at position `i` or later that lands on a strictly later day. When
//! no such unit exists the i-th `to` unit is used as-is, which may be same-day
//! or earlier and then clamps to zero days.
//!
//! Units are never materialized one by one. Streams are kept as `(date, count)`
//! runs and intervals as `(days, count)` pairs, so cost follows the number of
//! records rather than the size of their counters.

use crate::records::{LeadRecord, Metric};
use crate::services::dated_records;
use crate::time;
use chrono::NaiveDate;
use serde::Serialize;

pub const DEFAULT_MAX_INTERVAL_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimingStepKind {
    CreatedToSent,
    SentToConnected,
    ConnectedToPositive,
    PositiveToEvent,
}

impl TimingStepKind {
    pub const ALL: [TimingStepKind; 4] = [
        TimingStepKind::CreatedToSent,
        TimingStepKind::SentToConnected,
        TimingStepKind::ConnectedToPositive,
        TimingStepKind::PositiveToEvent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimingStepKind::CreatedToSent => "Created → Sent",
            TimingStepKind::SentToConnected => "Sent → Connected",
            TimingStepKind::ConnectedToPositive => "Connected → Positive",
            TimingStepKind::PositiveToEvent => "Positive → Event",
        }
    }

    pub fn stages(self) -> (Metric, Metric) {
        match self {
            TimingStepKind::CreatedToSent => (Metric::Created, Metric::Sent),
            TimingStepKind::SentToConnected => (Metric::Sent, Metric::Connected),
            TimingStepKind::ConnectedToPositive => (Metric::Connected, Metric::Positive),
            TimingStepKind::PositiveToEvent => (Metric::Positive, Metric::Events),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStep {
    pub key: TimingStepKind,
    pub label_key: &'static str,
    pub median: Option<f64>,
    pub average: Option<f64>,
    pub fastest: Option<f64>,
    pub slowest: Option<f64>,
    pub percentile90: Option<f64>,
}

impl TimingStep {
    fn empty(kind: TimingStepKind) -> Self {
        Self {
            key: kind,
            label_key: kind.label(),
            median: None,
            average: None,
            fastest: None,
            slowest: None,
            percentile90: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingReport {
    pub steps: Vec<TimingStep>,
}

pub fn timing_stats(records: &[LeadRecord]) -> TimingReport {
    timing_stats_with_limit(records, DEFAULT_MAX_INTERVAL_DAYS)
}

/// Same as [`timing_stats`] with a custom outlier ceiling in days.
pub fn timing_stats_with_limit(records: &[LeadRecord], max_days: u32) -> TimingReport {
    let dated: Vec<(NaiveDate, &LeadRecord)> = dated_records(records);
    if dated.is_empty() {
        return TimingReport::default();
    }

    let steps = TimingStepKind::ALL
        .iter()
        .map(|&kind| {
            let (from_metric, to_metric) = kind.stages();
            let from_units = unit_runs(&dated, from_metric);
            let to_units = unit_runs(&dated, to_metric);
            let intervals = match_intervals(&from_units, &to_units, max_days);
            summarize(kind, intervals)
        })
        .collect();

    TimingReport { steps }
}

fn unit_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.ceil() as u64
    } else {
        0
    }
}

/// `count` consecutive units of one stage dated `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UnitRun {
    date: NaiveDate,
    count: u64,
}

/// Run-length unit stream, dates non-decreasing.
#[derive(Debug)]
struct UnitStream {
    runs: Vec<UnitRun>,
    /// Index of the first unit of each run, followed by the total unit count.
    starts: Vec<u64>,
}

impl UnitStream {
    fn new(runs: Vec<UnitRun>) -> Self {
        let mut starts = Vec::with_capacity(runs.len() + 1);
        let mut total = 0u64;
        starts.push(total);
        for run in &runs {
            total = total.saturating_add(run.count);
            starts.push(total);
        }
        Self { runs, starts }
    }

    fn len(&self) -> u64 {
        self.starts.last().copied().unwrap_or(0)
    }

    /// Index of the first unit dated strictly after `date`.
    fn first_after(&self, date: NaiveDate) -> u64 {
        let run = self.runs.partition_point(|run| run.date <= date);
        self.starts[run]
    }

    /// Run holding unit `index`; requires `index < self.len()`.
    fn run_of(&self, index: u64) -> usize {
        self.starts.partition_point(|&start| start <= index) - 1
    }

    fn date_at(&self, index: u64) -> NaiveDate {
        self.runs[self.run_of(index)].date
    }

    /// `(date, start, end)` pieces covering the unit range `[lo, hi)`.
    fn segments(&self, lo: u64, hi: u64) -> impl Iterator<Item = (NaiveDate, u64, u64)> + '_ {
        let first = if lo < hi {
            self.run_of(lo)
        } else {
            self.runs.len()
        };
        self.runs[first..]
            .iter()
            .zip(&self.starts[first..])
            .map_while(move |(run, &start)| {
                let from = start.max(lo);
                let to = start.saturating_add(run.count).min(hi);
                (from < to).then_some((run.date, from, to))
            })
    }
}

/// Units of `metric` per dated record, in record order.
fn unit_runs(dated: &[(NaiveDate, &LeadRecord)], metric: Metric) -> UnitStream {
    let runs = dated
        .iter()
        .filter_map(|(date, record)| {
            let count = unit_count(record.metric(metric));
            (count > 0).then_some(UnitRun { date: *date, count })
        })
        .collect();
    UnitStream::new(runs)
}

/// Whole-day `(days, count)` intervals for the greedy pairing described in the
/// module docs.
///
/// Within one `from` run the first later `to` index is fixed, so units below
/// it all pair with that single `to` unit and the rest pair positionally.
fn match_intervals(from: &UnitStream, to: &UnitStream, max_days: u32) -> Vec<(i64, u64)> {
    let pairs = from.len().min(to.len());
    let mut intervals = Vec::new();
    let mut push = |from_date: NaiveDate, to_date: NaiveDate, count: u64| {
        let days = time::days_between(from_date, to_date).round().max(0.0) as i64;
        if count > 0 && days <= i64::from(max_days) {
            intervals.push((days, count));
        }
    };

    for (from_date, lo, hi) in from.segments(0, pairs) {
        let cursor = to.first_after(from_date);
        let split = if cursor < to.len() {
            cursor.clamp(lo, hi)
        } else {
            lo
        };
        if split > lo {
            push(from_date, to.date_at(cursor), split - lo);
        }
        for (to_date, start, end) in to.segments(split, hi) {
            push(from_date, to_date, end - start);
        }
    }
    intervals
}

fn summarize(kind: TimingStepKind, mut intervals: Vec<(i64, u64)>) -> TimingStep {
    intervals.retain(|&(_, count)| count > 0);
    if intervals.is_empty() {
        return TimingStep::empty(kind);
    }
    intervals.sort_unstable_by_key(|&(days, _)| days);
    let n: u64 = intervals.iter().map(|&(_, count)| count).sum();
    let sum: i128 = intervals
        .iter()
        .map(|&(days, count)| i128::from(days) * i128::from(count))
        .sum();
    let p90_rank = ((n as f64) * 0.9).floor() as u64;

    let at_rank = |rank: u64| {
        let mut seen = 0u64;
        intervals.iter().find_map(|&(days, count)| {
            seen += count;
            (rank < seen).then_some(days as f64)
        })
    };

    TimingStep {
        key: kind,
        label_key: kind.label(),
        median: at_rank(n / 2),
        average: Some(sum as f64 / n as f64),
        fastest: intervals.first().map(|&(days, _)| days as f64),
        slowest: intervals.last().map(|&(days, _)| days as f64),
        percentile90: at_rank(p90_rank.min(n - 1)),
    }
}
