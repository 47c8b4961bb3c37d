use crate::records::{LeadMetrics, LeadRecord};
use crate::time;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    pub iso_date: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: LeadMetrics,
    pub conversion_rate: f64,
    /// Conversion-rate change against the previous calendar row.
    pub delta_from_prev: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySnapshots {
    pub rows: Vec<DailySnapshot>,
}

/// Per-day rollup over parsed dates, ascending.
pub fn daily_snapshots(records: &[LeadRecord]) -> DailySnapshots {
    let mut by_day: BTreeMap<NaiveDate, LeadMetrics> = BTreeMap::new();
    for record in records {
        let Some(date) = record.parsed_date() else {
            continue;
        };
        *by_day.entry(date).or_default() += record.metrics();
    }

    let mut rows = Vec::with_capacity(by_day.len());
    let mut previous_rate: Option<f64> = None;
    for (date, metrics) in by_day {
        let conversion_rate = metrics.conversion_rate();
        rows.push(DailySnapshot {
            iso_date: time::iso_date_key(date),
            date,
            metrics,
            conversion_rate,
            delta_from_prev: previous_rate.map(|prev| conversion_rate - prev),
        });
        previous_rate = Some(conversion_rate);
    }

    DailySnapshots { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lead;

    #[test]
    fn rows_are_sorted_with_deltas() {
        let records = vec![
            lead("03/01/2024").created(4.0).events(2.0).build(),
            lead("01/01/2024").created(10.0).events(1.0).build(),
            lead("1/1/2024").created(10.0).events(1.0).build(),
            lead("bogus").created(99.0).build(),
        ];
        let snapshots = daily_snapshots(&records);
        let keys: Vec<&str> = snapshots.rows.iter().map(|row| row.iso_date.as_str()).collect();
        assert_eq!(keys, vec!["2024-01-01", "2024-01-03"]);

        let first = &snapshots.rows[0];
        assert_eq!(first.metrics.created, 20.0);
        assert_eq!(first.conversion_rate, 10.0);
        assert_eq!(first.delta_from_prev, None);

        let second = &snapshots.rows[1];
        assert_eq!(second.conversion_rate, 50.0);
        assert_eq!(second.delta_from_prev, Some(40.0));
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(daily_snapshots(&[]).rows.is_empty());
    }
}
