use crate::records::{LeadRecord, Metric};
use crate::services::dated_records;
use crate::time;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgingBucket {
    #[serde(rename = "bucket0to3")]
    Bucket0To3,
    #[serde(rename = "bucket4to7")]
    Bucket4To7,
    #[serde(rename = "bucket8plus")]
    Bucket8Plus,
}

impl AgingBucket {
    pub const ALL: [AgingBucket; 3] = [
        AgingBucket::Bucket0To3,
        AgingBucket::Bucket4To7,
        AgingBucket::Bucket8Plus,
    ];

    pub fn for_age(age_days: i64) -> Self {
        match age_days {
            ..=3 => AgingBucket::Bucket0To3,
            4..=7 => AgingBucket::Bucket4To7,
            _ => AgingBucket::Bucket8Plus,
        }
    }

    pub fn bounds(self) -> (i64, Option<i64>) {
        match self {
            AgingBucket::Bucket0To3 => (0, Some(3)),
            AgingBucket::Bucket4To7 => (4, Some(7)),
            AgingBucket::Bucket8Plus => (8, None),
        }
    }
}

/// Serialized bucket definition; `max` is open for the last bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketDef {
    pub key: AgingBucket,
    pub min: i64,
    pub max: Option<i64>,
}

impl From<AgingBucket> for BucketDef {
    fn from(key: AgingBucket) -> Self {
        let (min, max) = key.bounds();
        Self { key, min, max }
    }
}

/// Stages tracked for aging; `Created` is the origin and is not aged.
pub const AGING_STAGES: [Metric; 5] = [
    Metric::Sent,
    Metric::Connected,
    Metric::Replies,
    Metric::Positive,
    Metric::Events,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketCounts {
    #[serde(rename = "bucket0to3")]
    pub bucket_0_to_3: f64,
    #[serde(rename = "bucket4to7")]
    pub bucket_4_to_7: f64,
    #[serde(rename = "bucket8plus")]
    pub bucket_8_plus: f64,
}

impl BucketCounts {
    fn add(&mut self, bucket: AgingBucket, value: f64) {
        match bucket {
            AgingBucket::Bucket0To3 => self.bucket_0_to_3 += value,
            AgingBucket::Bucket4To7 => self.bucket_4_to_7 += value,
            AgingBucket::Bucket8Plus => self.bucket_8_plus += value,
        }
    }

    pub fn total(&self) -> f64 {
        self.bucket_0_to_3 + self.bucket_4_to_7 + self.bucket_8_plus
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingRow {
    pub stage_key: Metric,
    pub counts: BucketCounts,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgingReport {
    pub buckets: Vec<BucketDef>,
    pub rows: Vec<AgingRow>,
}

/// Buckets stage volumes by age relative to the newest dated record.
pub fn aging_buckets(records: &[LeadRecord]) -> AgingReport {
    let dated = dated_records(records);
    let mut totals = [BucketCounts::default(); AGING_STAGES.len()];

    if let Some(&(max_date, _)) = dated.last() {
        for (date, record) in &dated {
            let age_days = time::days_between(*date, max_date).round().max(0.0) as i64;
            let bucket = AgingBucket::for_age(age_days);
            for (counts, stage) in totals.iter_mut().zip(AGING_STAGES) {
                let value = record.metric(stage);
                if value > 0.0 {
                    counts.add(bucket, value);
                }
            }
        }
    }

    let rows = AGING_STAGES
        .iter()
        .zip(totals)
        .map(|(&stage_key, counts)| AgingRow {
            stage_key,
            counts,
            total: counts.total(),
        })
        .collect();

    AgingReport {
        buckets: AgingBucket::ALL.into_iter().map(BucketDef::from).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lead, LeadBuilder};

    fn row(report: &AgingReport, stage: Metric) -> &AgingRow {
        report
            .rows
            .iter()
            .find(|row| row.stage_key == stage)
            .expect("stage row")
    }

    #[test]
    fn ages_relative_to_latest_record() {
        let records = vec![
            lead("08/01/2024").connected(3.0).build(),
            lead("10/01/2024").sent(1.0).build(),
            lead("05/01/2024").connected(2.0).build(),
            lead("01/01/2024").connected(4.0).events(-2.0).build(),
        ];
        let report = aging_buckets(&records);

        let connected = row(&report, Metric::Connected);
        assert_eq!(connected.counts.bucket_0_to_3, 3.0);
        assert_eq!(connected.counts.bucket_4_to_7, 2.0);
        assert_eq!(connected.counts.bucket_8_plus, 4.0);
        assert_eq!(connected.total, 9.0);

        assert_eq!(row(&report, Metric::Sent).counts.bucket_0_to_3, 1.0);
        assert_eq!(row(&report, Metric::Events).total, 0.0);
    }

    #[test]
    fn empty_input_yields_zero_rows() {
        let report = aging_buckets(&[]);
        assert_eq!(report.rows.len(), 5);
        assert!(report.rows.iter().all(|row| row.total == 0.0));
        let keys: Vec<AgingBucket> = report.buckets.iter().map(|def| def.key).collect();
        assert_eq!(keys, AgingBucket::ALL.to_vec());
    }

    #[test]
    fn undated_records_are_ignored() {
        let records = vec![LeadBuilder::undated().connected(5.0).build()];
        let report = aging_buckets(&records);
        assert_eq!(row(&report, Metric::Connected).total, 0.0);
    }

    #[test]
    fn bucket_boundaries_are_inclusive() {
        assert_eq!(AgingBucket::for_age(0), AgingBucket::Bucket0To3);
        assert_eq!(AgingBucket::for_age(3), AgingBucket::Bucket0To3);
        assert_eq!(AgingBucket::for_age(4), AgingBucket::Bucket4To7);
        assert_eq!(AgingBucket::for_age(7), AgingBucket::Bucket4To7);
        assert_eq!(AgingBucket::for_age(8), AgingBucket::Bucket8Plus);
    }

    #[test]
    fn bucket_bounds_agree_with_classification() {
        for def in aging_buckets(&[]).buckets {
            assert_eq!(AgingBucket::for_age(def.min), def.key);
            if let Some(max) = def.max {
                assert_eq!(AgingBucket::for_age(max), def.key);
                assert_ne!(AgingBucket::for_age(max + 1), def.key);
            }
        }
    }

    #[test]
    fn serializes_bucket_keys() {
        let value = serde_json::to_value(aging_buckets(&[])).expect("serialize");
        assert_eq!(value["buckets"][0]["key"], "bucket0to3");
        assert_eq!(value["buckets"][0]["min"], 0);
        assert_eq!(value["buckets"][0]["max"], 3);
        assert_eq!(value["buckets"][1]["min"], 4);
        assert_eq!(value["buckets"][1]["max"], 7);
        assert_eq!(value["buckets"][2]["key"], "bucket8plus");
        assert_eq!(value["buckets"][2]["min"], 8);
        assert!(value["buckets"][2]["max"].is_null());
        assert_eq!(value["rows"][0]["stageKey"], "sent");
        assert_eq!(value["rows"][0]["counts"]["bucket8plus"], 0.0);
    }
}
