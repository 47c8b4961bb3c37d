//! Typed lead records and the normalization rules applied at the
//! deserialization boundary.
//!
//! Upstream rows come from a spreadsheet export, so every metric column may
//! arrive as a number, a numeric string, an empty string or not at all. The
//! deserializers here coerce those shapes once so the aggregation engines
//! can work with plain `f64` sums and `Option<String>` dimensions.

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::time;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::ops::AddAssign;
use std::sync::Arc;

const FIELD_DATE: &str = "Date";
const FIELD_NAME: &str = "Name";
const FIELD_COUNTRY: &str = "Country";

pub const UNKNOWN_DIMENSION: &str = "Unknown";

const REQUIRED_SAMPLE_FIELDS: [&str; 3] = [FIELD_DATE, FIELD_NAME, FIELD_COUNTRY];
const VALIDATION_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(rename = "Date", default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(rename = "Country", default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(rename = "Source", default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(rename = "Created", default, deserialize_with = "lenient_number")]
    pub created: f64,
    #[serde(rename = "Sent Requests", default, deserialize_with = "lenient_number")]
    pub sent_requests: f64,
    #[serde(rename = "Connected", default, deserialize_with = "lenient_number")]
    pub connected: f64,
    #[serde(rename = "Total replies", default, deserialize_with = "lenient_number")]
    pub total_replies: f64,
    #[serde(rename = "Positive Replies", default, deserialize_with = "lenient_number")]
    pub positive_replies: f64,
    #[serde(rename = "Events Created", default, deserialize_with = "lenient_number")]
    pub events_created: f64,
}

/// The six funnel counters of a record (or a sum of records).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub created: f64,
    pub sent: f64,
    pub connected: f64,
    pub replies: f64,
    pub positive: f64,
    pub events: f64,
}

impl LeadMetrics {
    /// `events / created * 100`, or 0 when nothing was created.
    pub fn conversion_rate(&self) -> f64 {
        percent_or_zero(self.events, self.created)
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Created => self.created,
            Metric::Sent => self.sent,
            Metric::Connected => self.connected,
            Metric::Replies => self.replies,
            Metric::Positive => self.positive,
            Metric::Events => self.events,
        }
    }
}

impl AddAssign for LeadMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.sent += rhs.sent;
        self.connected += rhs.connected;
        self.replies += rhs.replies;
        self.positive += rhs.positive;
        self.events += rhs.events;
    }
}

/// Funnel stage counters in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Created,
    Sent,
    Connected,
    Replies,
    Positive,
    Events,
}

impl Metric {
    pub const FUNNEL_ORDER: [Metric; 6] = [
        Metric::Created,
        Metric::Sent,
        Metric::Connected,
        Metric::Replies,
        Metric::Positive,
        Metric::Events,
    ];
}

/// Grouping dimension for rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    /// The literal `Date` text of the record.
    Day,
    IsoWeek,
    Month,
    Country,
    Source,
    Generator,
}

impl LeadRecord {
    pub fn metrics(&self) -> LeadMetrics {
        LeadMetrics {
            created: self.created,
            sent: self.sent_requests,
            connected: self.connected,
            replies: self.total_replies,
            positive: self.positive_replies,
            events: self.events_created,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        self.metrics().get(metric)
    }

    /// Raw `Date` text, empty when the column is missing.
    pub fn date_text(&self) -> &str {
        self.date.as_deref().unwrap_or("")
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(time::parse_dd_mm_yyyy)
    }

    pub fn generator(&self) -> String {
        normalize_dimension_value(self.name.as_deref(), UNKNOWN_DIMENSION)
    }

    pub fn country_name(&self) -> String {
        normalize_dimension_value(self.country.as_deref(), UNKNOWN_DIMENSION)
    }

    pub fn source_name(&self) -> String {
        normalize_dimension_value(self.source.as_deref(), UNKNOWN_DIMENSION)
    }

    /// Resolves the grouping key for `dimension`.
    ///
    /// Week and month keys need a parseable date and return `None` otherwise;
    /// every other dimension falls back to `"Unknown"`.
    pub fn dimension(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Day => Some(normalize_dimension_value(
                self.date.as_deref(),
                UNKNOWN_DIMENSION,
            )),
            Dimension::IsoWeek => self
                .parsed_date()
                .and_then(time::iso_week)
                .map(|week| week.to_string()),
            Dimension::Month => self.parsed_date().map(time::month_key),
            Dimension::Country => Some(self.country_name()),
            Dimension::Source => Some(self.source_name()),
            Dimension::Generator => Some(self.generator()),
        }
    }
}

/// Trims a dimension value, substituting `fallback` for missing or blank input.
pub fn normalize_dimension_value(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => fallback.to_string(),
    }
}

pub(crate) fn percent_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub(crate) fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Numeric cast used for metric columns: numbers pass through, numeric
/// strings are parsed, booleans count as 0/1, everything else is 0.
pub fn coerce_number(value: &JsonValue) -> f64 {
    let number = match value {
        JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        JsonValue::Bool(true) => 1.0,
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

fn coerce_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_number).unwrap_or(0.0))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_text))
}

/// The exported dataset: `{ "last_updated": ..., "data": [...] }`.
#[derive(Debug, Clone, Default)]
pub struct LeadPayload {
    pub last_updated: Option<String>,
    pub records: Vec<LeadRecord>,
}

impl LeadPayload {
    pub fn from_value(value: JsonValue) -> AnalyticsResult<Self> {
        let JsonValue::Object(mut object) = value else {
            return Err(AnalyticsError::invalid_payload("expected object"));
        };
        let data = object
            .remove("data")
            .ok_or_else(|| AnalyticsError::invalid_payload("missing \"data\" property"))?;
        let JsonValue::Array(rows) = data else {
            return Err(AnalyticsError::invalid_payload("\"data\" must be an array"));
        };
        let last_updated = object.remove("last_updated").and_then(coerce_text);

        if rows.is_empty() {
            tracing::warn!("lead payload data array is empty");
        }

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let JsonValue::Object(fields) = &row else {
                return Err(AnalyticsError::invalid_record(index, "expected object"));
            };
            if index < VALIDATION_SAMPLE_SIZE {
                for field in REQUIRED_SAMPLE_FIELDS {
                    if !fields.contains_key(field) {
                        tracing::warn!(index, field, "lead record missing expected field");
                    }
                }
            }
            let record: LeadRecord = serde_json::from_value(row)
                .map_err(|err| AnalyticsError::invalid_record(index, err.to_string()))?;
            records.push(record);
        }

        Ok(Self {
            last_updated,
            records,
        })
    }

    pub fn into_shared(self) -> Arc<[LeadRecord]> {
        Arc::from(self.records)
    }
}

pub fn parse_payload(raw: &str) -> AnalyticsResult<LeadPayload> {
    let value: JsonValue = serde_json::from_str(raw)?;
    LeadPayload::from_value(value)
}
