use crate::records::LeadRecord;
use std::sync::Arc;

/// Starts a record dated with the given `DD/MM/YYYY` text.
pub fn lead(date: &str) -> LeadBuilder {
    LeadBuilder {
        record: LeadRecord {
            date: Some(date.to_string()),
            ..LeadRecord::default()
        },
    }
}

pub fn shared(records: Vec<LeadRecord>) -> Arc<[LeadRecord]> {
    Arc::from(records)
}

#[derive(Debug, Clone)]
pub struct LeadBuilder {
    record: LeadRecord,
}

impl LeadBuilder {
    pub fn undated() -> Self {
        Self {
            record: LeadRecord::default(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.record.name = Some(name.to_string());
        self
    }

    pub fn country(mut self, country: &str) -> Self {
        self.record.country = Some(country.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.record.source = Some(source.to_string());
        self
    }

    pub fn created(mut self, value: f64) -> Self {
        self.record.created = value;
        self
    }

    pub fn sent(mut self, value: f64) -> Self {
        self.record.sent_requests = value;
        self
    }

    pub fn connected(mut self, value: f64) -> Self {
        self.record.connected = value;
        self
    }

    pub fn replies(mut self, value: f64) -> Self {
        self.record.total_replies = value;
        self
    }

    pub fn positive(mut self, value: f64) -> Self {
        self.record.positive_replies = value;
        self
    }

    pub fn events(mut self, value: f64) -> Self {
        self.record.events_created = value;
        self
    }

    pub fn build(self) -> LeadRecord {
        self.record
    }
}
