use crate::records::{LeadRecord, Metric};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunnelSummary {
    pub created: f64,
    pub sent_requests: f64,
    pub connected: f64,
    pub replies: f64,
    pub positive_replies: f64,
    pub events: f64,
}

impl FunnelSummary {
    pub fn stage(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Created => self.created,
            Metric::Sent => self.sent_requests,
            Metric::Connected => self.connected,
            Metric::Replies => self.replies,
            Metric::Positive => self.positive_replies,
            Metric::Events => self.events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub stage: Metric,
    pub value: f64,
    pub dropoff: f64,
    pub dropoff_pct: Option<f64>,
    pub cumulative_pct: Option<f64>,
}

pub fn funnel_summary(records: &[LeadRecord]) -> FunnelSummary {
    let mut summary = FunnelSummary::default();
    for record in records {
        summary.created += record.created;
        summary.sent_requests += record.sent_requests;
        summary.connected += record.connected;
        summary.replies += record.total_replies;
        summary.positive_replies += record.positive_replies;
        summary.events += record.events_created;
    }
    summary
}

/// Stage-to-stage losses for the six funnel stages.
pub fn funnel_dropoff(summary: &FunnelSummary) -> Vec<FunnelStage> {
    let created = summary.created;
    let mut previous: Option<f64> = None;
    Metric::FUNNEL_ORDER
        .iter()
        .map(|&stage| {
            let value = summary.stage(stage);
            let (dropoff, dropoff_pct) = match previous {
                None => (0.0, None),
                Some(prev) => {
                    let dropoff = (prev - value).max(0.0);
                    let pct = (prev > 0.0).then(|| dropoff / prev * 100.0);
                    (dropoff, pct)
                }
            };
            previous = Some(value);
            FunnelStage {
                stage,
                value,
                dropoff,
                dropoff_pct,
                cumulative_pct: (created > 0.0).then(|| value / created * 100.0),
            }
        })
        .collect()
}
