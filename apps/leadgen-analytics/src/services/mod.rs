pub mod aggregation;
pub mod aging;
pub mod cache;
pub mod dashboard;
pub mod funnel;
pub mod insights;
pub mod quality;
pub mod segments;
pub mod timing;

use crate::records::LeadRecord;
use chrono::NaiveDate;

/// Records with a parseable date, stably sorted by that date.
pub(crate) fn dated_records(records: &[LeadRecord]) -> Vec<(NaiveDate, &LeadRecord)> {
    let mut dated: Vec<(NaiveDate, &LeadRecord)> = records
        .iter()
        .filter_map(|record| record.parsed_date().map(|date| (date, record)))
        .collect();
    dated.sort_by_key(|(date, _)| *date);
    dated
}
