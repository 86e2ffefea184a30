use crate::PostRecord;

/// Oldest first. The sort is stable, so posts sharing a date keep the order
/// they were discovered in.
pub fn sort_chronologically(records: &mut [PostRecord]) {
    records.sort_by_key(|record| record.published_date);
}
