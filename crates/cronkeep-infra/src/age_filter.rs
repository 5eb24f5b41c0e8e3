//! Age-based selection of catalog entries.

use chrono::{DateTime, Utc};
use cronkeep_core::{AgeThreshold, FileEntry};

/// Entries at least `threshold` old, in input order.
///
/// "now" is read once, so every entry is judged against the same cutoff.
pub fn select_older_than(entries: &[FileEntry], threshold: AgeThreshold) -> Vec<FileEntry> {
    select_older_than_at(entries, threshold, Utc::now())
}

/// Same as [`select_older_than`] with an explicit clock.
///
/// An entry is selected iff `now - timestamp >= threshold`; an age of exactly
/// the threshold is selected.
pub fn select_older_than_at(
    entries: &[FileEntry],
    threshold: AgeThreshold,
    now: DateTime<Utc>,
) -> Vec<FileEntry> {
    let cutoff = threshold.as_duration();

    let selected: Vec<FileEntry> = entries
        .iter()
        .filter(|entry| entry.age_at(now) >= cutoff)
        .cloned()
        .collect();

    tracing::debug!(
        threshold = %threshold,
        considered = entries.len(),
        selected = selected.len(),
        "Applied age filter"
    );

    selected
}
