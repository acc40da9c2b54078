//! Change detection

use super::PersistedState;
use lakeview::Dashboard;

/// Whether the dashboard was modified since this tool last wrote it
///
/// The etag is the only signal; content is not re-hashed on read.
pub fn detect_drift(persisted: &PersistedState, observed: &Dashboard) -> bool {
    persisted.etag != observed.etag
}

/// Whether an update has to push content
///
/// Skipped only when the content is byte-identical to what was last pushed
/// and nobody edited the dashboard in between.
pub fn should_push(persisted_fingerprint: &str, new_fingerprint: &str, drift_observed: bool) -> bool {
    persisted_fingerprint != new_fingerprint || drift_observed
}
