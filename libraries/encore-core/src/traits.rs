/// Collaborator traits for Encore
use crate::types::ShowId;

/// Receiver of listening-history events
///
/// Playback calls these at well-defined points:
/// - first track of a freshly loaded show starts: `add_to_history` + `mark_partial`
/// - any later track start: `mark_partial` (ignored once the show is completed)
/// - last track ends: `mark_completed`
///
/// Implementations must treat completion as sticky for a show: a later
/// `mark_partial` for a completed show is not a regression to partial.
pub trait HistorySink: Send {
    /// Put the show at the front of the recently played list
    fn add_to_history(&mut self, show: &ShowId);

    /// Record that the show was started but not finished
    fn mark_partial(&mut self, show: &ShowId);

    /// Record that the last track of the show played to the end
    fn mark_completed(&mut self, show: &ShowId);

    /// Flip the favorite flag, returning the new value
    fn toggle_favorite(&mut self, show: &ShowId) -> bool;

    fn is_favorite(&self, show: &ShowId) -> bool;
}

/// Opaque string key-value persistence
///
/// The format of stored values is owned by the caller.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    fn remove(&mut self, key: &str);
}
