use crate::models::error::ReplayError;
use crate::models::export_result::ExportedFile;
use crate::models::state::TriggerState;

/// Event delegate for trigger and export notifications.
///
/// Export results and the return to idle are reported from the export worker
/// thread; the move to export-in-flight from the thread that fired the
/// trigger. Implementations should marshal elsewhere if needed.
pub trait ReplayDelegate: Send + Sync {
    /// Called when the trigger controller changes state.
    fn on_trigger_state_changed(&self, state: TriggerState);

    /// Called after a snapshot has been written to disk.
    fn on_export_finished(&self, file: &ExportedFile);

    /// Called when an export fails. Capture keeps running.
    fn on_error(&self, error: &ReplayError);
}
