use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;

use crate::models::error::ReplayError;
use crate::models::export_result::ExportedFile;
use crate::models::state::TriggerState;
use crate::session::exporter::SnapshotExporter;
use crate::traits::replay_delegate::ReplayDelegate;

/// Accepts export requests and runs them on a dedicated worker thread.
///
/// ```text
/// request_export() ──[bounded(1)]──▶ export worker ──▶ SnapshotExporter
///        │                                 │
///        └── Idle → ExportInFlight          └── ExportInFlight → Idle
/// ```
///
/// Only one export runs at a time. A request while one is in flight is
/// rejected with `ReplayError::Busy`; it is not queued.
pub struct TriggerController {
    state: Arc<Mutex<TriggerState>>,
    delegate: Option<Arc<dyn ReplayDelegate>>,
    sender: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl TriggerController {
    pub fn spawn(
        exporter: SnapshotExporter,
        delegate: Option<Arc<dyn ReplayDelegate>>,
    ) -> Result<Self, ReplayError> {
        Self::spawn_with(move || exporter.export_snapshot(), delegate)
    }

    /// Start the worker with an arbitrary export job.
    pub fn spawn_with<F>(mut export: F, delegate: Option<Arc<dyn ReplayDelegate>>) -> Result<Self, ReplayError>
    where
        F: FnMut() -> Result<ExportedFile, ReplayError> + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded::<()>(1);
        let state = Arc::new(Mutex::new(TriggerState::Idle));

        let worker_state = Arc::clone(&state);
        let worker_delegate = delegate.clone();
        let worker = thread::Builder::new()
            .name("replay-export".into())
            .spawn(move || {
                for () in receiver.iter() {
                    match export() {
                        Ok(file) => {
                            if let Some(ref d) = worker_delegate {
                                d.on_export_finished(&file);
                            }
                        }
                        Err(e) => {
                            log::error!("Export failed, capture continues: {}", e);
                            if let Some(ref d) = worker_delegate {
                                d.on_error(&e);
                            }
                        }
                    }

                    // Announce before publishing: no new request can be
                    // accepted (and announced) until the state is idle.
                    if let Some(ref d) = worker_delegate {
                        d.on_trigger_state_changed(TriggerState::Idle);
                    }
                    *worker_state.lock() = TriggerState::Idle;
                }
                log::debug!("Export worker exiting");
            })
            .map_err(|e| ReplayError::ConfigurationError(format!("failed to spawn export worker: {}", e)))?;

        Ok(Self {
            state,
            delegate,
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn state(&self) -> TriggerState {
        *self.state.lock()
    }

    /// Hand an export to the worker. Returns immediately.
    pub fn request_export(&self) -> Result<(), ReplayError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ReplayError::ExportWriteError("export worker has shut down".into()))?;

        {
            let mut state = self.state.lock();
            if state.is_export_in_flight() {
                return Err(ReplayError::Busy);
            }
            *state = TriggerState::ExportInFlight;
        }
        self.notify_state(TriggerState::ExportInFlight);

        let rejected = match sender.try_send(()) {
            Ok(()) => {
                log::info!("Replay triggered");
                return Ok(());
            }
            Err(TrySendError::Full(())) => ReplayError::Busy,
            Err(TrySendError::Disconnected(())) => {
                ReplayError::ExportWriteError("export worker has shut down".into())
            }
        };

        self.notify_state(TriggerState::Idle);
        *self.state.lock() = TriggerState::Idle;
        Err(rejected)
    }

    fn notify_state(&self, state: TriggerState) {
        if let Some(ref d) = self.delegate {
            d.on_trigger_state_changed(state);
        }
    }

    /// Stop accepting requests and wait for a running export to finish.
    pub fn shutdown(&mut self) {
        self.sender = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Export worker panicked");
            }
        }
    }
}

impl Drop for TriggerController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use crossbeam_channel::Receiver;

    use crate::models::format::{CaptureFormat, OutputEncoding, SampleFormat};

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<TriggerState>>,
        exports: Mutex<Vec<PathBuf>>,
        errors: Mutex<Vec<ReplayError>>,
    }

    impl ReplayDelegate for RecordingDelegate {
        fn on_trigger_state_changed(&self, state: TriggerState) {
            self.states.lock().push(state);
        }

        fn on_export_finished(&self, file: &ExportedFile) {
            self.exports.lock().push(file.file_path.clone());
        }

        fn on_error(&self, error: &ReplayError) {
            self.errors.lock().push(error.clone());
        }
    }

    fn fake_export(name: &str) -> ExportedFile {
        ExportedFile {
            file_path: PathBuf::from(name),
            frame_count: 1,
            duration_secs: 1.0,
            capture_format: CaptureFormat {
                sample_rate: 1,
                sample_format: SampleFormat::float(32),
                channel_count: 1,
            },
            encoding: OutputEncoding::Pcm24,
            checksum: String::new(),
            created_at: String::new(),
        }
    }

    /// Export job that blocks until the test releases it.
    fn gated_export(gate: Receiver<()>) -> impl FnMut() -> Result<ExportedFile, ReplayError> + Send + 'static {
        move || {
            gate.recv_timeout(Duration::from_secs(5))
                .map_err(|_| ReplayError::ExportWriteError("gate timed out".into()))?;
            Ok(fake_export("replay.wav"))
        }
    }

    fn wait_for_idle(controller: &TriggerController) {
        for _ in 0..500 {
            if controller.state().is_idle() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("controller never returned to idle");
    }

    #[test]
    fn trigger_while_in_flight_is_busy() {
        let (release, gate) = crossbeam_channel::unbounded();
        let controller = TriggerController::spawn_with(gated_export(gate), None).unwrap();

        controller.request_export().unwrap();
        assert_eq!(controller.state(), TriggerState::ExportInFlight);
        assert_eq!(controller.request_export(), Err(ReplayError::Busy));

        release.send(()).unwrap();
        wait_for_idle(&controller);

        controller.request_export().unwrap();
        release.send(()).unwrap();
        wait_for_idle(&controller);
    }

    #[test]
    fn delegate_sees_full_cycle() {
        let delegate = Arc::new(RecordingDelegate::default());
        let (release, gate) = crossbeam_channel::unbounded();
        let mut controller = TriggerController::spawn_with(
            gated_export(gate),
            Some(delegate.clone() as Arc<dyn ReplayDelegate>),
        )
        .unwrap();

        controller.request_export().unwrap();
        release.send(()).unwrap();
        controller.shutdown();

        assert_eq!(
            *delegate.states.lock(),
            vec![TriggerState::ExportInFlight, TriggerState::Idle]
        );
        assert_eq!(*delegate.exports.lock(), vec![PathBuf::from("replay.wav")]);
        assert!(delegate.errors.lock().is_empty());
    }

    #[test]
    fn state_notifications_alternate_under_rapid_triggers() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut controller = TriggerController::spawn_with(
            || Ok(fake_export("replay.wav")),
            Some(delegate.clone() as Arc<dyn ReplayDelegate>),
        )
        .unwrap();

        let mut accepted = 0;
        for _ in 0..5000 {
            match controller.request_export() {
                Ok(()) => accepted += 1,
                Err(ReplayError::Busy) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        controller.shutdown();

        let states = delegate.states.lock();
        assert_eq!(states.len(), accepted * 2);
        for (i, state) in states.iter().enumerate() {
            let expected = if i % 2 == 0 {
                TriggerState::ExportInFlight
            } else {
                TriggerState::Idle
            };
            assert_eq!(*state, expected, "notification {} out of order", i);
        }
        assert_eq!(controller.state(), TriggerState::Idle);
    }

    #[test]
    fn failed_export_returns_to_idle() {
        let delegate = Arc::new(RecordingDelegate::default());
        let controller = TriggerController::spawn_with(
            || Err(ReplayError::ExportWriteError("disk full".into())),
            Some(delegate.clone() as Arc<dyn ReplayDelegate>),
        )
        .unwrap();

        controller.request_export().unwrap();
        wait_for_idle(&controller);

        // Still accepting triggers after a failure.
        controller.request_export().unwrap();
        wait_for_idle(&controller);
        drop(controller);

        assert_eq!(delegate.errors.lock().len(), 2);
        assert!(delegate.exports.lock().is_empty());
    }

    #[test]
    fn shutdown_waits_for_running_export() {
        let (release, gate) = crossbeam_channel::unbounded();
        let delegate = Arc::new(RecordingDelegate::default());
        let mut controller = TriggerController::spawn_with(
            gated_export(gate),
            Some(delegate.clone() as Arc<dyn ReplayDelegate>),
        )
        .unwrap();

        controller.request_export().unwrap();
        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            release.send(()).unwrap();
        });
        controller.shutdown();
        releaser.join().unwrap();

        assert_eq!(delegate.exports.lock().len(), 1);
        assert!(matches!(
            controller.request_export(),
            Err(ReplayError::ExportWriteError(_))
        ));
    }
}
