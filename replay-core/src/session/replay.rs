use std::sync::Arc;

use crate::models::config::ReplayConfiguration;
use crate::models::error::ReplayError;
use crate::models::format::CaptureFormat;
use crate::models::state::{SessionState, TriggerState};
use crate::negotiation::negotiator;
use crate::processing::ring_buffer::{RingBuffer, WindowReader};
use crate::session::exporter::SnapshotExporter;
use crate::session::trigger::TriggerController;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::replay_delegate::ReplayDelegate;

/// Platform-agnostic instant replay orchestrator.
///
/// Generic over the input backend via the `CaptureProvider` trait:
/// ```text
/// [Provider] → FrameProducer → [RingBuffer] ← WindowReader ← [SnapshotExporter]
///                                                                   ↑
///                                    trigger() → [TriggerController worker]
/// ```
pub struct ReplaySession<P: CaptureProvider> {
    provider: P,
    config: ReplayConfiguration,
    state: SessionState,
    delegate: Option<Arc<dyn ReplayDelegate>>,
    controller: Option<TriggerController>,
    reader: Option<WindowReader>,
}

impl<P: CaptureProvider> ReplaySession<P> {
    pub fn new(provider: P, config: ReplayConfiguration) -> Result<Self, ReplayError> {
        config.validate().map_err(ReplayError::ConfigurationError)?;
        Ok(Self {
            provider,
            config,
            state: SessionState::Idle,
            delegate: None,
            controller: None,
            reader: None,
        })
    }

    /// Must be set before `start()` to receive export events.
    pub fn set_delegate(&mut self, delegate: Arc<dyn ReplayDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &ReplayConfiguration {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Read-only view of the replay window while capturing.
    pub fn window(&self) -> Option<&WindowReader> {
        self.reader.as_ref()
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.controller
            .as_ref()
            .map(TriggerController::state)
            .unwrap_or_default()
    }

    /// Negotiate a format, allocate the window, and start capturing.
    /// Transitions: idle → capturing.
    pub fn start(&mut self) -> Result<CaptureFormat, ReplayError> {
        if !self.state.is_idle() {
            return Err(ReplayError::ConfigurationError(
                "can only start from idle state".into(),
            ));
        }

        let caps = self.provider.capabilities()?;
        let format = negotiator::negotiate(
            &caps,
            &self.config.rate_priorities,
            &self.config.format_priorities,
        )?;
        log::info!("Negotiated {}", format);

        let ring = RingBuffer::for_window(&format, self.config.duration_secs)?;
        log::info!(
            "Allocated {} bytes for a {}s window",
            ring.capacity_bytes(),
            self.config.duration_secs
        );
        let (producer, reader) = ring.split();

        let exporter = SnapshotExporter::new(reader.clone(), format, &self.config)?;
        let controller = TriggerController::spawn(exporter, self.delegate.clone())?;

        // On failure the controller is dropped here, which joins its worker.
        self.provider.start(&format, producer)?;

        self.controller = Some(controller);
        self.reader = Some(reader);
        self.state = SessionState::Capturing { format };
        log::info!("Capturing from {}", self.provider.device_info().name);
        Ok(format)
    }

    /// Export the current window in the background.
    pub fn trigger(&self) -> Result<(), ReplayError> {
        match self.controller {
            Some(ref controller) if self.state.is_capturing() => controller.request_export(),
            _ => Err(ReplayError::ConfigurationError("not capturing".into())),
        }
    }

    /// Stop capturing and wait for an in-flight export to finish.
    /// Transitions: capturing → stopped.
    pub fn stop(&mut self) -> Result<(), ReplayError> {
        if !self.state.is_capturing() {
            return Err(ReplayError::ConfigurationError(
                "can only stop from capturing state".into(),
            ));
        }

        let stopped = self.provider.stop();
        if let Some(mut controller) = self.controller.take() {
            controller.shutdown();
        }
        self.reader = None;
        self.state = SessionState::Stopped;
        log::info!("Capture stopped");
        stopped
    }
}

impl<P: CaptureProvider> Drop for ReplaySession<P> {
    fn drop(&mut self) {
        if self.state.is_capturing() {
            if let Err(e) = self.stop() {
                log::warn!("Failed to stop capture cleanly: {}", e);
            }
        }
    }
}
