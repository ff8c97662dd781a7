use super::format::CaptureFormat;

/// Trigger controller state machine.
///
/// ```text
/// idle → export in flight → idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    ExportInFlight,
}

impl TriggerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_export_in_flight(&self) -> bool {
        matches!(self, Self::ExportInFlight)
    }
}

/// Replay session lifecycle.
///
/// ```text
/// idle → capturing → stopped
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing { format: CaptureFormat },
    Stopped,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing { .. })
    }

    /// The negotiated format while capturing.
    pub fn format(&self) -> Option<&CaptureFormat> {
        match self {
            Self::Capturing { format } => Some(format),
            _ => None,
        }
    }
}
