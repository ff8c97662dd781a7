//! # replay-cpal
//!
//! cpal input backend for replay-core.
//!
//! Provides:
//! - `CpalInputCapture`: capture from any input device cpal can open
//! - `DeviceEnumerator`: input and output device listing
//! - `signal`: SIGUSR1 trigger and SIGINT/SIGTERM shutdown flags
//!
//! ## Usage
//! ```ignore
//! use replay_cpal::{CpalInputCapture, DeviceEnumerator};
//! use replay_core::{ReplayConfiguration, ReplaySession};
//!
//! let devices = DeviceEnumerator::new();
//! let input = CpalInputCapture::new(devices.default_input_device()?, true);
//! let mut session = ReplaySession::new(input, ReplayConfiguration::default())?;
//! session.start()?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;
pub mod signal;

pub use cpal_input::{CpalInputCapture, GapDetector};
pub use device_enumerator::DeviceEnumerator;
