pub mod audio_models;
pub mod config;
pub mod error;
pub mod export_result;
pub mod format;
pub mod state;
