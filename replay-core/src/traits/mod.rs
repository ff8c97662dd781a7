pub mod audio_file_writer;
pub mod capture_provider;
pub mod replay_delegate;
