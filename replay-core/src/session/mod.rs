pub mod exporter;
pub mod replay;
pub mod trigger;
