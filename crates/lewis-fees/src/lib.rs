pub mod catalog;
pub mod config;
pub mod error;
pub mod fees;
pub mod ranking;
pub mod telemetry;
