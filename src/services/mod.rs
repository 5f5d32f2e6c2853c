//! Background services: token discovery and position exits

pub mod discovery;
pub mod position_monitor;

pub use discovery::{log_report, Discovery, DiscoveryReport, EntrySettings};
pub use position_monitor::{MonitorReport, PositionMonitor};
