//! Case lifecycle and background monitoring engine.

pub mod collector;
pub mod monitor;
pub mod orchestrator;
pub mod system;

pub use collector::NetworkMetricsCollector;
pub use monitor::{CaseMonitor, MonitorHandle};
pub use orchestrator::EmergencyOrchestrator;
pub use system::{ApiStatus, NetCareSystem};
