//! Remote telecom capability provider: live client and simulated fallback.

pub mod capability;
pub mod client;
pub mod simulator;

pub use capability::{Capability, CapabilityResponse, Source};
pub use client::{CapabilityHealth, RemoteCapabilityClient};
pub use simulator::SimulatedResponseGenerator;
