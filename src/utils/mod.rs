//! Shared utilities for the NetCare+ engine.

pub mod ring;
pub mod rng;

pub use ring::RingBuffer;
pub use rng::SimRng;
