//! HTTP surface for the NetCare+ dashboard.
//!
//! Thin handlers over [`NetCareSystem`](crate::NetCareSystem); every route
//! reads or mutates engine state only through the facade.

pub mod error;
pub mod handlers;
pub mod routes;

pub use routes::configure;
