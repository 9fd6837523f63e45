//! service-core: Shared infrastructure for the payment platform services.
pub mod error;
pub mod extract;
pub mod middleware;
