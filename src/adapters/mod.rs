//! Adapters Layer
//!
//! Inbound adapters turn store state into watch events; outbound adapters
//! implement the domain ports against concrete storage.

pub mod inbound;
pub mod outbound;
