//! Shared testing utilities for the dialer workspace
//!
//! Provides an in-memory store implementing every repository trait over a
//! single mutex (so the compound updates are genuinely atomic, which the
//! race tests rely on) and fluent builders for test entities.

pub mod builders;
pub mod mocks;

pub use builders::{AgentBuilder, CallBuilder, LeadBuilder};
pub use mocks::MemoryStore;
