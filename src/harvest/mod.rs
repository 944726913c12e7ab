//! Run orchestration: normalization, failure containment, reporting.

pub mod breaker;
pub mod normalizer;
pub mod runner;

pub use breaker::CircuitBreaker;
pub use runner::{HarvestRunner, RunReport};
