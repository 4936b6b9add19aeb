//! External data sources for the TVL monitor.
//!
//! ## Architecture
//!
//! - `tvl` - DeFiLlama protocol endpoint, one attempt per call
//! - `retry` - bounded retry around any [`MetricSource`]
//! - `recipients` - notification recipient list (header row dropped)

pub mod error;
pub mod recipients;
pub mod retry;
pub mod tvl;

pub use error::*;
pub use recipients::*;
pub use retry::*;
pub use tvl::*;
