//! Core data types and decision logic for the TVL monitor.
//!
//! Everything here is free of I/O except the file-backed [`StateStore`].

pub mod change;
pub mod currency;
pub mod state;
pub mod store;

pub use change::*;
pub use currency::*;
pub use state::*;
pub use store::*;
