//! Domain layer - Core naming rules and port definitions
//!
//! This module defines resource naming and the core traits (ports) that
//! adapters implement, following hexagonal architecture principles.

pub mod naming;
pub mod ports;

pub use naming::*;
pub use ports::*;
