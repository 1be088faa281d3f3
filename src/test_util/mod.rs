//! Utilities for testing dispatch logic without a network or randomness. They are part of the
//!  crate's regular code so that integration tests can use them as well.

pub mod fault_injector;
pub mod graph;
pub mod message;
