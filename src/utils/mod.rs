//! Utility functions and helpers for the sirfit-rs library.

pub mod finite_difference;

pub use finite_difference::{central_jacobian, forward_jacobian};
