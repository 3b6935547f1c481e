//! Integration tests for the sirfit-rs library
//!
//! This module organizes all integration tests that test the library as a whole,
//! rather than individual components.

// Invariants of integrated SIR trajectories
pub mod sir_properties;

// The optimizer never evaluates the model outside the parameter bounds
pub mod bounds_respect;

// Fits against synthetic data with known rates
pub mod end_to_end;

// CSV input, JSON configuration and report export
pub mod io;
