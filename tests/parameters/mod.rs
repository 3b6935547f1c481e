//! Integration tests for the parameter system
//!
//! These tests verify that the parameter system behaves correctly in various scenarios.

// Tests for the Parameter struct and bounds transforms
mod parameter_tests;

// Tests for the Parameters collection
mod parameters_tests;
