//! Test utilities for blobbench and its blob client.
//!
//! This crate provides utilities to facilitate testing of the benchmark harness. See the modules
//! for all available utilities.

pub mod store;
pub mod tracing;
