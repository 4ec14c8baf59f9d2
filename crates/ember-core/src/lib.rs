//! Ember Core
//!
//! This crate contains shared utilities for the Ember renderer crates.

pub mod logging;
pub mod math;
pub mod profiling;
