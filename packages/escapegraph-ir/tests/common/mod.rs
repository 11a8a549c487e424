//! Common test utilities for escapegraph-ir
//!
//! Shared program fixtures and assertions for the integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
