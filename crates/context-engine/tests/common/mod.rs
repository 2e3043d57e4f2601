//! Shared test utilities for context-engine integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a service over in-process backends
//! - Builders for PDF uploads and configurations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
