//! Shared utilities for workorder integration tests.
//!
//! - `TestHarness`: isolated input/output directories plus a pipeline wired
//!   to fake adapters, so no GhostPCL, poppler or Tesseract is needed
//! - builders for config values and PDF fixtures

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
