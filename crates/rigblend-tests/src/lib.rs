//! Integration test suite for rigblend.
//!
//! End-to-end scenarios, solver-wide properties under randomized snapshots,
//! and concurrent solving against live model edits.

pub mod helpers;
