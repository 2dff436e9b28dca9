//! End-to-end tests for the serial web console.
//!
//! These tests run the real worker, store and router against mock devices,
//! covering the path from bytes on the wire to JSON served over HTTP.

pub mod discovery_tests;
pub mod http_api_tests;
pub mod workflow_tests;
