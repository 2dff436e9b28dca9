//! Hardware-specific tests requiring a real serial device.
//!
//! These tests are ignored by default and require actual hardware to run.
//! They should be run manually with the `--ignored` flag and the
//! `SERIAL_CONSOLE_TEST_PORT` environment variable set.

pub mod real_port_tests;
