//! Remuxer - lossless container remuxing with timestamp repair
//!
//! This library crate exposes the CLI building blocks for integration testing.

pub mod batch;
pub mod config;
