//! Common utilities shared by the tracking service and the offline cache.

#![warn(clippy::pedantic)]

/// Module for shared configuration
pub mod config;

/// Module for tracing subscriber setup
pub mod logging;

/// Module for secret types that prevent accidental logging
pub mod secret;
