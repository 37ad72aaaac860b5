//! freebet-watch: change monitor for a "free bet of the day" page.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod extract;
pub mod fingerprint;
pub mod detect;
pub mod fetch;
pub mod storage;
pub mod notify;
pub mod engine;
