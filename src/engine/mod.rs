//! Core engine: the fetch → extract → classify → persist → notify run.

pub mod monitor;

pub use monitor::{Monitor, RunOutcome, RunPhase, RunReport};
