// src/scenario/mod.rs

//! Tests and their results.

pub mod results;

pub use results::{Report, ResultSink, TestReport, TriggerReport};
pub use test::{StopCallback, Test};
