//! Test doubles and data builders

mod sinks;

pub use fixtures::{TestDataFactory, TestScenario};
pub use sinks::{FailingSink, RecordingSink, SlowSink};
