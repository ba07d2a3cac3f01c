//! Cadence CLI library
//!
//! Pieces of the `cadence` binary that are worth testing on their own.

pub mod display;
pub mod review;
pub mod settings;
