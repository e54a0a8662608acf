//! Analysis modules.
//!
//! Statistics, grouping, colour assignment and the engine that ties them
//! together into per-exercise summaries.

pub mod aggregator;
pub mod colors;
pub mod engine;
pub mod grouping;

pub use colors::{ColorAssigner, ColorFamily, Palette, ShadeRange, Thresholds};
pub use engine::AggregationEngine;
