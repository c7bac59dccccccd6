//! State module for tracking site pipeline progress
//!
//! Each site's pipeline moves forward through a fixed set of stages and ends
//! in exactly one terminal stage.

mod pipeline_stage;

pub use pipeline_stage::{InvalidTransition, PipelineStage, StageTracker};
