//! Integration module for driving the trackers from a detector.
//!
//! This module provides the detector seam, a builder for detections in the
//! box formats detectors commonly emit, and a reference driving loop.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::DetectionSource;
pub use pipeline::{PipelineError, TrackerPipeline, annotate};
