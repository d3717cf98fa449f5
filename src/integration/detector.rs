//! Trait for object detection inference backends.

use image::GrayImage;

use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the trackers.
///
/// # Example
///
/// ```ignore
/// use objtrack_rs::{DetectionSource, Detection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &image::GrayImage) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on one frame and return detections.
    fn detect(&mut self, frame: &GrayImage) -> Result<Vec<Detection>, Self::Error>;

    /// Class names indexed by [`Detection::class_index`], when the model
    /// exposes them.
    fn labels(&self) -> Option<&[String]> {
        None
    }
}
