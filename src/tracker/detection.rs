//! Per-frame detector output consumed by the trackers.

use thiserror::Error;

use crate::tracker::rect::Rect;

/// Reasons a detection fails [`Detection::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("bounding box has non-positive area ({width}x{height})")]
    DegenerateBox { width: f32, height: f32 },
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f32),
}

/// One detected object on one frame.
///
/// Trackers treat detections as immutable values: relabeling or moving a
/// detection produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box in TLWH format
    pub bbox: Rect,
    /// Class label as reported by the detector
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Index of the class in the detector's label table
    pub class_index: usize,
}

impl Detection {
    pub fn new(bbox: Rect, label: impl Into<String>, confidence: f32, class_index: usize) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
            class_index,
        }
    }

    /// Copy of this detection carrying a different label.
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }

    /// Copy of this detection moved to a different box.
    pub fn with_bbox(&self, bbox: Rect) -> Self {
        Self {
            bbox,
            ..self.clone()
        }
    }

    /// Check the detector-boundary preconditions.
    ///
    /// Trackers never call this; degenerate boxes flow through and produce
    /// whatever centroid the arithmetic gives.
    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.bbox.is_degenerate() {
            return Err(DetectionError::DegenerateBox {
                width: self.bbox.width,
                height: self.bbox.height,
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectionError::ConfidenceOutOfRange(self.confidence));
        }
        Ok(())
    }
}
