//! TrackerPipeline for combining detection with tracking.

use image::GrayImage;
use log::debug;
use thiserror::Error;

use crate::tracker::{TrackedObjects, Tracker};

use super::DetectionSource;

/// Failure while processing a frame through a [`TrackerPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError<D, O> {
    #[error("detector failed")]
    Detection(#[source] D),
    #[error("track observer failed")]
    Observer(#[source] O),
}

/// Relabel every tracked detection as `"{id}: {class label}"`.
///
/// The class label comes from `labels[class_index]` when available, so
/// feeding already-annotated detections back in does not stack ID prefixes.
/// The input is left untouched.
pub fn annotate(objects: &TrackedObjects, labels: Option<&[String]>) -> TrackedObjects {
    objects
        .iter()
        .map(|(&id, det)| {
            let class_label = labels
                .and_then(|labels| labels.get(det.class_index))
                .map_or(det.label.as_str(), String::as_str);
            (id, det.with_label(format!("{id}: {class_label}")))
        })
        .collect()
}

/// A driving loop that bundles a detector with a tracker.
///
/// The detector runs on the first frame and then once every
/// [`Tracker::detect_period`] frames; the frames in between are handed to
/// the tracker without detections.
pub struct TrackerPipeline<D: DetectionSource, T: Tracker<GrayImage>> {
    detector: D,
    tracker: T,
    min_confidence: f32,
    frame_index: u64,
}

impl<D: DetectionSource, T: Tracker<GrayImage>> TrackerPipeline<D, T> {
    /// Create a new pipeline that keeps detections with confidence of at least 0.5.
    pub fn new(detector: D, tracker: T) -> Self {
        Self {
            detector,
            tracker,
            min_confidence: 0.5,
            frame_index: 0,
        }
    }

    /// Set the confidence below which detections are dropped before tracking.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Whether the next call to [`process_frame`](Self::process_frame) runs the detector.
    pub fn is_detect_frame(&self) -> bool {
        let period = self.tracker.detect_period().max(1) as u64;
        self.frame_index % period == 0
    }

    /// Process a single frame and return the live tracks, annotated with their IDs.
    pub fn process_frame(
        &mut self,
        frame: &GrayImage,
    ) -> Result<TrackedObjects, PipelineError<D::Error, T::Error>> {
        let detections = if self.is_detect_frame() {
            let mut detections = self
                .detector
                .detect(frame)
                .map_err(PipelineError::Detection)?;
            let total = detections.len();
            detections.retain(|d| d.confidence >= self.min_confidence);
            debug!(
                "frame {}: {} detections, {} above confidence {}",
                self.frame_index,
                total,
                detections.len(),
                self.min_confidence
            );
            Some(detections)
        } else {
            None
        };
        self.frame_index += 1;

        let objects = self
            .tracker
            .track(detections, frame)
            .map_err(PipelineError::Observer)?;
        Ok(annotate(&objects, self.detector.labels()))
    }

    /// Number of frames processed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{
        CentroidConfig, CentroidTracker, CorrelationConfig, CorrelationTracker, Detection, EventLog,
        Rect,
    };
    use image::Luma;

    #[derive(Debug, Error)]
    #[error("camera unplugged")]
    struct Unplugged;

    struct MockDetector {
        detections: Vec<Detection>,
        calls: usize,
        labels: Vec<String>,
        fail: bool,
    }

    impl MockDetector {
        fn new(detections: Vec<Detection>) -> Self {
            Self {
                detections,
                calls: 0,
                labels: vec!["person".to_string(), "bicycle".to_string()],
                fail: false,
            }
        }
    }

    impl DetectionSource for MockDetector {
        type Error = Unplugged;

        fn detect(&mut self, _frame: &GrayImage) -> Result<Vec<Detection>, Self::Error> {
            self.calls += 1;
            if self.fail {
                return Err(Unplugged);
            }
            Ok(self.detections.clone())
        }

        fn labels(&self) -> Option<&[String]> {
            Some(self.labels.as_slice())
        }
    }

    fn bike(x: f32, confidence: f32) -> Detection {
        Detection::new(Rect::new(x, 10.0, 12.0, 12.0), "1: bicycle", confidence, 1)
    }

    fn frame() -> GrayImage {
        GrayImage::from_fn(64, 64, |x, y| Luma([((x * 73 + y * 151) ^ (x * y)) as u8]))
    }

    #[test]
    fn test_centroid_pipeline_annotates_labels() {
        let detector = MockDetector::new(vec![bike(5.0, 0.9), bike(40.0, 0.3)]);
        let tracker = CentroidTracker::new(CentroidConfig::default(), EventLog::new());
        let mut pipeline = TrackerPipeline::new(detector, tracker);

        let objects = pipeline.process_frame(&frame()).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[&1].label, "1: bicycle");

        // Annotation does not feed back into the tracker's state.
        let objects = pipeline.process_frame(&frame()).unwrap();
        assert_eq!(objects[&1].label, "1: bicycle");
        let stored = pipeline.tracker().get(1).map(|t| t.last_detection().label.clone());
        assert_eq!(stored, Some("1: bicycle".to_string()));
        assert_eq!(pipeline.detector().calls, 2);
    }

    #[test]
    fn test_correlation_pipeline_detects_every_period() {
        let detector = MockDetector::new(vec![bike(20.0, 0.9)]);
        let config = CorrelationConfig::for_detect_period(3, 2);
        let tracker = CorrelationTracker::new(config, EventLog::new()).unwrap();
        let mut pipeline = TrackerPipeline::new(detector, tracker);

        let detect_frames: Vec<bool> = (0..7)
            .map(|_| {
                let detect = pipeline.is_detect_frame();
                pipeline.process_frame(&frame()).unwrap();
                detect
            })
            .collect();

        assert_eq!(detect_frames, vec![true, false, false, true, false, false, true]);
        assert_eq!(pipeline.detector().calls, 3);
        assert_eq!(pipeline.frame_index(), 7);
        assert_eq!(pipeline.tracker().observer().entered(), vec![1]);
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut detector = MockDetector::new(vec![]);
        detector.fail = true;
        let tracker = CentroidTracker::new(CentroidConfig::default(), EventLog::new());
        let mut pipeline = TrackerPipeline::new(detector, tracker);

        let err = pipeline.process_frame(&frame()).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(Unplugged)));
        assert_eq!(err.to_string(), "detector failed");
    }

    #[test]
    fn test_annotate_without_labels_uses_detection_label() {
        let mut objects = TrackedObjects::new();
        objects.insert(4, Detection::new(Rect::default(), "cat", 0.6, 15));

        let annotated = annotate(&objects, None);
        assert_eq!(annotated[&4].label, "4: cat");
        assert_eq!(objects[&4].label, "cat");
    }
}
