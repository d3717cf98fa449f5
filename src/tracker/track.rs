//! Single tracked object.

use nalgebra::Point2;

use crate::tracker::detection::Detection;
use crate::tracker::rect::Rect;

/// One tracked object identity.
///
/// `P` is the per-track position predictor: `()` for centroid tracking,
/// a [`CorrelationFilter`](crate::tracker::CorrelationFilter) for
/// correlation tracking.
#[derive(Debug, Clone)]
pub struct Track<P = ()> {
    id: u64,
    bbox: Rect,
    missed_count: u32,
    last_detection: Detection,
    predictor: P,
}

impl<P> Track<P> {
    pub(crate) fn new(id: u64, detection: Detection, predictor: P) -> Self {
        Self {
            id,
            bbox: detection.bbox,
            missed_count: 0,
            last_detection: detection,
            predictor,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current box: the last matched one, or the last prediction.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn centroid(&self) -> Point2<f32> {
        self.bbox.centroid()
    }

    /// Failed association attempts since the last match.
    pub fn missed_count(&self) -> u32 {
        self.missed_count
    }

    /// Most recent detection matched to this track, as the detector reported it.
    pub fn last_detection(&self) -> &Detection {
        &self.last_detection
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// The detection reported for this track, placed at the current box.
    pub fn current_detection(&self) -> Detection {
        if self.bbox == self.last_detection.bbox {
            self.last_detection.clone()
        } else {
            self.last_detection.with_bbox(self.bbox)
        }
    }

    /// Record a successful association.
    pub(crate) fn mark_matched(&mut self, detection: Detection) {
        self.bbox = detection.bbox;
        self.last_detection = detection;
        self.missed_count = 0;
    }

    /// Record a failed association and return the new miss count.
    pub(crate) fn mark_missed(&mut self) -> u32 {
        self.missed_count = self.missed_count.saturating_add(1);
        self.missed_count
    }

    pub(crate) fn set_bbox(&mut self, bbox: Rect) {
        self.bbox = bbox;
    }

    pub(crate) fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32) -> Detection {
        Detection::new(Rect::new(x, 0.0, 10.0, 10.0), "person", 0.9, 0)
    }

    #[test]
    fn test_miss_then_match_resets() {
        let mut track = Track::new(1, det(0.0), ());
        assert_eq!(track.mark_missed(), 1);
        assert_eq!(track.mark_missed(), 2);

        track.mark_matched(det(4.0));
        assert_eq!(track.missed_count(), 0);
        assert_eq!(track.bbox().x, 4.0);
        assert_eq!(track.last_detection().bbox.x, 4.0);
    }

    #[test]
    fn test_current_detection_follows_prediction() {
        let mut track = Track::new(1, det(0.0), ());
        track.set_bbox(Rect::new(3.0, 1.0, 10.0, 10.0));

        let current = track.current_detection();
        assert_eq!(current.bbox, Rect::new(3.0, 1.0, 10.0, 10.0));
        assert_eq!(current.label, "person");
        assert_eq!(track.last_detection().bbox.x, 0.0);
    }
}
