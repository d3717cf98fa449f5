//! Nearest-centroid tracker for detectors that run on every frame.

use log::trace;

use crate::tracker::detection::Detection;
use crate::tracker::matching::{self, AssignmentResult, AssignmentStrategy, AssociationMetric};
use crate::tracker::observer::TrackObserver;
use crate::tracker::rect::Rect;
use crate::tracker::registry::{Registry, TrackedObjects};
use crate::tracker::track::Track;
use crate::tracker::tracker_api::Tracker;

/// Configuration for the [`CentroidTracker`].
#[derive(Debug, Clone)]
pub struct CentroidConfig {
    /// Consecutive unmatched frames a track survives; it is removed on the
    /// frame its miss count goes above this value.
    pub deregister_frames: u32,
    pub metric: AssociationMetric,
    pub strategy: AssignmentStrategy,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self {
            deregister_frames: 30,
            metric: AssociationMetric::Centroid,
            strategy: AssignmentStrategy::Greedy,
        }
    }
}

impl CentroidConfig {
    pub fn new(deregister_frames: u32) -> Self {
        Self {
            deregister_frames,
            ..Self::default()
        }
    }
}

/// Tracks objects by matching each frame's detections to the closest
/// existing track.
///
/// Every existing track is matched to some detection as long as detections
/// remain, however far away it is; there is no gating distance.
pub struct CentroidTracker<O: TrackObserver> {
    registry: Registry<()>,
    config: CentroidConfig,
    observer: O,
}

impl<O: TrackObserver> CentroidTracker<O> {
    pub fn new(config: CentroidConfig, observer: O) -> Self {
        Self {
            registry: Registry::new(config.deregister_frames),
            config,
            observer,
        }
    }

    /// Associate this frame's detections with the live tracks and return
    /// every live track with its latest detection.
    pub fn update(&mut self, detections: Vec<Detection>) -> Result<TrackedObjects, O::Error> {
        if self.registry.is_empty() {
            for det in detections {
                self.registry.register(det, (), &mut self.observer)?;
            }
            return Ok(self.registry.snapshot());
        }

        let (track_ids, track_boxes) = self.registry.boxes();
        let det_boxes: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let costs = matching::cost_matrix(&track_boxes, &det_boxes, self.config.metric);

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::assign(&costs, self.config.strategy);

        let mut detections: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();

        for (itrack, idet) in matches {
            let id = track_ids[itrack];
            if let (Some(track), Some(det)) = (self.registry.get_mut(id), detections[idet].take()) {
                trace!("track {} matched at distance {:.2}", id, costs[[itrack, idet]]);
                track.mark_matched(det);
            }
        }

        for itrack in unmatched_tracks {
            self.registry.mark_missed(track_ids[itrack], &mut self.observer)?;
        }

        for idet in unmatched_detections {
            if let Some(det) = detections[idet].take() {
                self.registry.register(det, (), &mut self.observer)?;
            }
        }

        Ok(self.registry.snapshot())
    }

    pub fn config(&self) -> &CentroidConfig {
        &self.config
    }

    pub fn get(&self, id: u64) -> Option<&Track> {
        self.registry.get(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.registry.tracks()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }
}

impl<O: TrackObserver, F: ?Sized> Tracker<F> for CentroidTracker<O> {
    type Error = O::Error;

    /// Frames without a detector run leave every track untouched.
    fn track(
        &mut self,
        detections: Option<Vec<Detection>>,
        _frame: &F,
    ) -> Result<TrackedObjects, O::Error> {
        match detections {
            Some(detections) => self.update(detections),
            None => Ok(self.registry.snapshot()),
        }
    }

    fn live_count(&self) -> usize {
        self.registry.len()
    }
}
