//! Tracker for detectors that only run every Nth frame.
//!
//! On detect frames, detections are associated with tracks exactly as in
//! [`CentroidTracker`](crate::tracker::CentroidTracker), and every matched
//! track re-seeds its correlation filter from the new box. On the frames in
//! between, each track's filter predicts where the object moved using only
//! the image.

use image::GrayImage;
use log::{debug, trace};
use ndarray::Array2;
use thiserror::Error;

use crate::tracker::correlation_filter::{CorrelationFilter, FilterParams, luma_array};
use crate::tracker::detection::Detection;
use crate::tracker::matching::{self, AssignmentResult, AssignmentStrategy, AssociationMetric};
use crate::tracker::observer::TrackObserver;
use crate::tracker::rect::Rect;
use crate::tracker::registry::{Registry, TrackedObjects};
use crate::tracker::track::Track;
use crate::tracker::tracker_api::Tracker;

/// Extra detect frames added on top of the detection interval by
/// [`CorrelationConfig::default`].
pub const DEFAULT_DEREGISTER_MARGIN: u32 = 5;

/// Invalid [`CorrelationConfig`] values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_objects must be at least 1")]
    ZeroCapacity,
    #[error("detect_period must be at least 1")]
    ZeroDetectPeriod,
    #[error("deregister_frames ({deregister_frames}) is below the detect period ({detect_period})")]
    DeregisterBelowDetectPeriod { deregister_frames: u32, detect_period: u32 },
    #[error("learning_rate {0} is outside [0, 1]")]
    LearningRateOutOfRange(f32),
}

/// Smallest `deregister_frames` accepted for a given detection interval.
///
/// `deregister_frames` counts failed detect frames, not video frames, so any
/// value keeps a track alive across silent frames. The floor of one full
/// interval keeps the threshold sized as `detect_period + margin`, which stays
/// safe if the same value is used by a tracker that ages tracks on every video
/// frame. [`CorrelationConfig::frames_until_deregistered`] gives the resulting
/// tolerance in video frames.
pub const fn min_safe_deregister_frames(detect_period: u32) -> u32 {
    detect_period
}

/// Configuration for the [`CorrelationTracker`].
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Failed detect-frame associations a track survives; it is removed on
    /// the detect frame its miss count goes above this value.
    pub deregister_frames: u32,
    /// Hard cap on concurrently live tracks.
    pub max_objects: usize,
    /// The detector runs on one frame out of every `detect_period`.
    pub detect_period: u32,
    pub filter: FilterParams,
    pub metric: AssociationMetric,
    pub strategy: AssignmentStrategy,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self::for_detect_period(10, DEFAULT_DEREGISTER_MARGIN)
    }
}

impl CorrelationConfig {
    /// Size `deregister_frames` as `detect_period + margin`.
    pub fn for_detect_period(detect_period: u32, margin: u32) -> Self {
        Self {
            deregister_frames: detect_period.saturating_add(margin),
            max_objects: 10,
            detect_period,
            filter: FilterParams::default(),
            metric: AssociationMetric::Centroid,
            strategy: AssignmentStrategy::Greedy,
        }
    }

    pub fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    /// Frames of absence, counted in video frames, before a track that
    /// stopped matching is removed.
    pub fn frames_until_deregistered(&self) -> u64 {
        (self.deregister_frames as u64 + 1) * self.detect_period as u64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_objects == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.detect_period == 0 {
            return Err(ConfigError::ZeroDetectPeriod);
        }
        if self.deregister_frames < min_safe_deregister_frames(self.detect_period) {
            return Err(ConfigError::DeregisterBelowDetectPeriod {
                deregister_frames: self.deregister_frames,
                detect_period: self.detect_period,
            });
        }
        if !(0.0..=1.0).contains(&self.filter.learning_rate) {
            return Err(ConfigError::LearningRateOutOfRange(self.filter.learning_rate));
        }
        Ok(())
    }
}

/// Tracks objects across detector silence with per-track correlation filters.
///
/// Registration is refused without notice once `max_objects` tracks are live.
pub struct CorrelationTracker<O: TrackObserver> {
    registry: Registry<CorrelationFilter>,
    config: CorrelationConfig,
    observer: O,
}

impl<O: TrackObserver> CorrelationTracker<O> {
    pub fn new(config: CorrelationConfig, observer: O) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: Registry::new(config.deregister_frames),
            config,
            observer,
        })
    }

    /// Process one frame. A non-empty `detections` marks a detect frame; an
    /// empty one means the detector did not run and every track is advanced
    /// by its filter instead.
    ///
    /// Use [`update_detected`](Self::update_detected) for a detect frame on
    /// which the detector found nothing.
    pub fn update(
        &mut self,
        detections: Vec<Detection>,
        frame: &GrayImage,
    ) -> Result<TrackedObjects, O::Error> {
        if detections.is_empty() {
            Ok(self.predict(frame))
        } else {
            self.update_detected(detections, frame)
        }
    }

    /// Associate a detect frame's detections with the live tracks.
    ///
    /// Tracks left unmatched count a miss, even when `detections` is empty.
    pub fn update_detected(
        &mut self,
        detections: Vec<Detection>,
        frame: &GrayImage,
    ) -> Result<TrackedObjects, O::Error> {
        let luma = luma_array(frame);

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
                let bbox = det.bbox;
                track.mark_matched(det);
                track.predictor_mut().reseed(&luma, &bbox);
            }
        }

        for itrack in unmatched_tracks {
            self.registry.mark_missed(track_ids[itrack], &mut self.observer)?;
        }

        for idet in unmatched_detections {
            if let Some(det) = detections[idet].take() {
                self.try_register(det, &luma)?;
            }
        }

        Ok(self.registry.snapshot())
    }

    /// Advance every track by its correlation filter without detections.
    ///
    /// Miss counts are left alone: nothing was attempted, so nothing failed.
    pub fn predict(&mut self, frame: &GrayImage) -> TrackedObjects {
        if !self.registry.is_empty() {
            let luma = luma_array(frame);
            for track in self.registry.tracks_mut() {
                let bbox = track.bbox();
                let prediction = track.predictor_mut().step(&luma, &bbox);
                trace!(
                    "track {} predicted with response {:.3}",
                    track.id(),
                    prediction.response
                );
                track.set_bbox(prediction.bbox);
            }
        }
        self.registry.snapshot()
    }

    fn try_register(
        &mut self,
        detection: Detection,
        luma: &Array2<f32>,
    ) -> Result<Option<u64>, O::Error> {
        if self.registry.len() >= self.config.max_objects {
            debug!(
                "at capacity ({} tracks), not registering {}",
                self.config.max_objects, detection.label
            );
            return Ok(None);
        }
        let filter = CorrelationFilter::seed(luma, &detection.bbox, self.config.filter);
        self.registry.register(detection, filter, &mut self.observer).map(Some)
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    pub fn get(&self, id: u64) -> Option<&Track<CorrelationFilter>> {
        self.registry.get(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track<CorrelationFilter>> {
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

impl<O: TrackObserver> Tracker<GrayImage> for CorrelationTracker<O> {
    type Error = O::Error;

    fn track(
        &mut self,
        detections: Option<Vec<Detection>>,
        frame: &GrayImage,
    ) -> Result<TrackedObjects, O::Error> {
        match detections {
            Some(detections) => self.update_detected(detections, frame),
            None => Ok(self.predict(frame)),
        }
    }

    fn live_count(&self) -> usize {
        self.registry.len()
    }

    fn detect_period(&self) -> u32 {
        self.config.detect_period
    }
}
