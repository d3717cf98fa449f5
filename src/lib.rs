//! Stable identities for objects detected across video frames.
//!
//! Two trackers share one lifecycle contract:
//!
//! - [`CentroidTracker`] matches every frame's detections to the nearest
//!   existing track and expects the detector to run on every frame.
//! - [`CorrelationTracker`] only associates on detect frames and carries
//!   each track through the frames in between with a visual correlation
//!   filter.
//!
//! Both notify a [`TrackObserver`] exactly once when a track is registered
//! and once when it is deregistered.
//!
//! ```
//! use objtrack_rs::{CentroidConfig, CentroidTracker, Detection, EventLog, Rect};
//!
//! let mut tracker = CentroidTracker::new(CentroidConfig::new(2), EventLog::new());
//! let person = Detection::new(Rect::new(0.0, 0.0, 20.0, 40.0), "person", 0.9, 0);
//!
//! let objects = tracker.update(vec![person]).unwrap();
//! assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![1]);
//!
//! for _ in 0..3 {
//!     tracker.update(vec![]).unwrap();
//! }
//! assert!(tracker.is_empty());
//! assert_eq!(tracker.observer().exited(), vec![1]);
//! ```

pub mod integration;
pub mod tracker;

pub use integration::{
    DetectionBuilder, DetectionSource, PipelineError, TrackerPipeline, annotate,
};
pub use tracker::{
    AssignmentStrategy, AssociationMetric, CentroidConfig, CentroidTracker, ChannelObserver,
    ConfigError, CorrelationConfig, CorrelationTracker, Detection, DetectionError, EventLog,
    FnObserver, NoopObserver, Rect, Track, TrackEvent, TrackObserver, TrackedObjects, Tracker,
};
