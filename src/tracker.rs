mod centroid;
mod correlation;
mod correlation_filter;
mod detection;
mod matching;
mod observer;
mod rect;
mod registry;
mod track;
mod tracker_api;

pub use centroid::{CentroidConfig, CentroidTracker};
pub use correlation::{
    ConfigError, CorrelationConfig, CorrelationTracker, DEFAULT_DEREGISTER_MARGIN,
    min_safe_deregister_frames,
};
pub use correlation_filter::{CorrelationFilter, FilterParams, Prediction, luma_array};
pub use detection::{Detection, DetectionError};
pub use matching::{
    AssignmentResult, AssignmentStrategy, AssociationMetric, assign, cost_matrix, greedy_assignment,
    linear_assignment,
};
pub use observer::{ChannelObserver, EventLog, FnObserver, NoopObserver, TrackEvent, TrackObserver};
pub use rect::{Rect, centroid_distance};
pub use registry::TrackedObjects;
pub use track::Track;
pub use tracker_api::Tracker;
