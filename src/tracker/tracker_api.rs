use crate::tracker::detection::Detection;
use crate::tracker::registry::TrackedObjects;

/// Common interface a driving loop uses to feed frames to a tracker.
///
/// `F` is the frame type the tracker needs for appearance-based prediction;
/// trackers that only look at boxes accept any frame type.
pub trait Tracker<F: ?Sized> {
    /// Error raised by the tracker's observer.
    type Error;

    /// Process one frame.
    ///
    /// `detections` is `None` when the detector did not run on this frame,
    /// and `Some` (possibly empty) when it did.
    fn track(
        &mut self,
        detections: Option<Vec<Detection>>,
        frame: &F,
    ) -> Result<TrackedObjects, Self::Error>;

    /// Number of live tracks.
    fn live_count(&self) -> usize;

    /// How many frames apart the tracker expects detector runs to be.
    fn detect_period(&self) -> u32 {
        1
    }
}
