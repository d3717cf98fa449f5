//! Track registry and the registration/deregistration policy shared by both trackers.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::tracker::detection::Detection;
use crate::tracker::observer::TrackObserver;
use crate::tracker::rect::Rect;
use crate::tracker::track::Track;

/// Live track IDs mapped to the detection currently associated with each.
pub type TrackedObjects = BTreeMap<u64, Detection>;

/// Owns every live track and fires lifecycle notifications.
#[derive(Debug, Clone)]
pub(crate) struct Registry<P> {
    tracks: HashMap<u64, Track<P>>,
    next_id: u64,
    deregister_frames: u32,
}

impl<P> Registry<P> {
    pub fn new(deregister_frames: u32) -> Self {
        Self {
            tracks: HashMap::new(),
            next_id: 1,
            deregister_frames,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Track<P>> {
        self.tracks.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Track<P>> {
        self.tracks.get_mut(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track<P>> {
        self.tracks.values()
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track<P>> {
        self.tracks.values_mut()
    }

    /// Live IDs with their current boxes, ordered by ID so that rows of a
    /// cost matrix are stable from frame to frame.
    pub fn boxes(&self) -> (Vec<u64>, Vec<Rect>) {
        let mut entries: Vec<(u64, Rect)> =
            self.tracks.values().map(|t| (t.id(), t.bbox())).collect();
        entries.sort_by_key(|&(id, _)| id);
        entries.into_iter().unzip()
    }

    /// Create a track for `detection` and notify the observer.
    ///
    /// The track is inserted before the observer runs, so it stays
    /// registered even when the notification fails.
    pub fn register<O: TrackObserver>(
        &mut self,
        detection: Detection,
        predictor: P,
        observer: &mut O,
    ) -> Result<u64, O::Error> {
        let id = self.next_id;
        self.next_id += 1;

        debug!("registering track {} ({})", id, detection.label);
        let track = Track::new(id, detection, predictor);
        let detection = track.last_detection().clone();
        self.tracks.insert(id, track);

        observer.on_enter(id, &detection)?;
        Ok(id)
    }

    /// Count a failed association for `id`, deregistering the track once
    /// its miss count exceeds the threshold. Returns whether it was removed.
    pub fn mark_missed<O: TrackObserver>(
        &mut self,
        id: u64,
        observer: &mut O,
    ) -> Result<bool, O::Error> {
        let Some(track) = self.tracks.get_mut(&id) else {
            return Ok(false);
        };
        if track.mark_missed() <= self.deregister_frames {
            return Ok(false);
        }
        self.deregister(id, observer)
    }

    fn deregister<O: TrackObserver>(
        &mut self,
        id: u64,
        observer: &mut O,
    ) -> Result<bool, O::Error> {
        let Some(track) = self.tracks.remove(&id) else {
            return Ok(false);
        };
        debug!(
            "deregistering track {} ({}) after {} missed frames",
            id,
            track.last_detection().label,
            track.missed_count()
        );
        observer.on_exit(id, track.last_detection())?;
        Ok(true)
    }

    pub fn snapshot(&self) -> TrackedObjects {
        self.tracks
            .values()
            .map(|t| (t.id(), t.current_detection()))
            .collect()
    }
}
