//! Enter/exit notifications for track lifecycle transitions.

use std::convert::Infallible;
use std::marker::PhantomData;

use crossbeam_channel::{SendError, Sender};

use crate::tracker::detection::Detection;

/// Receives lifecycle transitions from a tracker.
///
/// Both methods are invoked synchronously from inside `update`. An error
/// aborts the rest of that frame and is returned to the caller of `update`
/// unchanged.
pub trait TrackObserver {
    /// Error type for notification failures.
    type Error;

    /// A new track was registered for `detection`.
    fn on_enter(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error>;

    /// A track was deregistered; `detection` is the last one matched to it.
    fn on_exit(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error>;
}

impl<O: TrackObserver + ?Sized> TrackObserver for &mut O {
    type Error = O::Error;

    fn on_enter(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        (**self).on_enter(id, detection)
    }

    fn on_exit(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        (**self).on_exit(id, detection)
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TrackObserver for NoopObserver {
    type Error = Infallible;

    fn on_enter(&mut self, _id: u64, _detection: &Detection) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_exit(&mut self, _id: u64, _detection: &Detection) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Observer built from a pair of closures.
///
/// ```
/// use objtrack_rs::{Detection, FnObserver};
///
/// let observer = FnObserver::new(
///     |id, det: &Detection| {
///         println!("{}: {} enters", id, det.label);
///         Ok::<(), std::io::Error>(())
///     },
///     |_id, det: &Detection| {
///         println!("{} exits", det.label);
///         Ok(())
///     },
/// );
/// # let _ = observer;
/// ```
pub struct FnObserver<N, X, E> {
    on_enter: N,
    on_exit: X,
    _error: PhantomData<fn() -> E>,
}

impl<N, X, E> FnObserver<N, X, E>
where
    N: FnMut(u64, &Detection) -> Result<(), E>,
    X: FnMut(u64, &Detection) -> Result<(), E>,
{
    pub fn new(on_enter: N, on_exit: X) -> Self {
        Self {
            on_enter,
            on_exit,
            _error: PhantomData,
        }
    }
}

impl<N, X, E> TrackObserver for FnObserver<N, X, E>
where
    N: FnMut(u64, &Detection) -> Result<(), E>,
    X: FnMut(u64, &Detection) -> Result<(), E>,
{
    type Error = E;

    fn on_enter(&mut self, id: u64, detection: &Detection) -> Result<(), E> {
        (self.on_enter)(id, detection)
    }

    fn on_exit(&mut self, id: u64, detection: &Detection) -> Result<(), E> {
        (self.on_exit)(id, detection)
    }
}

/// A lifecycle transition as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    Entered { id: u64, detection: Detection },
    Exited { id: u64, detection: Detection },
}

impl TrackEvent {
    pub fn id(&self) -> u64 {
        match self {
            Self::Entered { id, .. } | Self::Exited { id, .. } => *id,
        }
    }
}

/// Observer that records every transition in order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<TrackEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// IDs that entered, in notification order.
    pub fn entered(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter(|e| matches!(e, TrackEvent::Entered { .. }))
            .map(TrackEvent::id)
            .collect()
    }

    /// IDs that exited, in notification order.
    pub fn exited(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter(|e| matches!(e, TrackEvent::Exited { .. }))
            .map(TrackEvent::id)
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TrackObserver for EventLog {
    type Error = Infallible;

    fn on_enter(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        self.events.push(TrackEvent::Entered {
            id,
            detection: detection.clone(),
        });
        Ok(())
    }

    fn on_exit(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        self.events.push(TrackEvent::Exited {
            id,
            detection: detection.clone(),
        });
        Ok(())
    }
}

/// Observer that forwards transitions over a channel, for consumers that
/// want to handle them outside the tracking loop.
///
/// Sending fails once every receiver is dropped; that failure propagates
/// like any other observer error.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<TrackEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<TrackEvent>) -> Self {
        Self { sender }
    }
}

impl TrackObserver for ChannelObserver {
    type Error = SendError<TrackEvent>;

    fn on_enter(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        self.sender.send(TrackEvent::Entered {
            id,
            detection: detection.clone(),
        })
    }

    fn on_exit(&mut self, id: u64, detection: &Detection) -> Result<(), Self::Error> {
        self.sender.send(TrackEvent::Exited {
            id,
            detection: detection.clone(),
        })
    }
}
