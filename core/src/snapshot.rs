//! Immutable session snapshots.
//!
//! A [`Snapshot`] describes one session at one point in time: the two channel states,
//! the last ready-state or completion event, the connection fields observed when that
//! event was delivered, and a shared reference to the connection itself.

use crate::channel::{ChannelState, Direction};
use crate::event::{EventKind, ProgressEvent};
use crate::observation::Observation;
use std::fmt;
use std::sync::Arc;

/// One immutable description of a session.
///
/// Updates are structural: `with_*` methods return a new snapshot sharing every field
/// they do not replace.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use reactive_xhr_core::channel::{ChannelState, Direction};
/// use reactive_xhr_core::event::ProgressEvent;
/// use reactive_xhr_core::snapshot::Snapshot;
///
/// let first = Snapshot::new(Arc::new(()));
/// let second = first.with_channel(
///     Direction::Down,
///     first.download().advance(&ProgressEvent::load_start()),
/// );
///
/// assert!(!first.download().has_started());
/// assert!(second.download().has_started());
/// assert_eq!(second.upload(), first.upload());
/// ```
pub struct Snapshot<C> {
    handle: Arc<C>,
    upload: ChannelState,
    download: ChannelState,
    last_event: Option<Arc<ProgressEvent>>,
    observation: Arc<Observation>,
}

impl<C> Snapshot<C> {
    /// The snapshot before any event: both channels `Initial`, no last event, nothing
    /// observed.
    #[must_use]
    pub fn new(handle: Arc<C>) -> Self {
        Self {
            handle,
            upload: ChannelState::Initial,
            download: ChannelState::Initial,
            last_event: None,
            observation: Arc::new(Observation::default()),
        }
    }

    /// The connection this session wraps.
    #[must_use]
    pub const fn handle(&self) -> &Arc<C> {
        &self.handle
    }

    /// Outbound channel state.
    #[must_use]
    pub const fn upload(&self) -> &ChannelState {
        &self.upload
    }

    /// Inbound channel state.
    #[must_use]
    pub const fn download(&self) -> &ChannelState {
        &self.download
    }

    /// Channel state for `direction`.
    #[must_use]
    pub const fn channel(&self, direction: Direction) -> &ChannelState {
        match direction {
            Direction::Up => &self.upload,
            Direction::Down => &self.download,
        }
    }

    /// The last ready-state change, or the completion event once the session ended.
    #[must_use]
    pub fn last_event(&self) -> Option<&ProgressEvent> {
        self.last_event.as_deref()
    }

    /// Connection fields as observed for this snapshot.
    #[must_use]
    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    /// True if this is the terminal snapshot of its session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.last_event()
            .is_some_and(|event| event.kind == EventKind::LoadEnd)
    }

    /// A new snapshot with the channel for `direction` replaced.
    #[must_use]
    pub fn with_channel(&self, direction: Direction, state: ChannelState) -> Self {
        let mut next = self.clone();
        match direction {
            Direction::Up => next.upload = state,
            Direction::Down => next.download = state,
        }
        next
    }

    /// A new snapshot with the last event replaced.
    #[must_use]
    pub fn with_last_event(&self, event: ProgressEvent) -> Self {
        Self {
            last_event: Some(Arc::new(event)),
            ..self.clone()
        }
    }

    /// A new snapshot with the observed connection fields replaced.
    #[must_use]
    pub fn with_observation(&self, observation: Observation) -> Self {
        Self {
            observation: Arc::new(observation),
            ..self.clone()
        }
    }
}

// Manual impls: the connection itself is neither Clone, PartialEq nor Debug.
impl<C> Clone for Snapshot<C> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            upload: self.upload.clone(),
            download: self.download.clone(),
            last_event: self.last_event.clone(),
            observation: Arc::clone(&self.observation),
        }
    }
}

/// Snapshots are equal when they wrap the same connection and carry equal states.
impl<C> PartialEq for Snapshot<C> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
            && self.upload == other.upload
            && self.download == other.download
            && self.last_event == other.last_event
            && self.observation == other.observation
    }
}

impl<C> fmt::Debug for Snapshot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("handle", &Arc::as_ptr(&self.handle))
            .field("upload", &self.upload)
            .field("download", &self.download)
            .field("last_event", &self.last_event)
            .field("observation", &self.observation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelTag;

    #[test]
    fn new_snapshot_is_initial() {
        let snapshot = Snapshot::new(Arc::new(()));
        assert_eq!(snapshot.upload(), &ChannelState::Initial);
        assert_eq!(snapshot.download(), &ChannelState::Initial);
        assert!(snapshot.last_event().is_none());
        assert!(!snapshot.is_terminal());
    }

    #[test]
    fn structural_update_leaves_original_untouched() {
        let original = Snapshot::new(Arc::new(()));
        let updated = original.with_channel(
            Direction::Up,
            ChannelState::new(ChannelTag::Started, ProgressEvent::load_start()),
        );

        assert_eq!(original.upload().tag(), ChannelTag::Initial);
        assert_eq!(updated.upload().tag(), ChannelTag::Started);
        assert_eq!(updated.channel(Direction::Down), original.download());
        assert!(Arc::ptr_eq(updated.handle(), original.handle()));
    }

    #[test]
    fn completion_event_marks_terminal() {
        let snapshot = Snapshot::new(Arc::new(()))
            .with_last_event(ProgressEvent::ready_state_change());
        assert!(!snapshot.is_terminal());

        let last = snapshot.with_last_event(ProgressEvent::load_end());
        assert!(last.is_terminal());
    }

    #[test]
    fn observation_is_replaced_structurally() {
        use crate::connection::ReadyState;

        let before = Snapshot::new(Arc::new(()));
        let after = before.with_observation(Observation {
            ready_state: ReadyState::Done,
            status: 200,
            ..Observation::default()
        });

        assert_eq!(before.observation().status, 0);
        assert_eq!(after.observation().status, 200);
        assert_eq!(after.download(), before.download());
        assert_ne!(before, after);
    }

    #[test]
    fn equality_requires_same_handle() {
        let a = Snapshot::new(Arc::new(1_u8));
        let b = Snapshot::new(Arc::new(1_u8));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
