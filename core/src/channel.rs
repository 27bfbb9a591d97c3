//! Per-channel lifecycle state.
//!
//! A request has two independent channels: the outbound (upload) side and the inbound
//! (download) side. Each moves through
//!
//! ```text
//! Initial ─loadstart─▶ Started ─progress─▶ Progressing* ─load|error|timeout─▶ terminal
//! ```
//!
//! where the terminal state is one of `Succeeded`, `Failed` or `TimedOut`. A closed enum
//! makes combinations like "succeeded and timed out" unrepresentable.

use crate::event::{EventKind, ProgressEvent};
use std::fmt;
use std::sync::Arc;

/// Which side of a request an event or state belongs to.
///
/// When registering listeners, `Down` addresses the connection itself (which also
/// delivers ready-state and completion events) and `Up` its upload target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Outbound (request body)
    Up,
    /// Inbound (response body)
    Down,
}

impl Direction {
    /// Both directions, upload first.
    pub const BOTH: [Self; 2] = [Self::Up, Self::Down];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "upload"),
            Self::Down => write!(f, "download"),
        }
    }
}

/// The tag of a [`ChannelState`] without its event.
///
/// Tags are ordered by lifecycle progress; the three terminal tags share the last rank.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelTag {
    /// No event observed yet
    Initial,
    /// `loadstart` observed
    Started,
    /// `progress` observed
    Progressing,
    /// `load` observed
    Succeeded,
    /// `error` observed
    Failed,
    /// `timeout` observed
    TimedOut,
}

impl ChannelTag {
    /// Position along the lifecycle.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Started => 1,
            Self::Progressing => 2,
            Self::Succeeded | Self::Failed | Self::TimedOut => 3,
        }
    }

    /// Check if no further transition can happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// The tag an event of `kind` moves a channel to, if it is a lifecycle event.
    #[must_use]
    pub const fn for_event(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::LoadStart => Some(Self::Started),
            EventKind::Progress => Some(Self::Progressing),
            EventKind::Load => Some(Self::Succeeded),
            EventKind::Error => Some(Self::Failed),
            EventKind::Timeout => Some(Self::TimedOut),
            EventKind::Abort | EventKind::ReadyStateChange | EventKind::LoadEnd => None,
        }
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Started => "started",
            Self::Progressing => "progressing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of one channel, with the event that produced it.
///
/// Events are shared through `Arc` so that structurally updated snapshots reuse them.
///
/// # Examples
///
/// ```
/// use reactive_xhr_core::channel::{ChannelState, ChannelTag};
/// use reactive_xhr_core::event::ProgressEvent;
///
/// let state = ChannelState::Initial
///     .advance(&ProgressEvent::load_start())
///     .advance(&ProgressEvent::progress(8, 16))
///     .advance(&ProgressEvent::load(16, 16));
///
/// assert_eq!(state.tag(), ChannelTag::Succeeded);
/// assert_eq!(state.loaded(), 16);
///
/// // Terminal states never change again.
/// let after = state.advance(&ProgressEvent::timeout());
/// assert_eq!(after, state);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No event observed yet
    #[default]
    Initial,
    /// The channel saw its first lifecycle event
    Started(Arc<ProgressEvent>),
    /// The channel is transferring
    Progressing(Arc<ProgressEvent>),
    /// The channel completed successfully
    Succeeded(Arc<ProgressEvent>),
    /// The channel failed with a network-level error
    Failed(Arc<ProgressEvent>),
    /// The channel exceeded its deadline
    TimedOut(Arc<ProgressEvent>),
}

impl ChannelState {
    /// Build the state with `tag` carrying `event`.
    #[must_use]
    pub fn new(tag: ChannelTag, event: ProgressEvent) -> Self {
        let event = Arc::new(event);
        match tag {
            ChannelTag::Initial => Self::Initial,
            ChannelTag::Started => Self::Started(event),
            ChannelTag::Progressing => Self::Progressing(event),
            ChannelTag::Succeeded => Self::Succeeded(event),
            ChannelTag::Failed => Self::Failed(event),
            ChannelTag::TimedOut => Self::TimedOut(event),
        }
    }

    /// Fold an event into the state.
    ///
    /// Returns the state the channel moves to. Non-lifecycle events, events that would
    /// move the channel backwards and anything after a terminal state leave it
    /// unchanged. A repeated `progress` replaces the carried event so counters stay
    /// current.
    #[must_use]
    pub fn advance(&self, event: &ProgressEvent) -> Self {
        let current = self.tag();
        match ChannelTag::for_event(event.kind) {
            Some(next) if !current.is_terminal() && next.rank() >= current.rank() => {
                Self::new(next, event.clone())
            },
            _ => self.clone(),
        }
    }

    /// The tag alone.
    #[must_use]
    pub const fn tag(&self) -> ChannelTag {
        match self {
            Self::Initial => ChannelTag::Initial,
            Self::Started(_) => ChannelTag::Started,
            Self::Progressing(_) => ChannelTag::Progressing,
            Self::Succeeded(_) => ChannelTag::Succeeded,
            Self::Failed(_) => ChannelTag::Failed,
            Self::TimedOut(_) => ChannelTag::TimedOut,
        }
    }

    /// The event that produced this state, `None` while `Initial`.
    #[must_use]
    pub fn event(&self) -> Option<&ProgressEvent> {
        match self {
            Self::Initial => None,
            Self::Started(event)
            | Self::Progressing(event)
            | Self::Succeeded(event)
            | Self::Failed(event)
            | Self::TimedOut(event) => Some(event),
        }
    }

    /// True once any lifecycle event has been observed.
    #[must_use]
    pub const fn has_started(&self) -> bool {
        !matches!(self, Self::Initial)
    }

    /// True while started but not yet ended.
    #[must_use]
    pub const fn is_progressing(&self) -> bool {
        matches!(self, Self::Started(_) | Self::Progressing(_))
    }

    /// True after a `load` event
    #[must_use]
    pub const fn has_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// True after an `error` event
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// True after a `timeout` event
    #[must_use]
    pub const fn has_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// True for either failure outcome, `Failed` or `TimedOut`.
    #[must_use]
    pub const fn has_errored(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut(_))
    }

    /// True in any terminal state.
    #[must_use]
    pub const fn has_ended(&self) -> bool {
        self.tag().is_terminal()
    }

    /// Bytes transferred, `0` before any event.
    #[must_use]
    pub fn loaded(&self) -> u64 {
        self.event().map_or(0, |event| event.loaded)
    }

    /// Expected total bytes, `0` before any event or when unknown.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.event().map_or(0, |event| event.total)
    }

    /// Error detail of a failed channel.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(event) => event.error.as_deref(),
            _ => None,
        }
    }
}
