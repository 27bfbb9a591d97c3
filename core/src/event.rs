//! Raw events delivered by a connection.
//!
//! A connection reports its lifecycle through named events, the same vocabulary an
//! `XMLHttpRequest` uses. Every event carries the byte counters of the transfer so far;
//! error events additionally carry a description.
//!
//! Only five kinds ([`EventKind::LIFECYCLE`]) move a channel through its states. The
//! remaining kinds describe the connection as a whole: [`EventKind::ReadyStateChange`]
//! and the completion signal [`EventKind::LoadEnd`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every signal a connection can deliver.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The transfer on a channel began.
    LoadStart,
    /// Bytes were transferred on a channel.
    Progress,
    /// The connection's deadline elapsed.
    Timeout,
    /// The transfer on a channel finished successfully.
    Load,
    /// A network-level failure occurred.
    Error,
    /// The request was aborted by the caller.
    ///
    /// Reported by connections but not tracked as a channel state.
    Abort,
    /// The connection's ready state changed.
    ReadyStateChange,
    /// The request finished, whatever the outcome.
    LoadEnd,
}

impl EventKind {
    /// The kinds that drive a channel's state, in the order listeners are attached.
    pub const LIFECYCLE: [Self; 5] = [
        Self::LoadStart,
        Self::Progress,
        Self::Timeout,
        Self::Load,
        Self::Error,
    ];

    /// Wire name of the event, as the host network stack spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadStart => "loadstart",
            Self::Progress => "progress",
            Self::Timeout => "timeout",
            Self::Load => "load",
            Self::Error => "error",
            Self::Abort => "abort",
            Self::ReadyStateChange => "readystatechange",
            Self::LoadEnd => "loadend",
        }
    }

    /// Check if this kind drives a channel's state
    #[must_use]
    pub const fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::LoadStart | Self::Progress | Self::Timeout | Self::Load | Self::Error
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of one event.
///
/// # Examples
///
/// ```
/// use reactive_xhr_core::event::{EventKind, ProgressEvent};
///
/// let event = ProgressEvent::progress(512, 2048);
/// assert_eq!(event.kind, EventKind::Progress);
/// assert!(event.length_computable);
///
/// let failed = ProgressEvent::error("connection reset");
/// assert_eq!(failed.error.as_deref(), Some("connection reset"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// What happened
    pub kind: EventKind,

    /// Bytes transferred so far
    pub loaded: u64,

    /// Expected total bytes, `0` when unknown
    pub total: u64,

    /// Whether `total` is meaningful
    pub length_computable: bool,

    /// Description of the failure, for [`EventKind::Error`] events
    pub error: Option<String>,
}

impl ProgressEvent {
    /// Create an event of the given kind with no byte counts.
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            loaded: 0,
            total: 0,
            length_computable: false,
            error: None,
        }
    }

    /// Set the byte counters.
    ///
    /// A non-zero `total` marks the length as computable.
    #[must_use]
    pub const fn with_bytes(mut self, loaded: u64, total: u64) -> Self {
        self.loaded = loaded;
        self.total = total;
        self.length_computable = total > 0;
        self
    }

    /// A `loadstart` event.
    #[must_use]
    pub const fn load_start() -> Self {
        Self::new(EventKind::LoadStart)
    }

    /// A `progress` event with byte counters.
    #[must_use]
    pub const fn progress(loaded: u64, total: u64) -> Self {
        Self::new(EventKind::Progress).with_bytes(loaded, total)
    }

    /// A `load` event with the final byte counters.
    #[must_use]
    pub const fn load(loaded: u64, total: u64) -> Self {
        Self::new(EventKind::Load).with_bytes(loaded, total)
    }

    /// A `timeout` event.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::new(EventKind::Timeout)
    }

    /// An `error` event with a description of the failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(EventKind::Error)
        }
    }

    /// An `abort` event.
    #[must_use]
    pub const fn abort() -> Self {
        Self::new(EventKind::Abort)
    }

    /// A `readystatechange` event.
    #[must_use]
    pub const fn ready_state_change() -> Self {
        Self::new(EventKind::ReadyStateChange)
    }

    /// A `loadend` event, the completion signal.
    #[must_use]
    pub const fn load_end() -> Self {
        Self::new(EventKind::LoadEnd)
    }
}
