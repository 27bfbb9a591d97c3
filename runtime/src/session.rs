//! The event multiplexer and its cancellation binder.
//!
//! A [`Session`] owns one connection for one request. The first call to
//! [`Session::subscribe`] attaches twelve listeners to the connection (five lifecycle
//! kinds on each channel, ready-state change and completion) and runs the start
//! action, if any. From then on every delivered event is folded into a new
//! [`Snapshot`] and pushed to every subscriber in delivery order. Each snapshot carries
//! the [`Observation`] of the connection read when its event arrived, so subscribers
//! that lag behind still see the status, headers and body of that moment.
//!
//! # Termination
//!
//! A session finalizes exactly once, through whichever comes first:
//!
//! - **Completion**: the `loadend` event is folded into the terminal snapshot, which is
//!   emitted, and only then are the subscriber channels closed.
//! - **Cancellation**: the last [`SnapshotStream`] is dropped or unsubscribed while the
//!   session is active. The connection is aborted.
//!
//! Either way the listeners are detached and later events are ignored. The lock is
//! never held while calling into the connection, so connections that dispatch
//! re-entrantly from `abort` or `send` cannot deadlock the session.

use crate::metrics::{SessionMetrics, SnapshotSource};
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use reactive_xhr_core::{
    Connection, Direction, EventKind, ListenerId, Observation, ProgressEvent, ResponseBody,
    Snapshot,
};
use smallvec::SmallVec;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

/// Listeners attached per session: five lifecycle kinds on two channels, plus
/// ready-state change and completion.
pub const LISTENER_COUNT: usize = 2 * EventKind::LIFECYCLE.len() + 2;

type StartAction<C> = Box<dyn FnOnce(&C) + Send>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Lifecycle {
    /// Nobody subscribed yet; no listener attached
    Idle,
    /// Listeners attached, events are folded and emitted
    Active,
    /// Completed or cancelled; nothing happens anymore
    Finalized,
}

struct Subscriber<C> {
    id: u64,
    sender: mpsc::UnboundedSender<Snapshot<C>>,
}

struct Shared<C> {
    lifecycle: Lifecycle,
    current: Snapshot<C>,
    emitted: bool,
    subscribers: Vec<Subscriber<C>>,
    next_subscriber: u64,
    listeners: SmallVec<[ListenerId; LISTENER_COUNT]>,
    start: Option<StartAction<C>>,
}

impl<C> Shared<C> {
    fn publish(&mut self, snapshot: Snapshot<C>) {
        for subscriber in &self.subscribers {
            // A closed receiver belongs to a stream that is unsubscribing right now.
            let _ = subscriber.sender.unbounded_send(snapshot.clone());
        }
        self.current = snapshot;
        self.emitted = true;
    }
}

struct Inner<C> {
    handle: Arc<C>,
    shared: Mutex<Shared<C>>,
}

impl<C: Connection> Inner<C> {
    // Every critical section leaves `Shared` consistent, so a poisoned lock is usable.
    fn lock(&self) -> MutexGuard<'_, Shared<C>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(
        self: &Arc<Self>,
        on_event: impl Fn(&Self, &ProgressEvent) + Send + Sync + 'static,
    ) -> reactive_xhr_core::Listener {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: &ProgressEvent| {
            if let Some(inner) = weak.upgrade() {
                on_event(inner.as_ref(), event);
            }
        })
    }

    fn activate(self: &Arc<Self>) {
        let mut listeners: SmallVec<[ListenerId; LISTENER_COUNT]> = SmallVec::new();
        for kind in EventKind::LIFECYCLE {
            for direction in Direction::BOTH {
                let listener = self.listener(move |inner, event| {
                    inner.on_channel_event(direction, event);
                });
                listeners.push(self.handle.add_listener(direction, kind, listener));
            }
        }
        let on_ready_state = self.listener(Self::on_ready_state_change);
        listeners.push(self.handle.add_listener(
            Direction::Down,
            EventKind::ReadyStateChange,
            on_ready_state,
        ));
        let on_complete = self.listener(Self::on_complete);
        listeners.push(
            self.handle
                .add_listener(Direction::Down, EventKind::LoadEnd, on_complete),
        );

        let start = {
            let mut shared = self.lock();
            if shared.lifecycle == Lifecycle::Active {
                shared.listeners = listeners;
                listeners = SmallVec::new();
                shared.start.take()
            } else {
                None
            }
        };
        if !listeners.is_empty() {
            // Finalized while the listeners were being attached.
            self.detach(listeners);
            return;
        }

        tracing::debug!(listeners = LISTENER_COUNT, "Session activated");
        SessionMetrics::record_started();
        if let Some(start) = start {
            start(&self.handle);
        }
    }

    fn detach(&self, listeners: SmallVec<[ListenerId; LISTENER_COUNT]>) {
        for id in listeners {
            self.handle.remove_listener(id);
        }
    }

    // Read before locking: the connection must never be called under the lock.
    fn observe(&self) -> Observation {
        Observation::read(self.handle.as_ref())
    }

    fn on_channel_event(&self, direction: Direction, event: &ProgressEvent) {
        let observation = self.observe();
        let mut shared = self.lock();
        if shared.lifecycle != Lifecycle::Active {
            return;
        }
        let state = shared.current.channel(direction).advance(event);
        tracing::trace!(%direction, kind = %event.kind, tag = %state.tag(), "Channel event");
        let next = shared
            .current
            .with_channel(direction, state)
            .with_observation(observation);
        shared.publish(next);
        SessionMetrics::record_snapshot(match direction {
            Direction::Up => SnapshotSource::Upload,
            Direction::Down => SnapshotSource::Download,
        });
    }

    fn on_ready_state_change(&self, event: &ProgressEvent) {
        let observation = self.observe();
        let mut shared = self.lock();
        if shared.lifecycle != Lifecycle::Active {
            return;
        }
        tracing::trace!(ready_state = ?observation.ready_state, "Ready state changed");
        let next = shared
            .current
            .with_last_event(event.clone())
            .with_observation(observation);
        shared.publish(next);
        SessionMetrics::record_snapshot(SnapshotSource::ReadyState);
    }

    fn on_complete(&self, event: &ProgressEvent) {
        let observation = self.observe();
        let listeners = {
            let mut shared = self.lock();
            if shared.lifecycle != Lifecycle::Active {
                return;
            }
            let next = shared
                .current
                .with_last_event(event.clone())
                .with_observation(observation);
            shared.publish(next);
            shared.lifecycle = Lifecycle::Finalized;
            // Dropping the senders ends every stream after the terminal snapshot.
            let subscribers = std::mem::take(&mut shared.subscribers);
            tracing::debug!(
                subscribers = subscribers.len(),
                upload = %shared.current.upload().tag(),
                download = %shared.current.download().tag(),
                "Session completed"
            );
            std::mem::take(&mut shared.listeners)
        };
        SessionMetrics::record_snapshot(SnapshotSource::Completion);
        SessionMetrics::record_completed();
        self.detach(listeners);
    }

    fn unsubscribe(&self, id: u64) {
        let listeners = {
            let mut shared = self.lock();
            shared.subscribers.retain(|subscriber| subscriber.id != id);
            if !shared.subscribers.is_empty() || shared.lifecycle != Lifecycle::Active {
                return;
            }
            shared.lifecycle = Lifecycle::Finalized;
            shared.start = None;
            std::mem::take(&mut shared.listeners)
        };
        // Detach first: an abort that dispatches `loadend` must not reach us.
        self.detach(listeners);
        self.handle.abort();
        tracing::debug!("Last subscriber left before completion, connection aborted");
        SessionMetrics::record_aborted();
    }
}

/// One request's lifecycle as a shared, lazily started stream of snapshots.
///
/// Cloning a `Session` yields another handle to the same session.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use reactive_xhr_runtime::Session;
///
/// let session = Session::new(connection);
/// let snapshots: Vec<_> = session.subscribe().collect().await;
/// assert!(snapshots.last().is_some_and(|s| s.is_terminal()));
/// ```
pub struct Session<C: Connection> {
    inner: Arc<Inner<C>>,
}

impl<C: Connection> Session<C> {
    /// Wrap a connection that is already sent, or will be sent by the caller.
    #[must_use]
    pub fn new(handle: Arc<C>) -> Self {
        Self::build(handle, None)
    }

    /// Wrap a connection and run `start` on it once listeners are attached.
    ///
    /// `start` runs on the first subscription, without any session lock held, so it
    /// may trigger events synchronously.
    #[must_use]
    pub fn with_start(handle: Arc<C>, start: impl FnOnce(&C) + Send + 'static) -> Self {
        Self::build(handle, Some(Box::new(start)))
    }

    fn build(handle: Arc<C>, start: Option<StartAction<C>>) -> Self {
        let current = Snapshot::new(Arc::clone(&handle));
        Self {
            inner: Arc::new(Inner {
                handle,
                shared: Mutex::new(Shared {
                    lifecycle: Lifecycle::Idle,
                    current,
                    emitted: false,
                    subscribers: Vec::new(),
                    next_subscriber: 0,
                    listeners: SmallVec::new(),
                    start,
                }),
            }),
        }
    }

    /// The wrapped connection.
    #[must_use]
    pub fn handle(&self) -> &Arc<C> {
        &self.inner.handle
    }

    /// Subscribe to the snapshot stream.
    ///
    /// The first subscription activates the session. Subscribing to an active session
    /// replays the latest snapshot, if one was emitted; subscribing to a completed one
    /// yields only the terminal snapshot, and to a cancelled one nothing.
    #[must_use]
    pub fn subscribe(&self) -> SnapshotStream<C> {
        let (sender, receiver) = mpsc::unbounded();
        let (id, activate) = {
            let mut shared = self.inner.lock();
            let id = shared.next_subscriber;
            shared.next_subscriber += 1;
            let activate = match shared.lifecycle {
                Lifecycle::Idle => {
                    shared.lifecycle = Lifecycle::Active;
                    shared.subscribers.push(Subscriber { id, sender });
                    true
                },
                Lifecycle::Active => {
                    if shared.emitted {
                        let _ = sender.unbounded_send(shared.current.clone());
                    }
                    shared.subscribers.push(Subscriber { id, sender });
                    false
                },
                Lifecycle::Finalized => {
                    if shared.current.is_terminal() {
                        let _ = sender.unbounded_send(shared.current.clone());
                    }
                    false
                },
            };
            (id, activate)
        };
        if activate {
            self.inner.activate();
        }
        SnapshotStream {
            receiver,
            inner: Arc::clone(&self.inner),
            id: Some(id),
        }
    }

    /// The latest emitted snapshot.
    #[must_use]
    pub fn current(&self) -> Option<Snapshot<C>> {
        let shared = self.inner.lock();
        shared.emitted.then(|| shared.current.clone())
    }

    /// Check if the session completed or was cancelled
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.inner.lock().lifecycle == Lifecycle::Finalized
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Wait for the session to end and resolve its response.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Failed`](crate::error::SessionError::Failed) or
    ///   [`SessionError::TimedOut`](crate::error::SessionError::TimedOut) for a
    ///   download that did not succeed
    /// - [`SessionError::Aborted`](crate::error::SessionError::Aborted) if the session
    ///   was cancelled before completing
    /// - [`SessionError::EmptyResponse`](crate::error::SessionError::EmptyResponse) if
    ///   the connection has no body to report
    pub async fn result(&self) -> Result<ResponseBody, crate::error::SessionError> {
        let mut last = None;
        let mut stream = self.subscribe();
        while let Some(snapshot) = stream.next().await {
            last = Some(snapshot);
        }
        match last {
            Some(snapshot) if snapshot.is_terminal() => crate::resolve(&snapshot),
            _ => Err(crate::error::SessionError::Aborted),
        }
    }
}

impl<C: Connection> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.inner.lock();
        f.debug_struct("Session")
            .field("lifecycle", &shared.lifecycle)
            .field("subscribers", &shared.subscribers.len())
            .field("current", &shared.current)
            .finish()
    }
}

/// One subscription to a [`Session`].
///
/// Ends after the terminal snapshot. Dropping it, or calling
/// [`unsubscribe`](Self::unsubscribe), detaches the subscriber; if it was the last one
/// and the session had not completed, the connection is aborted.
pub struct SnapshotStream<C: Connection> {
    receiver: mpsc::UnboundedReceiver<Snapshot<C>>,
    inner: Arc<Inner<C>>,
    id: Option<u64>,
}

impl<C: Connection> SnapshotStream<C> {
    /// Detach from the session. Idempotent.
    ///
    /// The stream yields nothing afterwards, not even snapshots already buffered.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            self.inner.unsubscribe(id);
        }
    }

    /// Check if this subscription is still attached
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.id.is_some()
    }
}

impl<C: Connection> Stream for SnapshotStream<C> {
    type Item = Snapshot<C>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.id.is_none() {
            return Poll::Ready(None);
        }
        self.receiver.poll_next_unpin(cx)
    }
}

impl<C: Connection> Drop for SnapshotStream<C> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl<C: Connection> fmt::Debug for SnapshotStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
