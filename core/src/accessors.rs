//! Pure projections over a [`Snapshot`].
//!
//! Channel accessors read the channel states carried by the snapshot. Connection
//! accessors read the [`Observation`](crate::Observation) captured when the snapshot's
//! event was delivered, so a snapshot answers the same way however late it is read;
//! fields that were not available yet come back empty rather than as errors.
//!
//! Every channel accessor exists in three spellings: a direction-generic one
//! (`channel_has_started(Direction::Up, &snapshot)`) and the `up_`/`down_` shorthands
//! generated by `channel_accessors!`, which fit `Iterator::map` and the stream
//! projections of the runtime crate. Request-wide accessors (`is_progressing`,
//! `loaded`, `has_errored`, ...) combine both channels.

use crate::channel::Direction;
use crate::connection::{ReadyState, ResponseBody, ResponseType};
use crate::event::EventKind;
use crate::snapshot::Snapshot;

/// True once the channel saw any lifecycle event.
#[must_use]
pub fn channel_has_started<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_started()
}

/// True while the channel is `Started` or `Progressing`.
#[must_use]
pub fn channel_is_progressing<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).is_progressing()
}

/// True once the channel succeeded.
#[must_use]
pub fn channel_has_succeeded<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_succeeded()
}

/// True once the channel failed with a network error.
#[must_use]
pub fn channel_has_failed<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_failed()
}

/// True once the channel timed out.
#[must_use]
pub fn channel_has_timed_out<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_timed_out()
}

/// True once the channel failed or timed out.
#[must_use]
pub fn channel_has_errored<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_errored()
}

/// True once the channel reached any terminal state.
#[must_use]
pub fn channel_has_ended<C>(direction: Direction, snapshot: &Snapshot<C>) -> bool {
    snapshot.channel(direction).has_ended()
}

/// Bytes transferred on the channel.
#[must_use]
pub fn channel_loaded<C>(direction: Direction, snapshot: &Snapshot<C>) -> u64 {
    snapshot.channel(direction).loaded()
}

/// Expected total bytes on the channel.
#[must_use]
pub fn channel_total<C>(direction: Direction, snapshot: &Snapshot<C>) -> u64 {
    snapshot.channel(direction).total()
}

/// Error detail of a failed channel.
#[must_use]
pub fn channel_error<C>(direction: Direction, snapshot: &Snapshot<C>) -> Option<String> {
    snapshot.channel(direction).error().map(str::to_string)
}

macro_rules! channel_accessors {
    ($($generic:ident => $up:ident, $down:ident -> $ty:ty;)*) => {
        $(
            #[doc = concat!("[`", stringify!($generic), "`] for the upload channel.")]
            #[must_use]
            pub fn $up<C>(snapshot: &Snapshot<C>) -> $ty {
                $generic(Direction::Up, snapshot)
            }

            #[doc = concat!("[`", stringify!($generic), "`] for the download channel.")]
            #[must_use]
            pub fn $down<C>(snapshot: &Snapshot<C>) -> $ty {
                $generic(Direction::Down, snapshot)
            }
        )*
    };
}

channel_accessors! {
    channel_has_started => up_has_started, down_has_started -> bool;
    channel_is_progressing => up_is_progressing, down_is_progressing -> bool;
    channel_has_succeeded => up_has_succeeded, down_has_succeeded -> bool;
    channel_has_failed => up_has_failed, down_has_failed -> bool;
    channel_has_timed_out => up_has_timed_out, down_has_timed_out -> bool;
    channel_has_errored => up_has_errored, down_has_errored -> bool;
    channel_has_ended => up_has_ended, down_has_ended -> bool;
    channel_loaded => up_loaded, down_loaded -> u64;
    channel_total => up_total, down_total -> u64;
    channel_error => up_error, down_error -> Option<String>;
}

/// True while either channel is in flight.
#[must_use]
pub fn is_progressing<C>(snapshot: &Snapshot<C>) -> bool {
    up_is_progressing(snapshot) || down_is_progressing(snapshot)
}

/// Bytes transferred on both channels.
#[must_use]
pub fn loaded<C>(snapshot: &Snapshot<C>) -> u64 {
    up_loaded(snapshot).saturating_add(down_loaded(snapshot))
}

/// Expected total bytes on both channels.
#[must_use]
pub fn total<C>(snapshot: &Snapshot<C>) -> u64 {
    up_total(snapshot).saturating_add(down_total(snapshot))
}

/// True once either channel failed with a network error.
#[must_use]
pub fn has_failed<C>(snapshot: &Snapshot<C>) -> bool {
    up_has_failed(snapshot) || down_has_failed(snapshot)
}

/// True once either channel timed out.
#[must_use]
pub fn has_timed_out<C>(snapshot: &Snapshot<C>) -> bool {
    up_has_timed_out(snapshot) || down_has_timed_out(snapshot)
}

/// True once either channel failed or timed out.
#[must_use]
pub fn has_errored<C>(snapshot: &Snapshot<C>) -> bool {
    has_failed(snapshot) || has_timed_out(snapshot)
}

/// Error details of both channels, upload first.
#[must_use]
pub fn errors<C>(snapshot: &Snapshot<C>) -> Vec<String> {
    Direction::BOTH
        .into_iter()
        .filter_map(|direction| channel_error(direction, snapshot))
        .collect()
}

/// True once the session delivered its completion event.
#[must_use]
pub fn is_done<C>(snapshot: &Snapshot<C>) -> bool {
    snapshot
        .last_event()
        .is_some_and(|event| event.kind == EventKind::LoadEnd)
}

/// Ready state of the connection.
#[must_use]
pub fn ready_state<C>(snapshot: &Snapshot<C>) -> ReadyState {
    snapshot.observation().ready_state
}

/// The response body, present only once the download has succeeded.
#[must_use]
pub fn response<C>(snapshot: &Snapshot<C>) -> Option<ResponseBody> {
    if snapshot.download().has_succeeded() {
        snapshot.observation().response.clone()
    } else {
        None
    }
}

/// The text received so far, empty for non-text responses.
#[must_use]
pub fn response_text<C>(snapshot: &Snapshot<C>) -> String {
    snapshot
        .observation()
        .response
        .as_ref()
        .and_then(ResponseBody::as_text)
        .unwrap_or_default()
        .to_string()
}

/// Response type in effect on the connection.
#[must_use]
pub fn response_type<C>(snapshot: &Snapshot<C>) -> ResponseType {
    snapshot.observation().response_type
}

/// Final URL after redirects, empty before headers are received.
#[must_use]
pub fn response_url<C>(snapshot: &Snapshot<C>) -> String {
    snapshot.observation().response_url.clone()
}

/// HTTP status, `0` before headers are received.
#[must_use]
pub fn status<C>(snapshot: &Snapshot<C>) -> u16 {
    snapshot.observation().status
}

/// HTTP status text, empty before headers are received.
#[must_use]
pub fn status_text<C>(snapshot: &Snapshot<C>) -> String {
    snapshot.observation().status_text.clone()
}

/// True once status and headers can be read.
#[must_use]
pub fn is_status_available<C>(snapshot: &Snapshot<C>) -> bool {
    ready_state(snapshot) >= ReadyState::HeadersReceived
}

/// Value of a response header. Absent before headers are received.
#[must_use]
pub fn response_header<C>(name: &str, snapshot: &Snapshot<C>) -> Option<String> {
    if is_status_available(snapshot) {
        snapshot.observation().response_header(name)
    } else {
        None
    }
}

/// Raw response header block, empty before headers are received.
#[must_use]
pub fn all_response_headers<C>(snapshot: &Snapshot<C>) -> String {
    if is_status_available(snapshot) {
        snapshot.observation().response_headers.clone()
    } else {
        String::new()
    }
}

/// True iff `status` is a 2xx code.
///
/// # Examples
///
/// ```
/// use reactive_xhr_core::accessors::is_http_success;
///
/// assert!(!is_http_success(199));
/// assert!(is_http_success(200));
/// assert!(is_http_success(299));
/// assert!(!is_http_success(300));
/// ```
#[must_use]
pub const fn is_http_success(status: u16) -> bool {
    200 <= status && status < 300
}

/// [`is_http_success`] of the observed status.
#[must_use]
pub fn status_is_http_success<C>(snapshot: &Snapshot<C>) -> bool {
    is_http_success(status(snapshot))
}
