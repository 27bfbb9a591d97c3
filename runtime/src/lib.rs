//! # Reactive XHR Runtime
//!
//! Runtime implementation for reactive XHR sessions.
//!
//! This crate wires a [`Connection`](reactive_xhr_core::Connection) to the snapshot
//! model of `reactive-xhr-core`: it attaches listeners, folds events into snapshots, fans them out to subscribers
//! and aborts the connection when nobody is listening anymore.
//!
//! ## Core Components
//!
//! - **Session**: the event multiplexer and cancellation binder ([`Session`])
//! - **Initiator**: validates a configuration and sends the request ([`perform`])
//! - **Projections**: accessor streams with duplicate suppression ([`SnapshotStreamExt`])
//! - **Switch-latest**: restarts the request for every new configuration ([`perform_latest`])
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use reactive_xhr_core::{accessors, RequestConfig};
//! use reactive_xhr_runtime::{perform, SnapshotStreamExt};
//!
//! let session = perform(connection, RequestConfig::get("http://localhost:3000/text"))?;
//!
//! // Stream the body once it arrives
//! let bodies: Vec<_> = session.subscribe().responses().collect().await;
//!
//! // Or wait for the outcome
//! let body = session.result().await?;
//! ```

use reactive_xhr_core::{ChannelTag, ResponseBody, Snapshot};

/// Event multiplexing and cancellation
pub mod session;

/// Accessor streams
pub mod projection;

/// Starting requests from configurations
pub mod initiator;

/// Restarting requests on configuration changes
pub mod switch;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for session outcomes
pub mod error {
    use thiserror::Error;

    /// Why a session did not produce a response body.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SessionError {
        /// The download has not ended yet
        #[error("Session has not completed")]
        Incomplete,

        /// The download failed with a network error
        ///
        /// `message` is empty when the connection reported none.
        #[error("Request failed: {message}")]
        Failed {
            /// Error message carried by the failure event
            message: String,
        },

        /// The download exceeded its timeout
        #[error("Request timed out")]
        TimedOut,

        /// The session was cancelled before it completed
        #[error("Session was aborted")]
        Aborted,

        /// The download succeeded but the connection reports no body
        #[error("Request succeeded without a response body")]
        EmptyResponse,
    }
}

pub use error::SessionError;
pub use initiator::perform;
pub use projection::{SnapshotStreamExt, skip_duplicates};
pub use session::{LISTENER_COUNT, Session, SnapshotStream};
pub use switch::{PerformLatest, perform_latest};

/// Resolve the outcome of a snapshot's download.
///
/// # Errors
///
/// - [`SessionError::Failed`] or [`SessionError::TimedOut`] for a failed download
/// - [`SessionError::Aborted`] if the session completed without the download ending
/// - [`SessionError::Incomplete`] while the download is still running
/// - [`SessionError::EmptyResponse`] if the download succeeded without a body
pub fn resolve<C>(snapshot: &Snapshot<C>) -> Result<ResponseBody, SessionError> {
    let download = snapshot.download();
    match download.tag() {
        ChannelTag::Succeeded => snapshot
            .observation()
            .response
            .clone()
            .ok_or(SessionError::EmptyResponse),
        ChannelTag::Failed => Err(SessionError::Failed {
            message: download.error().unwrap_or_default().to_string(),
        }),
        ChannelTag::TimedOut => Err(SessionError::TimedOut),
        // Completion without a terminal download: the connection was aborted.
        ChannelTag::Initial | ChannelTag::Started | ChannelTag::Progressing
            if snapshot.is_terminal() =>
        {
            Err(SessionError::Aborted)
        },
        ChannelTag::Initial | ChannelTag::Started | ChannelTag::Progressing => {
            Err(SessionError::Incomplete)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactive_xhr_core::{Direction, Observation, ProgressEvent};
    use reactive_xhr_testing::mocks::MockConnection;
    use std::sync::Arc;

    fn after(events: &[ProgressEvent], connection: Arc<MockConnection>) -> Snapshot<MockConnection> {
        events.iter().fold(Snapshot::new(connection), |snapshot, event| {
            let state = snapshot.download().advance(event);
            snapshot.with_channel(Direction::Down, state)
        })
    }

    #[test]
    fn test_resolve_success() {
        let connection = Arc::new(MockConnection::new());
        let snapshot = after(
            &[ProgressEvent::load_start(), ProgressEvent::load(13, 13)],
            Arc::clone(&connection),
        )
        .with_observation(Observation {
            response: Some(ResponseBody::from("Hello, world!")),
            ..Observation::default()
        });

        // The snapshot answers with what was observed, not with the live connection.
        connection.set_response(Some(ResponseBody::from("replaced")));
        assert_eq!(resolve(&snapshot), Ok(ResponseBody::from("Hello, world!")));
    }

    #[test]
    fn test_resolve_empty_response() {
        let snapshot = after(&[ProgressEvent::load(0, 0)], Arc::new(MockConnection::new()));
        assert_eq!(resolve(&snapshot), Err(SessionError::EmptyResponse));
    }

    #[test]
    fn test_resolve_failures() {
        let connection = Arc::new(MockConnection::new());
        let failed = after(&[ProgressEvent::error("connection refused")], Arc::clone(&connection));
        assert_eq!(
            resolve(&failed),
            Err(SessionError::Failed {
                message: "connection refused".to_string()
            })
        );

        let timed_out = after(&[ProgressEvent::timeout()], Arc::clone(&connection));
        assert_eq!(resolve(&timed_out), Err(SessionError::TimedOut));

        let aborted = after(&[ProgressEvent::load_start(), ProgressEvent::abort()], connection)
            .with_last_event(ProgressEvent::load_end());
        assert_eq!(resolve(&aborted), Err(SessionError::Aborted));
    }

    #[test]
    fn test_resolve_incomplete() {
        let connection = Arc::new(MockConnection::new());
        assert_eq!(
            resolve(&Snapshot::new(Arc::clone(&connection))),
            Err(SessionError::Incomplete)
        );
        let progressing = after(
            &[ProgressEvent::load_start(), ProgressEvent::progress(4, 8)],
            connection,
        );
        assert_eq!(resolve(&progressing), Err(SessionError::Incomplete));
    }
}
