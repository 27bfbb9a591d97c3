//! # Reactive XHR Testing
//!
//! Testing utilities and helpers for reactive XHR sessions.
//!
//! This crate provides:
//! - A scripted in-memory [`Connection`](reactive_xhr_core::Connection)
//! - Test helpers for tracing output
//! - Property-based testing strategies for events and event scripts
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use reactive_xhr_core::RequestConfig;
//! use reactive_xhr_runtime::{perform, SnapshotStreamExt};
//! use reactive_xhr_testing::{MockConnection, Reply};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_hello_world() {
//!     let connection = Arc::new(MockConnection::replying(Reply::ok_text("Hello, world!")));
//!     let session = perform(connection, RequestConfig::get("http://localhost:3000/text")).unwrap();
//!
//!     let bodies: Vec<_> = session.subscribe().responses().collect().await;
//!     assert_eq!(bodies.len(), 1);
//! }
//! ```

/// Scripted in-memory connection
pub mod connection_mocks;

/// Mock implementations of the connection contract.
pub mod mocks {
    pub use super::connection_mocks::{Call, MockConnection, Reply};
}

/// Test helpers and utilities.
pub mod helpers {
    /// Route `tracing` output through the test harness.
    ///
    /// Honours `RUST_LOG`, defaulting to `debug` for the session crates. Safe to call
    /// from every test; only the first call installs the subscriber.
    pub fn init_test_tracing() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "reactive_xhr_runtime=debug".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use reactive_xhr_core::{Direction, EventKind, ProgressEvent};

    /// Any event kind.
    pub fn arb_event_kind() -> impl Strategy<Value = EventKind> {
        prop_oneof![
            Just(EventKind::LoadStart),
            Just(EventKind::Progress),
            Just(EventKind::Timeout),
            Just(EventKind::Load),
            Just(EventKind::Error),
            Just(EventKind::Abort),
            Just(EventKind::ReadyStateChange),
            Just(EventKind::LoadEnd),
        ]
    }

    /// Either direction.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![Just(Direction::Up), Just(Direction::Down)]
    }

    /// An event of a lifecycle kind with consistent byte counters.
    pub fn arb_lifecycle_event() -> impl Strategy<Value = ProgressEvent> {
        (
            proptest::sample::select(EventKind::LIFECYCLE.to_vec()),
            0u64..4096,
            0u64..4096,
        )
            .prop_map(|(kind, a, b)| {
                let event = ProgressEvent::new(kind).with_bytes(a.min(b), a.max(b));
                if kind == EventKind::Error {
                    ProgressEvent {
                        error: Some("network error".to_string()),
                        ..event
                    }
                } else {
                    event
                }
            })
    }

    /// A script of channel events to dispatch, in order.
    pub fn arb_event_script(max_len: usize) -> impl Strategy<Value = Vec<(Direction, ProgressEvent)>> {
        proptest::collection::vec((arb_direction(), arb_lifecycle_event()), 0..max_len)
    }

    /// A status code, successful or not.
    pub fn arb_status() -> impl Strategy<Value = u16> {
        prop_oneof![100u16..600, Just(0u16)]
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use mocks::{Call, MockConnection, Reply};

#[cfg(test)]
mod tests {
    use super::properties::*;
    use proptest::prelude::*;
    use reactive_xhr_core::EventKind;

    proptest! {
        #[test]
        fn test_lifecycle_events_have_consistent_counters(event in arb_lifecycle_event()) {
            prop_assert!(event.kind.is_lifecycle());
            prop_assert!(event.loaded <= event.total);
            prop_assert_eq!(event.error.is_some(), event.kind == EventKind::Error);
        }

        #[test]
        fn test_event_script_respects_length(script in arb_event_script(8)) {
            prop_assert!(script.len() < 8);
        }
    }
}
