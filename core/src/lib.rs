//! # Reactive XHR Core
//!
//! Core types for turning a callback-driven network request into a stream of
//! immutable session snapshots.
//!
//! This crate is the pure part of the design: it never performs I/O and never
//! schedules anything. The runtime crate wires a [`Connection`] to these types.
//!
//! ## Core Concepts
//!
//! - **Event**: a raw signal from the connection ([`ProgressEvent`])
//! - **Channel State**: lifecycle of the upload or download side ([`ChannelState`])
//! - **Snapshot**: immutable `{handle, upload, download, last event, observation}` ([`Snapshot`])
//! - **Observation**: connection fields captured when an event fired ([`Observation`])
//! - **Connection**: the mutable request handle being wrapped ([`Connection`])
//! - **Accessors**: pure projections over a snapshot ([`accessors`])
//! - **Request Configuration**: validated input for starting a request ([`RequestConfig`])
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use reactive_xhr_core::{accessors, Direction, ProgressEvent, Snapshot};
//!
//! let snapshot = Snapshot::new(Arc::new(()));
//! let snapshot = snapshot.with_channel(
//!     Direction::Down,
//!     snapshot.download().advance(&ProgressEvent::progress(8, 16)),
//! );
//!
//! assert!(accessors::down_is_progressing(&snapshot));
//! assert_eq!(accessors::down_loaded(&snapshot), 8);
//! ```

/// Raw connection events
pub mod event;

/// Per-channel lifecycle state
pub mod channel;

/// Connection fields captured per event
pub mod observation;

/// Immutable session snapshots
pub mod snapshot;

/// The connection contract
pub mod connection;

/// Request configuration and validation
pub mod config;

/// Pure projections over snapshots
pub mod accessors;

// Re-export commonly used types
pub use channel::{ChannelState, ChannelTag, Direction};
pub use config::{ConfigError, RequestConfig};
pub use connection::{
    Connection, Listener, ListenerId, ReadyState, RequestBody, ResponseBody, ResponseType,
};
pub use event::{EventKind, ProgressEvent};
pub use observation::Observation;
pub use snapshot::Snapshot;
