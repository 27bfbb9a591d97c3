//! The contract a wrapped network request object fulfils.
//!
//! A [`Connection`] is the mutable, callback-driven handle of one request: listeners
//! are registered per direction and event kind, the request is configured and sent,
//! and response fields are read at whatever moment the caller asks. The session runtime
//! never mutates a connection beyond registering listeners, starting it and aborting
//! it.
//!
//! # Implementations
//!
//! - `MockConnection` in `reactive-xhr-testing` - scripted, in-memory
//! - a browser `XMLHttpRequest` binding, or any client that reports the same events

use crate::channel::Direction;
use crate::event::{EventKind, ProgressEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Callback invoked by a connection for each delivered event.
pub type Listener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Identifies a registered listener so it can be removed again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Progress of the connection as a whole.
///
/// Ordered: later states compare greater.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ReadyState {
    /// Not opened yet
    #[default]
    Unsent = 0,
    /// `open` was called
    Opened = 1,
    /// Status line and headers are available
    HeadersReceived = 2,
    /// The body is arriving
    Loading = 3,
    /// The operation is complete (successfully or not)
    Done = 4,
}

impl ReadyState {
    /// Numeric value as exposed by `XMLHttpRequest.readyState`.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Error type for [`ResponseType`] parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown response type: {0}")]
pub struct ParseResponseTypeError(String);

/// How the connection should decode the response body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Plain text, spelled as the empty string on the wire
    #[default]
    #[serde(alias = "")]
    Text,
    /// Parsed JSON
    Json,
    /// Raw bytes
    #[serde(rename = "arraybuffer")]
    ArrayBuffer,
    /// Opaque binary object
    Blob,
    /// Parsed markup document
    Document,
}

impl ResponseType {
    /// Wire name of the response type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::ArrayBuffer => "arraybuffer",
            Self::Blob => "blob",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = ParseResponseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "arraybuffer" => Ok(Self::ArrayBuffer),
            "blob" => Ok(Self::Blob),
            "document" => Ok(Self::Document),
            other => Err(ParseResponseTypeError(other.to_string())),
        }
    }
}

/// A decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// Text body
    Text(String),
    /// JSON body, already parsed
    Json(serde_json::Value),
    /// Binary body
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// The body as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The body as JSON, if it is JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// A request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// Text payload
    Text(String),
    /// Binary payload
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    /// Check if the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A mutable network request handle.
///
/// Implementations deliver events by calling registered listeners synchronously.
/// They must tolerate a listener removing listeners (itself included) from inside a
/// dispatch, and `abort` may dispatch events re-entrantly.
///
/// Momentary reads reflect whatever the handle knows right now; fields that are not
/// available yet report their empty value (`0`, `""`, `None`).
pub trait Connection: Send + Sync + 'static {
    /// Register `listener` for events of `kind` on `direction`.
    ///
    /// `Direction::Down` is the connection itself, `Direction::Up` its upload target.
    fn add_listener(
        &self,
        direction: Direction,
        kind: EventKind,
        listener: Listener,
    ) -> ListenerId;

    /// Remove a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Initialise the request.
    fn open(&self, method: &str, url: &str, user: Option<&str>, password: Option<&str>);

    /// Select how the body is decoded.
    fn set_response_type(&self, response_type: ResponseType);

    /// Set the deadline after which the connection reports a timeout.
    fn set_timeout(&self, timeout: Duration);

    /// Send credentials on cross-origin requests.
    fn set_with_credentials(&self, with_credentials: bool);

    /// Append a request header.
    fn set_request_header(&self, name: &str, value: &str);

    /// Override the MIME type reported by the server.
    fn override_mime_type(&self, mime_type: &str);

    /// Start the request.
    fn send(&self, body: Option<RequestBody>);

    /// Cancel the request.
    fn abort(&self);

    /// Current ready state.
    fn ready_state(&self) -> ReadyState;

    /// HTTP status, `0` before headers are received.
    fn status(&self) -> u16;

    /// HTTP status text, empty before headers are received.
    fn status_text(&self) -> String;

    /// Decoded response body, if any.
    fn response(&self) -> Option<ResponseBody>;

    /// Response type in effect.
    fn response_type(&self) -> ResponseType;

    /// Final URL after redirects, empty before headers are received.
    fn response_url(&self) -> String;

    /// Value of one response header.
    fn response_header(&self, name: &str) -> Option<String>;

    /// Raw response header block.
    fn all_response_headers(&self) -> String;
}
