//! Connection fields as they were when an event was delivered.
//!
//! A connection is mutable and keeps changing after an event fires. Consumers of a
//! snapshot stream may run arbitrarily far behind the connection, so the session reads
//! the momentary fields once per event and stores them in the snapshot. Accessors then
//! answer from the snapshot, never from the live connection.

use crate::connection::{Connection, ReadyState, ResponseBody, ResponseType};

/// Momentary connection fields captured for one snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// Ready state
    pub ready_state: ReadyState,
    /// HTTP status, `0` before headers are received
    pub status: u16,
    /// HTTP status text
    pub status_text: String,
    /// Response type in effect
    pub response_type: ResponseType,
    /// Final URL after redirects
    pub response_url: String,
    /// Response body as far as it is known
    pub response: Option<ResponseBody>,
    /// Raw response header block, empty before headers are received
    pub response_headers: String,
}

impl Observation {
    /// Read every field from `connection` now.
    #[must_use]
    pub fn read<C: Connection + ?Sized>(connection: &C) -> Self {
        let ready_state = connection.ready_state();
        let response_headers = if ready_state >= ReadyState::HeadersReceived {
            connection.all_response_headers()
        } else {
            String::new()
        };
        Self {
            ready_state,
            status: connection.status(),
            status_text: connection.status_text(),
            response_type: connection.response_type(),
            response_url: connection.response_url(),
            response: connection.response(),
            response_headers,
        }
    }

    /// Value of the header `name` in the captured header block.
    ///
    /// Names match case-insensitively; repeated headers are joined with `", "`.
    #[must_use]
    pub fn response_header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .response_headers
            .split("\r\n")
            .filter_map(|line| line.split_once(':'))
            .filter(|(header, _)| header.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }
}
