//! In-memory connection for testing sessions
//!
//! [`MockConnection`] implements [`Connection`] without any network. It records every
//! call made on it and, when sent, plays a scripted [`Reply`] by dispatching the same
//! event sequence a browser request would, synchronously and in order.

#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use reactive_xhr_core::{
    Connection, Direction, EventKind, Listener, ListenerId, ProgressEvent, ReadyState,
    RequestBody, ResponseBody, ResponseType,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How a [`MockConnection`] answers once sent.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Answer with a text body
    Text {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },
    /// Answer with a JSON body, decoded if the response type is `json`
    Json {
        /// HTTP status
        status: u16,
        /// Response body
        value: serde_json::Value,
    },
    /// Report a timeout after the request started
    Timeout,
    /// Report a network error with the given message
    NetworkError(String),
    /// Start the request and never answer; drive it with [`MockConnection::dispatch`]
    Pending,
}

impl Reply {
    /// `200 OK` with a text body.
    #[must_use]
    pub fn ok_text(body: impl Into<String>) -> Self {
        Self::Text {
            status: 200,
            body: body.into(),
        }
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub const fn ok_json(value: serde_json::Value) -> Self {
        Self::Json { status: 200, value }
    }
}

/// A call made on a [`MockConnection`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// `open`
    Open {
        /// Method
        method: String,
        /// URL
        url: String,
        /// User
        user: Option<String>,
        /// Password
        password: Option<String>,
    },
    /// `set_response_type`
    SetResponseType(ResponseType),
    /// `set_timeout`
    SetTimeout(Duration),
    /// `set_with_credentials`
    SetWithCredentials(bool),
    /// `set_request_header`
    SetRequestHeader {
        /// Header name
        name: String,
        /// Header value
        value: String,
    },
    /// `override_mime_type`
    OverrideMimeType(String),
    /// `send`
    Send(Option<RequestBody>),
    /// `abort`
    Abort,
}

struct Registration {
    id: ListenerId,
    direction: Direction,
    kind: EventKind,
    listener: Listener,
}

struct MockState {
    reply: Reply,
    registrations: Vec<Registration>,
    next_listener: u64,
    calls: Vec<Call>,
    abort_count: usize,
    in_flight: bool,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    response: Option<ResponseBody>,
    response_type: ResponseType,
    response_url: String,
    url: String,
    headers: Vec<(String, String)>,
}

/// Scripted in-memory [`Connection`].
///
/// Listeners run synchronously on the thread that triggers an event, with no lock
/// held, so they may call back into the connection.
///
/// # Example
///
/// ```
/// use reactive_xhr_core::{Connection, Direction, EventKind, ProgressEvent};
/// use reactive_xhr_testing::mocks::{MockConnection, Reply};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let connection = MockConnection::replying(Reply::ok_text("Hello, world!"));
/// let loads = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&loads);
/// connection.add_listener(
///     Direction::Down,
///     EventKind::Load,
///     Arc::new(move |_: &ProgressEvent| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }),
/// );
///
/// connection.open("GET", "http://localhost:3000/text", None, None);
/// connection.send(None);
/// assert_eq!(loads.load(Ordering::SeqCst), 1);
/// ```
pub struct MockConnection {
    state: Mutex<MockState>,
}

impl MockConnection {
    /// A connection that never answers on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::replying(Reply::Pending)
    }

    /// A connection that plays `reply` when sent.
    #[must_use]
    pub fn replying(reply: Reply) -> Self {
        Self {
            state: Mutex::new(MockState {
                reply,
                registrations: Vec::new(),
                next_listener: 0,
                calls: Vec::new(),
                abort_count: 0,
                in_flight: false,
                ready_state: ReadyState::Unsent,
                status: 0,
                status_text: String::new(),
                response: None,
                response_type: ResponseType::Text,
                response_url: String::new(),
                url: String::new(),
                headers: Vec::new(),
            }),
        }
    }

    /// Add a response header reported once headers are received.
    #[must_use]
    pub fn with_response_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().headers.push((name.into(), value.into()));
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of `abort` calls.
    #[must_use]
    pub fn abort_count(&self) -> usize {
        self.lock().abort_count
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Check if `send` was called
    #[must_use]
    pub fn was_sent(&self) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| matches!(call, Call::Send(_)))
    }

    /// Deliver `event` to the listeners registered for its kind on `direction`.
    ///
    /// A listener removed by an earlier listener of the same dispatch is skipped.
    pub fn dispatch(&self, direction: Direction, event: &ProgressEvent) {
        let matching: Vec<(ListenerId, Listener)> = self
            .lock()
            .registrations
            .iter()
            .filter(|r| r.direction == direction && r.kind == event.kind)
            .map(|r| (r.id, Listener::clone(&r.listener)))
            .collect();
        for (id, listener) in matching {
            let registered = self.lock().registrations.iter().any(|r| r.id == id);
            if registered {
                listener(event);
            }
        }
    }

    /// Move to `ready_state` and dispatch `readystatechange`.
    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.lock().ready_state = ready_state;
        self.dispatch(Direction::Down, &ProgressEvent::ready_state_change());
    }

    /// Set the status reported from now on.
    pub fn set_status(&self, status: u16, status_text: impl Into<String>) {
        let mut state = self.lock();
        state.status = status;
        state.status_text = status_text.into();
    }

    /// Set the response body reported from now on.
    pub fn set_response(&self, response: Option<ResponseBody>) {
        self.lock().response = response;
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn play_upload(&self, body: &RequestBody) {
        let size = body.len() as u64;
        self.dispatch(Direction::Up, &ProgressEvent::load_start());
        self.dispatch(Direction::Up, &ProgressEvent::progress(size, size));
        self.dispatch(Direction::Up, &ProgressEvent::load(size, size));
        self.dispatch(Direction::Up, &ProgressEvent::load_end());
    }

    fn receive_headers(&self, status: u16) {
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.status = status;
            state.status_text = status_text(status).to_string();
            state.response_url.clone_from(&state.url);
        }
        self.set_ready_state(ReadyState::HeadersReceived);
        self.set_ready_state(ReadyState::Loading);
    }

    fn finish(&self, outcome: &ProgressEvent) {
        {
            let mut state = self.lock();
            state.in_flight = false;
            state.ready_state = ReadyState::Done;
        }
        self.dispatch(Direction::Down, &ProgressEvent::ready_state_change());
        self.dispatch(Direction::Down, outcome);
        self.dispatch(Direction::Down, &ProgressEvent::load_end());
    }

    fn play(&self, reply: Reply) {
        match reply {
            Reply::Text { status, body } => {
                let size = body.len() as u64;
                self.receive_headers(status);
                self.dispatch(Direction::Down, &ProgressEvent::progress(size, size));
                self.set_response(Some(ResponseBody::Text(body)));
                self.finish(&ProgressEvent::load(size, size));
            },
            Reply::Json { status, value } => {
                let text = value.to_string();
                let size = text.len() as u64;
                self.receive_headers(status);
                self.dispatch(Direction::Down, &ProgressEvent::progress(size, size));
                let response = if self.response_type() == ResponseType::Json {
                    ResponseBody::Json(value)
                } else {
                    ResponseBody::Text(text)
                };
                self.set_response(Some(response));
                self.finish(&ProgressEvent::load(size, size));
            },
            Reply::Timeout => self.finish(&ProgressEvent::timeout()),
            Reply::NetworkError(message) => self.finish(&ProgressEvent::error(message)),
            Reply::Pending => {},
        }
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MockConnection")
            .field("reply", &state.reply)
            .field("ready_state", &state.ready_state)
            .field("listeners", &state.registrations.len())
            .field("abort_count", &state.abort_count)
            .finish_non_exhaustive()
    }
}

impl Connection for MockConnection {
    fn add_listener(
        &self,
        direction: Direction,
        kind: EventKind,
        listener: Listener,
    ) -> ListenerId {
        let mut state = self.lock();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;
        state.registrations.push(Registration {
            id,
            direction,
            kind,
            listener,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.lock().registrations.retain(|r| r.id != id);
    }

    fn open(&self, method: &str, url: &str, user: Option<&str>, password: Option<&str>) {
        {
            let mut state = self.lock();
            state.url = url.to_string();
            state.calls.push(Call::Open {
                method: method.to_string(),
                url: url.to_string(),
                user: user.map(str::to_string),
                password: password.map(str::to_string),
            });
        }
        self.set_ready_state(ReadyState::Opened);
    }

    fn set_response_type(&self, response_type: ResponseType) {
        self.lock().response_type = response_type;
        self.record(Call::SetResponseType(response_type));
    }

    fn set_timeout(&self, timeout: Duration) {
        self.record(Call::SetTimeout(timeout));
    }

    fn set_with_credentials(&self, with_credentials: bool) {
        self.record(Call::SetWithCredentials(with_credentials));
    }

    fn set_request_header(&self, name: &str, value: &str) {
        self.record(Call::SetRequestHeader {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn override_mime_type(&self, mime_type: &str) {
        self.record(Call::OverrideMimeType(mime_type.to_string()));
    }

    fn send(&self, body: Option<RequestBody>) {
        let reply = {
            let mut state = self.lock();
            state.calls.push(Call::Send(body.clone()));
            state.in_flight = true;
            state.reply.clone()
        };
        self.dispatch(Direction::Down, &ProgressEvent::load_start());
        if let Some(body) = body.as_ref().filter(|body| !body.is_empty()) {
            self.play_upload(body);
        }
        self.play(reply);
    }

    fn abort(&self) {
        let was_in_flight = {
            let mut state = self.lock();
            state.calls.push(Call::Abort);
            state.abort_count += 1;
            std::mem::replace(&mut state.in_flight, false)
        };
        if was_in_flight {
            self.lock().ready_state = ReadyState::Done;
            self.dispatch(Direction::Down, &ProgressEvent::ready_state_change());
            self.dispatch(Direction::Down, &ProgressEvent::abort());
            self.dispatch(Direction::Down, &ProgressEvent::load_end());
        }
        self.lock().ready_state = ReadyState::Unsent;
    }

    fn ready_state(&self) -> ReadyState {
        self.lock().ready_state
    }

    fn status(&self) -> u16 {
        self.lock().status
    }

    fn status_text(&self) -> String {
        self.lock().status_text.clone()
    }

    fn response(&self) -> Option<ResponseBody> {
        self.lock().response.clone()
    }

    fn response_type(&self) -> ResponseType {
        self.lock().response_type
    }

    fn response_url(&self) -> String {
        self.lock().response_url.clone()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        let state = self.lock();
        if state.ready_state < ReadyState::HeadersReceived {
            return None;
        }
        state
            .headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn all_response_headers(&self) -> String {
        let state = self.lock();
        if state.ready_state < ReadyState::HeadersReceived {
            return String::new();
        }
        state
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {value}\r\n", name.to_ascii_lowercase()))
            .collect()
    }
}

const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(connection: &MockConnection, direction: Direction) -> Arc<Mutex<Vec<EventKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [
            EventKind::LoadStart,
            EventKind::Progress,
            EventKind::Load,
            EventKind::Error,
            EventKind::Timeout,
            EventKind::Abort,
            EventKind::ReadyStateChange,
            EventKind::LoadEnd,
        ] {
            let seen = Arc::clone(&seen);
            connection.add_listener(
                direction,
                kind,
                Arc::new(move |event: &ProgressEvent| seen.lock().unwrap().push(event.kind)),
            );
        }
        seen
    }

    #[test]
    fn test_text_reply_sequence() {
        let connection = MockConnection::replying(Reply::ok_text("Hello, world!"));
        let seen = recorder(&connection, Direction::Down);

        connection.open("GET", "http://localhost:3000/text", None, None);
        connection.send(None);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::ReadyStateChange,
                EventKind::LoadStart,
                EventKind::ReadyStateChange,
                EventKind::ReadyStateChange,
                EventKind::Progress,
                EventKind::ReadyStateChange,
                EventKind::Load,
                EventKind::LoadEnd,
            ]
        );
        assert_eq!(connection.status(), 200);
        assert_eq!(connection.status_text(), "OK");
        assert_eq!(connection.response_url(), "http://localhost:3000/text");
        assert_eq!(
            connection.response(),
            Some(ResponseBody::from("Hello, world!"))
        );
    }

    #[test]
    fn test_upload_events_only_with_body() {
        let connection = MockConnection::replying(Reply::ok_text("stored"));
        let upload = recorder(&connection, Direction::Up);
        connection.send(Some(RequestBody::from("payload")));
        assert_eq!(
            *upload.lock().unwrap(),
            vec![
                EventKind::LoadStart,
                EventKind::Progress,
                EventKind::Load,
                EventKind::LoadEnd,
            ]
        );

        let connection = MockConnection::replying(Reply::ok_text("none"));
        let upload = recorder(&connection, Direction::Up);
        connection.send(None);
        assert!(upload.lock().unwrap().is_empty());
    }

    #[test]
    fn test_json_reply_follows_response_type() {
        let value = serde_json::json!({"user": "world"});
        let connection = MockConnection::replying(Reply::ok_json(value.clone()));
        connection.set_response_type(ResponseType::Json);
        connection.send(None);
        assert_eq!(connection.response(), Some(ResponseBody::Json(value)));

        let connection = MockConnection::replying(Reply::ok_json(serde_json::json!([1])));
        connection.send(None);
        assert_eq!(connection.response(), Some(ResponseBody::from("[1]")));
    }

    #[test]
    fn test_abort_in_flight_dispatches_abort_once() {
        let connection = MockConnection::new();
        let seen = recorder(&connection, Direction::Down);
        connection.send(None);
        connection.abort();
        connection.abort();

        let kinds = seen.lock().unwrap().clone();
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::Abort).count(),
            1
        );
        assert_eq!(connection.abort_count(), 2);
        assert_eq!(connection.ready_state(), ReadyState::Unsent);
    }

    #[test]
    fn test_removed_listener_is_skipped_within_dispatch() {
        let connection = Arc::new(MockConnection::new());
        let fired = Arc::new(Mutex::new(0));
        let second = Arc::new(Mutex::new(None::<ListenerId>));

        let remover = {
            let connection = Arc::clone(&connection);
            let second = Arc::clone(&second);
            Arc::new(move |_: &ProgressEvent| {
                if let Some(id) = *second.lock().unwrap() {
                    connection.remove_listener(id);
                }
            })
        };
        connection.add_listener(Direction::Down, EventKind::Load, remover);
        let counter = Arc::clone(&fired);
        let id = connection.add_listener(
            Direction::Down,
            EventKind::Load,
            Arc::new(move |_: &ProgressEvent| *counter.lock().unwrap() += 1),
        );
        *second.lock().unwrap() = Some(id);

        connection.dispatch(Direction::Down, &ProgressEvent::load(0, 0));
        assert_eq!(*fired.lock().unwrap(), 0);
        assert_eq!(connection.listener_count(), 1);
    }

    #[test]
    fn test_headers_hidden_until_received() {
        let connection = MockConnection::replying(Reply::ok_text("{}"))
            .with_response_header("Content-Type", "application/json");
        assert_eq!(connection.response_header("content-type"), None);
        assert_eq!(connection.all_response_headers(), "");

        connection.send(None);
        assert_eq!(
            connection.response_header("content-type"),
            Some("application/json".to_string())
        );
        assert_eq!(
            connection.all_response_headers(),
            "content-type: application/json\r\n"
        );
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let connection = MockConnection::new();
        connection.open("POST", "/upload", Some("user"), None);
        connection.set_request_header("X-Trace", "1");
        connection.set_timeout(Duration::from_millis(50));
        connection.send(Some(RequestBody::from("x")));

        assert_eq!(
            connection.calls(),
            vec![
                Call::Open {
                    method: "POST".to_string(),
                    url: "/upload".to_string(),
                    user: Some("user".to_string()),
                    password: None,
                },
                Call::SetRequestHeader {
                    name: "X-Trace".to_string(),
                    value: "1".to_string(),
                },
                Call::SetTimeout(Duration::from_millis(50)),
                Call::Send(Some(RequestBody::from("x"))),
            ]
        );
        assert!(connection.was_sent());
    }
}
