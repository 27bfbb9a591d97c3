//! Integration tests for restarting requests on configuration changes

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::channel::mpsc;
use futures::{StreamExt, future, stream};
use reactive_xhr_core::{ConfigError, Direction, ProgressEvent, RequestConfig, ResponseBody};
use reactive_xhr_runtime::{SnapshotStreamExt, perform_latest};
use reactive_xhr_testing::{MockConnection, Reply, init_test_tracing};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_test::{assert_pending, assert_ready};

/// Hands out connections in order and keeps them for inspection.
#[derive(Clone, Default)]
struct Connections {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    created: Arc<Mutex<Vec<Arc<MockConnection>>>>,
}

impl Connections {
    fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let connections = Self::default();
        connections.replies.lock().unwrap().extend(replies);
        connections
    }

    fn factory(&self) -> impl FnMut() -> Arc<MockConnection> + Unpin + use<> {
        let this = self.clone();
        move || {
            let reply = this.replies.lock().unwrap().pop_front().unwrap_or(Reply::Pending);
            let connection = Arc::new(MockConnection::replying(reply));
            this.created.lock().unwrap().push(Arc::clone(&connection));
            connection
        }
    }

    fn get(&self, index: usize) -> Arc<MockConnection> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }

    fn len(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[tokio::test]
async fn test_only_latest_response_reaches_consumer() {
    init_test_tracing();
    let connections = Connections::with_replies([Reply::ok_text("first"), Reply::ok_text("second")]);
    let configs = stream::iter([
        RequestConfig::get("http://localhost:3000/first"),
        RequestConfig::get("http://localhost:3000/second"),
    ]);

    let bodies: Vec<ResponseBody> = perform_latest(configs, connections.factory())
        .filter_map(|item| future::ready(item.ok()))
        .responses()
        .collect()
        .await;

    assert_eq!(bodies, vec![ResponseBody::from("second")]);
    assert_eq!(connections.len(), 2);
    // The first request had already completed when it was replaced.
    assert_eq!(connections.get(0).abort_count(), 0);
}

#[test]
fn test_new_config_aborts_in_flight_request() {
    let connections = Connections::default();
    let (sender, receiver) = mpsc::unbounded();
    let mut latest = tokio_test::task::spawn(perform_latest(receiver, connections.factory()));

    assert_pending!(latest.poll_next());

    sender
        .unbounded_send(RequestConfig::get("http://localhost:3000/slow"))
        .unwrap();
    assert!(assert_ready!(latest.poll_next()).unwrap().is_ok());

    sender
        .unbounded_send(RequestConfig::get("http://localhost:3000/fast"))
        .unwrap();
    let snapshot = assert_ready!(latest.poll_next()).unwrap().unwrap();
    assert!(std::ptr::eq(
        snapshot.handle().as_ref(),
        connections.get(1).as_ref()
    ));
    assert_eq!(connections.get(0).abort_count(), 1);
    assert_eq!(connections.get(0).listener_count(), 0);

    // Drain the second request, then let it complete.
    while let std::task::Poll::Ready(Some(_)) = latest.poll_next() {}
    drop(sender);
    assert_pending!(latest.poll_next());
    connections
        .get(1)
        .dispatch(Direction::Down, &ProgressEvent::load_end());

    let terminal = assert_ready!(latest.poll_next()).unwrap().unwrap();
    assert!(terminal.is_terminal());
    assert!(assert_ready!(latest.poll_next()).is_none());
    assert_eq!(connections.get(1).abort_count(), 0);
}

#[test]
fn test_invalid_config_yields_error_and_stops_previous() {
    let connections = Connections::default();
    let (sender, receiver) = mpsc::unbounded();
    let mut latest = tokio_test::task::spawn(perform_latest(receiver, connections.factory()));

    sender
        .unbounded_send(RequestConfig::get("http://localhost:3000/slow"))
        .unwrap();
    assert!(assert_ready!(latest.poll_next()).unwrap().is_ok());

    sender.unbounded_send(RequestConfig::new("")).unwrap();
    let mut error = None;
    while let std::task::Poll::Ready(Some(item)) = latest.poll_next() {
        if let Err(e) = item {
            error = Some(e);
            break;
        }
    }
    assert_eq!(error, Some(ConfigError::MissingUrl));
    assert_eq!(connections.get(0).abort_count(), 1);
    // The rejected configuration never got a connection.
    assert_eq!(connections.len(), 1);

    drop(sender);
    assert!(assert_ready!(latest.poll_next()).is_none());
}
