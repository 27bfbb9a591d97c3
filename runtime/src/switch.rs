//! Restarting a request whenever its configuration changes.
//!
//! When the configuration itself arrives as a stream, only the latest one matters:
//! each new configuration cancels the in-flight session (aborting its connection if it
//! was still running) and starts a fresh one on a new connection. The multiplexer
//! itself always works on one fixed configuration.

use crate::initiator::perform;
use crate::session::SnapshotStream;
use futures::{Stream, StreamExt};
use reactive_xhr_core::{ConfigError, Connection, RequestConfig, Snapshot};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Stream returned by [`perform_latest`].
pub struct PerformLatest<S, F, C: Connection> {
    configs: S,
    connect: F,
    current: Option<SnapshotStream<C>>,
    configs_done: bool,
}

/// Perform a request for every configuration, keeping only the latest one alive.
///
/// `connect` creates a fresh connection per configuration. Snapshots of the current
/// session are yielded as `Ok`; a configuration that fails validation is yielded as
/// `Err` and leaves no session running. The stream ends once `configs` has ended and
/// the last session has ended.
pub fn perform_latest<S, F, C>(configs: S, connect: F) -> PerformLatest<S, F, C>
where
    S: Stream<Item = RequestConfig> + Unpin,
    F: FnMut() -> Arc<C> + Unpin,
    C: Connection,
{
    PerformLatest {
        configs,
        connect,
        current: None,
        configs_done: false,
    }
}

impl<S, F, C> PerformLatest<S, F, C>
where
    S: Stream<Item = RequestConfig> + Unpin,
    F: FnMut() -> Arc<C> + Unpin,
    C: Connection,
{
    fn switch_to(&mut self, config: RequestConfig) -> Result<(), ConfigError> {
        if let Some(mut previous) = self.current.take() {
            previous.unsubscribe();
        }
        // No connection is created for a configuration that cannot be sent.
        if let Err(error) = config.validate() {
            tracing::warn!(%error, "Rejected request configuration");
            return Err(error);
        }
        let session = perform((self.connect)(), config)?;
        self.current = Some(session.subscribe());
        Ok(())
    }
}

impl<S, F, C> Stream for PerformLatest<S, F, C>
where
    S: Stream<Item = RequestConfig> + Unpin,
    F: FnMut() -> Arc<C> + Unpin,
    C: Connection,
{
    type Item = Result<Snapshot<C>, ConfigError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if !this.configs_done {
                match this.configs.poll_next_unpin(cx) {
                    Poll::Ready(Some(config)) => {
                        if let Err(error) = this.switch_to(config) {
                            return Poll::Ready(Some(Err(error)));
                        }
                        continue;
                    },
                    Poll::Ready(None) => this.configs_done = true,
                    Poll::Pending => {},
                }
            }

            let Some(current) = this.current.as_mut() else {
                return if this.configs_done {
                    Poll::Ready(None)
                } else {
                    Poll::Pending
                };
            };
            match current.poll_next_unpin(cx) {
                Poll::Ready(Some(snapshot)) => return Poll::Ready(Some(Ok(snapshot))),
                Poll::Ready(None) => this.current = None,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
