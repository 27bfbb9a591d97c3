//! Starting a request from its configuration.

use crate::session::Session;
use reactive_xhr_core::{ConfigError, Connection, RequestConfig};
use std::sync::Arc;

/// Validate `config` and wrap `handle` in a session that sends the request.
///
/// Nothing touches the connection until the first subscription. Then, after the
/// listeners are attached, the connection is opened, configured (response type,
/// timeout, credentials, headers in order, MIME override) and sent.
///
/// # Errors
///
/// Returns the [`ConfigError`] of [`RequestConfig::validate`]; no session is created.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use reactive_xhr_core::{accessors, RequestConfig};
/// use reactive_xhr_runtime::{perform, SnapshotStreamExt};
///
/// let session = perform(connection, RequestConfig::get("http://localhost:3000/text"))?;
/// let bodies: Vec<_> = session.subscribe().responses().collect().await;
/// ```
#[tracing::instrument(skip_all, fields(method = %config.method(), url = %config.url))]
pub fn perform<C: Connection>(
    handle: Arc<C>,
    config: RequestConfig,
) -> Result<Session<C>, ConfigError> {
    config.validate()?;
    Ok(Session::with_start(handle, move |connection: &C| {
        initiate(connection, config);
    }))
}

fn initiate<C: Connection>(connection: &C, config: RequestConfig) {
    connection.open(
        config.method(),
        &config.url,
        config.user.as_deref(),
        config.password.as_deref(),
    );
    if let Some(response_type) = config.response_type {
        connection.set_response_type(response_type);
    }
    if let Some(timeout) = config.timeout() {
        connection.set_timeout(timeout);
    }
    if config.with_credentials {
        connection.set_with_credentials(true);
    }
    for (name, value) in &config.headers {
        connection.set_request_header(name, value);
    }
    if let Some(mime_type) = &config.override_mime_type {
        connection.override_mime_type(mime_type);
    }
    tracing::debug!(
        method = config.method(),
        url = %config.url,
        headers = config.headers.len(),
        body = config.body.as_ref().map_or(0, reactive_xhr_core::RequestBody::len),
        "Sending request"
    );
    connection.send(config.body);
}
