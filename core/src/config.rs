//! Request configuration.
//!
//! [`RequestConfig`] is the normalized description of one request. It can be built in
//! code or parsed from JSON; either way [`RequestConfig::validate`] runs before a
//! session is created so malformed input fails fast.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use reactive_xhr_core::config::RequestConfig;
//! use reactive_xhr_core::connection::ResponseType;
//!
//! let config = RequestConfig::new("http://localhost:3000/json")
//!     .with_header("user", "mocha")
//!     .with_response_type(ResponseType::Json)
//!     .with_timeout(Duration::from_secs(10));
//! assert!(config.validate().is_ok());
//!
//! let parsed = RequestConfig::from_json(
//!     r#"{"url": "http://localhost:3000/json", "responseType": "json", "timeout": 10000,
//!         "headers": [["user", "mocha"]]}"#,
//! )
//! .unwrap();
//! assert_eq!(parsed, config);
//! ```

use crate::connection::{RequestBody, ResponseType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised for a configuration that cannot start a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The URL is empty
    #[error("Request URL is empty")]
    MissingUrl,

    /// The method is not an HTTP token
    #[error("Invalid request method: {0:?}")]
    InvalidMethod(String),

    /// A header name is not an HTTP token
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// A password was given without a user
    #[error("Password given without a user")]
    PasswordWithoutUser,

    /// The JSON form could not be parsed
    #[error("Malformed request configuration: {0}")]
    Malformed(String),
}

/// Normalized configuration of one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestConfig {
    /// Target URL
    pub url: String,

    /// HTTP method; empty means `GET`
    #[serde(default)]
    pub method: String,

    /// User for authentication
    #[serde(default)]
    pub user: Option<String>,

    /// Password for authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Request headers, sent in order
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// MIME type to use instead of the server's
    #[serde(default)]
    pub override_mime_type: Option<String>,

    /// Request body
    #[serde(default)]
    pub body: Option<RequestBody>,

    /// How the response body should be decoded
    #[serde(default)]
    pub response_type: Option<ResponseType>,

    /// Deadline in milliseconds
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,

    /// Send credentials on cross-origin requests
    #[serde(default)]
    pub with_credentials: bool,
}

impl RequestConfig {
    /// A request with defaults for everything but the URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: String::new(),
            user: None,
            password: None,
            headers: Vec::new(),
            override_mime_type: None,
            body: None,
            response_type: None,
            timeout_ms: None,
            with_credentials: false,
        }
    }

    /// A `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).with_method("GET")
    }

    /// A `POST` request with a body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<RequestBody>) -> Self {
        Self::new(url).with_method("POST").with_body(body)
    }

    /// Parse and validate the JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] for unknown fields or wrongly typed values,
    /// or any error of [`RequestConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the method
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set user and password
    #[must_use]
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Append a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the response MIME type
    #[must_use]
    pub fn with_override_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.override_mime_type = Some(mime_type.into());
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the response type
    #[must_use]
    pub const fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Set the deadline
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Deadlines beyond u64 milliseconds are not meaningful
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Send credentials on cross-origin requests
    #[must_use]
    pub const fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// The method to send, `GET` when none was given.
    #[must_use]
    pub fn method(&self) -> &str {
        if self.method.is_empty() {
            "GET"
        } else {
            &self.method
        }
    }

    /// The deadline, if any. A timeout of zero means none.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }

    /// Check the configuration can start a request.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingUrl`] if the URL is empty
    /// - [`ConfigError::InvalidMethod`] if the method is not an HTTP token
    /// - [`ConfigError::InvalidHeaderName`] if a header name is not an HTTP token
    /// - [`ConfigError::PasswordWithoutUser`] if only a password is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if !is_token(self.method()) {
            return Err(ConfigError::InvalidMethod(self.method.clone()));
        }
        if let Some((name, _)) = self.headers.iter().find(|(name, _)| !is_token(name)) {
            return Err(ConfigError::InvalidHeaderName(name.clone()));
        }
        if self.password.is_some() && self.user.is_none() {
            return Err(ConfigError::PasswordWithoutUser);
        }
        Ok(())
    }
}

/// RFC 7230 `token`: one or more visible ASCII characters excluding separators.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RequestConfig::new("http://localhost:3000/text");
        assert_eq!(config.method(), "GET");
        assert!(config.headers.is_empty());
        assert!(config.timeout().is_none());
        assert!(!config.with_credentials);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = RequestConfig::post("http://localhost:3000/echo", r#"{"returnTo":"sender"}"#)
            .with_basic_auth("browser", "testing")
            .with_header("user", "mocha")
            .with_header("accept", "application/json")
            .with_override_mime_type("text/plain")
            .with_timeout(Duration::from_millis(200))
            .with_credentials(true);

        assert_eq!(config.method(), "POST");
        assert_eq!(config.user.as_deref(), Some("browser"));
        assert_eq!(config.headers[1].0, "accept");
        assert_eq!(config.timeout(), Some(Duration::from_millis(200)));
        assert!(config.with_credentials);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_url() {
        assert_eq!(
            RequestConfig::new("").validate(),
            Err(ConfigError::MissingUrl)
        );
    }

    #[test]
    fn rejects_bad_method_and_header() {
        let config = RequestConfig::new("http://x").with_method("GE T");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMethod(_))));

        let config = RequestConfig::new("http://x").with_header("bad header", "v");
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHeaderName("bad header".to_string()))
        );
    }

    #[test]
    fn rejects_password_without_user() {
        let mut config = RequestConfig::new("http://x");
        config.password = Some("secret".to_string());
        assert_eq!(config.validate(), Err(ConfigError::PasswordWithoutUser));
    }

    #[test]
    fn zero_timeout_means_none() {
        let parsed = RequestConfig::from_json(r#"{"url": "http://x", "timeout": 0}"#);
        assert_eq!(parsed.map(|config| config.timeout()), Ok(None));

        let config = RequestConfig::new("http://x").with_timeout(Duration::ZERO);
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn json_rejects_unknown_fields_and_wrong_types() {
        assert!(matches!(
            RequestConfig::from_json("{}"),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            RequestConfig::from_json(
                r#"{"url": {"not": "a string"}, "withCredentials": "not boolean", "unknownParameter": "bar"}"#
            ),
            Err(ConfigError::Malformed(_))
        ));
        assert!(matches!(
            RequestConfig::from_json(r#"{"url": "http://x", "unknownParameter": "bar"}"#),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn json_full_form() {
        let config = RequestConfig::from_json(
            r#"{
                "url": "http://localhost:3000/echo",
                "method": "POST",
                "user": "browser",
                "password": "testing",
                "headers": [["user", "mocha"]],
                "overrideMimeType": "text/plain",
                "body": "{\"returnTo\":\"sender\"}",
                "responseType": "json",
                "timeout": 2000,
                "withCredentials": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.method(), "POST");
        assert_eq!(config.response_type, Some(ResponseType::Json));
        assert_eq!(config.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(
            config.body,
            Some(RequestBody::Text(r#"{"returnTo":"sender"}"#.to_string()))
        );
    }
}
