//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`NotificationClient`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mercury_client::NotificationClient;
//!
//! # fn example() -> mercury_client::Result<()> {
//! let client = NotificationClient::builder()
//!     .origin("https://mail.example.com")
//!     .heartbeat_interval(Duration::from_secs(15))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::channel::ChannelOptions;
use crate::error::{Error, Result};
use crate::transport::{Connector, WsConnector};

use super::core::NotificationClient;

// ============================================================================
// Constants
// ============================================================================

/// Path of the notification socket relative to the server origin.
pub const LISTEN_PATH: &str = "/api/listen";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`NotificationClient`] instance.
///
/// Use [`NotificationClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Explicit socket URL.
    url: Option<String>,
    /// HTTP origin the socket URL is derived from.
    origin: Option<String>,
    /// Channel options.
    options: ChannelOptions,
    /// Custom connector.
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("origin", &self.origin)
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no endpoint and default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full socket URL.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` URL (e.g., "ws://localhost:8080/api/listen")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the HTTP origin of the server.
    ///
    /// The socket URL becomes `ws(s)://<host><path>/api/listen`, with the
    /// scheme following the origin's (`http` to `ws`, `https` to `wss`).
    ///
    /// # Arguments
    ///
    /// * `origin` - Server origin (e.g., "https://mail.example.com")
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the idle period after which a heartbeat is written.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options = self.options.with_heartbeat_interval(interval);
        self
    }

    /// Sets all channel options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ChannelOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the WebSocket connector.
    ///
    /// With a custom connector no endpoint is required.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client with validation. Does not connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no endpoint and no connector is set
    /// - [`Error::Config`] if both `url` and `origin` are set
    /// - [`Error::Config`] if a scheme is not supported
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Url`] if an endpoint does not parse
    pub fn build(self) -> Result<NotificationClient> {
        self.options.validate().map_err(Error::config)?;
        let endpoint = self.validate_endpoint()?;

        let connector: Arc<dyn Connector> = match (self.connector, endpoint) {
            (Some(connector), _) => connector,
            (None, Some(url)) => Arc::new(WsConnector::new(url)),
            (None, None) => {
                return Err(Error::config(
                    "Notification endpoint is required. Use .url() or .origin() to set it.\n\
                     Example: NotificationClient::builder().origin(\"http://localhost:8080\")",
                ));
            }
        };

        Ok(NotificationClient::new(connector, self.options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Resolves the socket URL from `url` or `origin`.
    fn validate_endpoint(&self) -> Result<Option<Url>> {
        match (&self.url, &self.origin) {
            (Some(_), Some(_)) => Err(Error::config("Set either .url() or .origin(), not both")),
            (Some(url), None) => {
                let url = Url::parse(url)?;
                match url.scheme() {
                    "ws" | "wss" => Ok(Some(url)),
                    other => Err(Error::config(format!(
                        "Unsupported socket scheme '{other}'. Expected ws or wss."
                    ))),
                }
            }
            (None, Some(origin)) => listen_url(&Url::parse(origin)?).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// Derives the notification socket URL from an HTTP origin.
fn listen_url(origin: &Url) -> Result<Url> {
    let scheme = match origin.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::config(format!(
                "Unsupported origin scheme '{other}'. Expected http or https."
            )));
        }
    };

    let mut url = origin.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("Cannot derive {scheme} URL from {origin}")))?;
    url.set_path(&format!("{}{LISTEN_PATH}", origin.path().trim_end_matches('/')));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
