//! Builder pattern for socket configuration.
//!
//! # Example
//!
//! ```no_run
//! use queued_websocket::{LimitedReconnect, Socket};
//!
//! # async fn example() -> queued_websocket::Result<()> {
//! let socket = Socket::builder("wss://example.com/feed")
//!     .reconnectable_code(1006)
//!     .reconnect_policy(LimitedReconnect::new(3))
//!     .notify_hook(|| println!("refresh"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::transport::{Connector, TungsteniteConnector};

use super::Socket;
use super::dispatcher::NotifyHook;
use super::options::SocketOptions;
use super::reconnect::{ManualReconnect, ReconnectPolicy};

// ============================================================================
// SocketBuilder
// ============================================================================

/// Builder for configuring a [`Socket`].
///
/// Use [`Socket::builder()`] to create a new builder.
#[must_use]
pub struct SocketBuilder {
    /// Target URL, validated on build.
    url: String,
    /// Scheme and reconnect configuration.
    options: SocketOptions,
    /// Transport factory.
    connector: Arc<dyn Connector>,
    /// Reconnect decision procedure.
    policy: Arc<dyn ReconnectPolicy>,
    /// Host notify hook for auto-notify registrations.
    notify: Option<Arc<dyn NotifyHook>>,
}

impl SocketBuilder {
    /// Creates a builder for `url` with default configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: SocketOptions::default(),
            connector: Arc::new(TungsteniteConnector),
            policy: Arc::new(ManualReconnect),
            notify: None,
        }
    }

    /// Replaces all options.
    pub fn options(mut self, options: SocketOptions) -> Self {
        self.options = options;
        self
    }

    /// Accepts one more URL scheme.
    pub fn allowed_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.options = self.options.with_allowed_scheme(scheme);
        self
    }

    /// Adds one close code that hands control to the reconnect policy.
    pub fn reconnectable_code(mut self, code: u16) -> Self {
        self.options = self.options.with_reconnectable_code(code);
        self
    }

    /// Sets the transport factory. Defaults to [`TungsteniteConnector`].
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Sets the reconnect policy. Defaults to [`ManualReconnect`].
    pub fn reconnect_policy(mut self, policy: impl ReconnectPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Sets the host notify hook.
    pub fn notify_hook(mut self, hook: impl NotifyHook + 'static) -> Self {
        self.notify = Some(Arc::new(hook));
        self
    }

    /// Validates the URL, then creates the socket and opens its first
    /// transport.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL does not parse or its scheme is not
    ///   allowed; no socket is created
    /// - [`Error::Connection`] if the connector cannot create a transport
    ///
    /// [`Error::InvalidUrl`]: crate::Error::InvalidUrl
    /// [`Error::Connection`]: crate::Error::Connection
    pub fn build(self) -> Result<Socket> {
        let url = self.options.validate_url(&self.url)?;

        let socket = Socket::from_parts(
            url,
            &self.options,
            self.connector,
            self.policy,
            self.notify,
        );
        socket.open(false)?;

        Ok(socket)
    }
}

impl fmt::Debug for SocketBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketBuilder")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("policy", &self.policy)
            .field("notify", &self.notify.is_some())
            .finish_non_exhaustive()
    }
}
