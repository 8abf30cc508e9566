use crate::{AuthFuture, AuthRequest, Server, ServerConfig};
use collab_kit_protocol::Identity;
use std::future::Future;
use std::sync::Arc;

/// Builder for constructing a Server instance.
pub struct ServerBuilder {
    config: ServerConfig,
    auth_handler: Option<Arc<dyn Fn(AuthRequest) -> AuthFuture + Send + Sync>>,
    jwt_secret: Option<Vec<u8>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            auth_handler: None,
            jwt_secret: None,
        }
    }

    /// Set server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the HTTP address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Set the JWT signing secret.
    pub fn jwt_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Set JWT ticket expiry in seconds. Default: 3600 (1 hour).
    pub fn ticket_expiry_secs(mut self, secs: u64) -> Self {
        self.config.ticket_expiry_secs = secs;
        self
    }

    /// Set the room that joins with an unusable name fall back to.
    /// Default: "general".
    pub fn fallback_room(mut self, name: impl Into<String>) -> Self {
        self.config.fallback_room = Some(name.into());
        self
    }

    /// Disable the fallback room. Joins with unusable names are then
    /// rejected instead of redirected.
    pub fn no_fallback_room(mut self) -> Self {
        self.config.fallback_room = None;
        self
    }

    /// Pre-create rooms at startup so the first listing is not empty.
    ///
    /// # Example
    /// ```ignore
    /// .seed_rooms(["general", "design", "dev"])
    /// ```
    pub fn seed_rooms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.seed_rooms = names.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set the auth handler that validates a ticket request and produces
    /// the client identity embedded in the ticket.
    ///
    /// # Example
    ///
    /// ```ignore
    /// .auth_handler(|req: AuthRequest| async move {
    ///     let body = req.body.ok_or("missing body".to_string())?;
    ///     let name = parse_display_name(&body)?;
    ///     Ok(Identity { user_id: None, display_name: name })
    /// })
    /// ```
    pub fn auth_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(AuthRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Identity, String>> + Send + 'static,
    {
        self.auth_handler = Some(Arc::new(move |req| Box::pin(handler(req))));
        self
    }

    /// Build the server.
    pub fn build(self) -> Result<Server, &'static str> {
        let auth_handler = self.auth_handler.ok_or("auth_handler is required")?;
        let jwt_secret = self.jwt_secret.ok_or("jwt_secret is required")?;

        Ok(Server {
            config: self.config,
            auth_handler,
            jwt_secret,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
