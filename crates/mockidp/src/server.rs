//! The identity-provider emulator instance.
//!
//! A [`MockIdp`] is an explicitly constructed instance owning its session
//! store, signing keypair, configuration, and clock. There is no
//! package-level state, so several independent providers can coexist in one
//! test process. Clones share state and the instance doubles as the axum
//! handler state.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::IdpResult;
use crate::client::Client;
use crate::clock::{Clock, OffsetClock, SystemClock};
use crate::config::Config;
use crate::error::AuthError;
use crate::http::{
    AUTHORIZE_ENDPOINT, DISCOVERY_ENDPOINT, JWKS_ENDPOINT, TOKEN_ENDPOINT, USERINFO_ENDPOINT,
    authorize_handler, discovery_handler, jwks_handler, token_handler, userinfo_handler,
};
use crate::keypair::Keypair;
use crate::store::SessionStore;
use crate::user::User;

/// A single identity-provider emulator instance.
#[derive(Clone)]
pub struct MockIdp {
    config: Arc<Config>,
    client: Arc<Client>,
    keypair: Arc<Keypair>,
    sessions: Arc<SessionStore>,
    clock: Arc<OffsetClock>,
    user_queue: Arc<Mutex<VecDeque<User>>>,
}

impl MockIdp {
    /// Creates an instance with a freshly generated signing key, reading
    /// time from the system clock.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn new(config: Config) -> IdpResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an instance reading time from the supplied clock.
    ///
    /// The clock is wrapped in an adjustable offset layer so
    /// [`fast_forward`](Self::fast_forward) works over any base.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn with_clock(mut config: Config, clock: Arc<dyn Clock>) -> IdpResult<Self> {
        config.issuer = config.issuer.trim_end_matches('/').to_string();

        let keypair = Keypair::generate(config.algorithm)?;
        let clock = Arc::new(OffsetClock::new(clock));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let sessions = Arc::new(SessionStore::new(
            shared_clock,
            config.authorization_code_lifetime,
        ));
        let client = Arc::new(Client::new(&config.client_id, &config.client_secret));

        Ok(Self {
            config: Arc::new(config),
            client,
            keypair: Arc::new(keypair),
            sessions,
            clock,
            user_queue: Arc::new(Mutex::new(VecDeque::new())),
        })
    }

    /// The instance configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The registered client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The signing keypair.
    #[must_use]
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// The session repository.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The issuer URL, with any trailing slash trimmed.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// The clock's current instant.
    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Pushes the instance's clock forward by `delta` without sleeping.
    /// Offsets accumulate across calls.
    pub fn fast_forward(&self, delta: Duration) {
        self.clock.advance(delta);
    }

    /// Queues `user` as the subject of the next successful authorization
    /// request. When the queue is empty the default user is used.
    pub fn queue_user(&self, user: User) {
        self.user_queue.lock().unwrap().push_back(user);
    }

    /// Pops the next queued user, falling back to the default.
    pub(crate) fn next_user(&self) -> User {
        self.user_queue.lock().unwrap().pop_front().unwrap_or_default()
    }

    /// Builds the HTTP surface: the five fixed endpoint paths with this
    /// instance as handler state.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(AUTHORIZE_ENDPOINT, get(authorize_handler))
            .route(TOKEN_ENDPOINT, post(token_handler))
            .route(USERINFO_ENDPOINT, get(userinfo_handler))
            .route(JWKS_ENDPOINT, get(jwks_handler))
            .route(DISCOVERY_ENDPOINT, get(discovery_handler))
            .with_state(self.clone())
    }

    /// Binds an ephemeral localhost port, rewrites the issuer to the bound
    /// address, and serves the router until the handle shuts it down.
    ///
    /// # Errors
    /// Returns an error if binding the listener or key generation fails.
    pub async fn serve(mut config: Config) -> IdpResult<ServerHandle> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(|e| AuthError::internal(format!("failed to bind listener: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AuthError::internal(format!("failed to read bound address: {e}")))?;

        config.issuer = format!("http://{addr}");
        let idp = Self::new(config)?;
        let app = idp.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        info!(%addr, "identity provider listening");
        Ok(ServerHandle {
            idp,
            addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a served emulator instance.
pub struct ServerHandle {
    idp: MockIdp,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The served instance.
    #[must_use]
    pub fn idp(&self) -> &MockIdp {
        &self.idp
    }

    /// The bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this instance.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.idp.issuer(), path)
    }

    /// Signals graceful shutdown and waits for the listener task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}
