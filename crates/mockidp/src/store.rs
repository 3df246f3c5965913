//! Concurrent session repository.
//!
//! The store is the only mutable shared state in the emulator. A single
//! read/write lock guards the map; every operation is O(1), in-memory, and
//! never held across I/O. Redemption is atomic under the write lock so the
//! same code cannot be exchanged twice by racing requests.
//!
//! Authorization codes are sensitive and are never logged.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::debug;

use crate::IdpResult;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::session::Session;
use crate::user::User;

/// Repository of live [`Session`]s, keyed by authorization code.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    clock: Arc<dyn Clock>,
    code_lifetime: Duration,
}

impl SessionStore {
    /// Creates an empty store reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, code_lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            code_lifetime,
        }
    }

    /// Allocates a new session with a unique, unpredictable code, stamps it
    /// with the clock's current time, stores it, and returns it.
    pub fn new_session(
        &self,
        scope: impl Into<String>,
        state: impl Into<String>,
        nonce: impl Into<String>,
        user: User,
    ) -> Session {
        let session = Session::new(scope, state, nonce, user, self.clock.now());
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id.clone(), session.clone());
        debug!(sessions = sessions.len(), "session created");
        session
    }

    /// Looks up a session by its identifier.
    ///
    /// # Errors
    /// Fails with `InvalidGrant` if no session has this id.
    pub fn get_session_by_id(&self, id: &str) -> IdpResult<Session> {
        self.sessions
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| AuthError::invalid_grant("unknown session"))
    }

    /// Atomically redeems an authorization code, marking it consumed.
    ///
    /// The session itself is retained so refresh and userinfo flows can
    /// still resolve it.
    ///
    /// # Errors
    /// Fails with `InvalidGrant` if the code is unknown, already redeemed,
    /// or past its validity window.
    pub fn redeem(&self, code: &str) -> IdpResult<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();

        let session = sessions
            .get_mut(code)
            .ok_or_else(|| AuthError::invalid_grant("unknown authorization code"))?;

        if session.is_consumed() {
            return Err(AuthError::invalid_grant(
                "authorization code already redeemed",
            ));
        }
        if session.code_expired(self.code_lifetime, now) {
            return Err(AuthError::invalid_grant("authorization code expired"));
        }

        session.consumed_at = Some(now);
        Ok(session.clone())
    }

    /// Drops sessions whose code window has passed without redemption.
    /// Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.is_consumed() || !s.code_expired(self.code_lifetime, now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "expired sessions purged");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Returns `true` if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}
