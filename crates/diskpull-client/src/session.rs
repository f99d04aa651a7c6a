//! Explicit session context shared by every component.
//!
//! # Design
//! - One cloneable handle carries token accessors, the authenticated flag, and the
//!   current route, so no component reaches for global state.
//! - `invalidate` is the only way a session is torn down; the gate, the listing
//!   boundary, and the auth flow all go through it.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::error::TokenStoreResult;
use crate::tokens::{MemoryTokenStore, TokenName, TokenPair, TokenStore};

/// Views the client can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Login form.
    Login,
    /// Registration form.
    Register,
    /// Authenticated file browser.
    Home,
    /// Logout in progress.
    Logout,
}

impl Route {
    /// Path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Home => "/",
            Self::Logout => "/logout",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "/login" => Ok(Self::Login),
            "/register" => Ok(Self::Register),
            "/" => Ok(Self::Home),
            "/logout" => Ok(Self::Logout),
            other => Err(format!("unknown route '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionState {
    authenticated: bool,
    route: Route,
}

struct SessionInner {
    tokens: Arc<dyn TokenStore>,
    state: Mutex<SessionState>,
}

/// Cloneable session handle.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        formatter
            .debug_struct("Session")
            .field("authenticated", &state.authenticated)
            .field("route", &state.route)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an unauthenticated session over the given token store, routed to `/`.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                tokens,
                state: Mutex::new(SessionState {
                    authenticated: false,
                    route: Route::Home,
                }),
            }),
        }
    }

    /// Session backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Underlying token store.
    #[must_use]
    pub fn tokens(&self) -> &dyn TokenStore {
        self.inner.tokens.as_ref()
    }

    /// Current access token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be read.
    pub fn access_token(&self) -> TokenStoreResult<Option<String>> {
        self.inner.tokens.get(TokenName::Access)
    }

    /// Current refresh token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be read.
    pub fn refresh_token(&self) -> TokenStoreResult<Option<String>> {
        self.inner.tokens.get(TokenName::Refresh)
    }

    /// Both tokens, when both are present.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be read.
    pub fn token_pair(&self) -> TokenStoreResult<Option<TokenPair>> {
        let access = self.access_token()?;
        let refresh = self.refresh_token()?;
        Ok(access
            .zip(refresh)
            .map(|(access, refresh)| TokenPair { access, refresh }))
    }

    /// Persist a freshly issued token pair.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be written.
    pub fn store_pair(&self, pair: &TokenPair) -> TokenStoreResult<()> {
        self.inner.tokens.set(TokenName::Access, &pair.access)?;
        self.inner.tokens.set(TokenName::Refresh, &pair.refresh)
    }

    /// Replace the access token after a refresh.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be written.
    pub fn store_access(&self, access: &str) -> TokenStoreResult<()> {
        self.inner.tokens.set(TokenName::Access, access)
    }

    /// Remove both tokens without touching the route.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be written.
    pub fn clear_tokens(&self) -> TokenStoreResult<()> {
        let access = self.inner.tokens.remove(TokenName::Access);
        let refresh = self.inner.tokens.remove(TokenName::Refresh);
        access.and(refresh)
    }

    /// Tear the session down: clear tokens, mark unauthenticated, route to `/login`.
    ///
    /// The state change happens even when the store fails; the store error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error when the token store cannot be written.
    pub fn invalidate(&self) -> TokenStoreResult<()> {
        let cleared = self.clear_tokens();
        self.update(|state| {
            state.authenticated = false;
            state.route = Route::Login;
        });
        info!("session invalidated");
        cleared
    }

    /// Mark the session authenticated and route to `/`.
    pub fn authenticate(&self) {
        self.update(|state| {
            state.authenticated = true;
            state.route = Route::Home;
        });
        info!("session authenticated");
    }

    /// Whether the session has been authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    /// Current route.
    #[must_use]
    pub fn route(&self) -> Route {
        self.state().route
    }

    /// Change the current route.
    pub fn navigate(&self, route: Route) {
        debug!(route = %route, "navigate");
        self.update(|state| state.route = route);
    }

    fn state(&self) -> SessionState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access: "access".into(),
            refresh: "refresh".into(),
        }
    }

    #[test]
    fn new_session_is_anonymous_at_home() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert_eq!(session.route(), Route::Home);
    }

    #[test]
    fn token_pair_requires_both_tokens() -> TokenStoreResult<()> {
        let session = Session::in_memory();
        session.store_access("access")?;
        assert!(session.token_pair()?.is_none());
        session.store_pair(&pair())?;
        assert_eq!(session.token_pair()?, Some(pair()));
        Ok(())
    }

    #[test]
    fn invalidate_clears_tokens_and_routes_to_login() -> TokenStoreResult<()> {
        let session = Session::in_memory();
        session.store_pair(&pair())?;
        session.authenticate();
        assert!(session.is_authenticated());

        session.invalidate()?;
        assert!(!session.is_authenticated());
        assert_eq!(session.route(), Route::Login);
        assert!(session.access_token()?.is_none());
        assert!(session.refresh_token()?.is_none());
        Ok(())
    }

    #[test]
    fn clones_share_state() {
        let session = Session::in_memory();
        let clone = session.clone();
        clone.navigate(Route::Register);
        assert_eq!(session.route(), Route::Register);
    }

    #[test]
    fn routes_round_trip_through_paths() {
        for route in [Route::Login, Route::Register, Route::Home, Route::Logout] {
            assert_eq!(route.path().parse::<Route>(), Ok(route));
        }
        assert!("/nowhere".parse::<Route>().is_err());
    }
}
