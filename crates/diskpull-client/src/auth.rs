//! Login, registration, logout, and the pre-request token refresh.
//!
//! # Design
//! - Auth requests go through the bare [`Transport`], never through the hooked
//!   [`ApiClient`](crate::http::ApiClient), so the refresher cannot recurse into itself.
//! - Logout is best effort: local tokens are dropped whatever the server answers.
//! - A failed refresh logs the user out but still lets the original request proceed.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ApiResult, AuthError, AuthResult};
use crate::http::{PreparedRequest, RequestHook, Transport};
use crate::jwt;
use crate::models::{
    AuthTokensResponse, ENDPOINT_LOGIN, ENDPOINT_LOGOUT, ENDPOINT_REFRESH, ENDPOINT_REGISTER,
    LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest,
};
use crate::session::Session;
use crate::tokens::TokenPair;

/// Message shown when the server gives no reason for a failed login or registration.
pub const AUTH_FAILED_FALLBACK: &str = "Authentication failed. Please check your credentials.";

/// Which form is being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Existing account.
    #[default]
    Login,
    /// New account.
    Register,
}

impl AuthMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }
}

/// Form fields; `email` is only sent when registering.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthError {
    /// Text to show the user for this failure.
    ///
    /// Only a server-supplied detail is surfaced; everything else collapses to
    /// [`AUTH_FAILED_FALLBACK`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Request { source } => source
                .detail()
                .map_or_else(|| AUTH_FAILED_FALLBACK.to_string(), str::to_string),
            Self::MissingTokens | Self::Store { .. } => AUTH_FAILED_FALLBACK.to_string(),
        }
    }
}

/// Result of a logout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// There was no access token; nothing happened.
    NoSession,
    /// The server revoked the session and local tokens were cleared.
    Revoked,
    /// The server call failed; local tokens were cleared anyway.
    LocalOnly,
}

/// Login/register/logout against the backend.
#[derive(Clone)]
pub struct AuthFlow {
    transport: Transport,
    session: Session,
}

impl fmt::Debug for AuthFlow {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthFlow")
            .field("base_url", &self.transport.base_url().as_str())
            .finish_non_exhaustive()
    }
}

impl AuthFlow {
    /// Flow bound to a transport and session.
    #[must_use]
    pub const fn new(transport: Transport, session: Session) -> Self {
        Self { transport, session }
    }

    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credentials, omits either token, or
    /// the tokens cannot be persisted.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<TokenPair> {
        let request =
            PreparedRequest::post_json(ENDPOINT_LOGIN, &LoginRequest { username, password })?;
        self.exchange(request).await
    }

    /// Create an account and receive a token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the registration, omits either token,
    /// or the tokens cannot be persisted.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<TokenPair> {
        let request = PreparedRequest::post_json(
            ENDPOINT_REGISTER,
            &RegisterRequest {
                username,
                email,
                password,
            },
        )?;
        self.exchange(request).await
    }

    /// Run exactly one of login or register, depending on `mode`.
    ///
    /// # Errors
    ///
    /// See [`AuthFlow::login`] and [`AuthFlow::register`].
    pub async fn submit(&self, mode: AuthMode, credentials: &Credentials) -> AuthResult<TokenPair> {
        match mode {
            AuthMode::Login => {
                self.login(&credentials.username, &credentials.password)
                    .await
            }
            AuthMode::Register => {
                self.register(
                    &credentials.username,
                    &credentials.email,
                    &credentials.password,
                )
                .await
            }
        }
    }

    /// Submit through the form state machine, recording the outcome on `form`.
    ///
    /// # Errors
    ///
    /// Same as [`AuthFlow::submit`]. A form that is already submitting or authenticated
    /// is left untouched and the call is rejected without contacting the backend.
    pub async fn submit_form(
        &self,
        form: &mut AuthForm,
        credentials: &Credentials,
    ) -> Result<TokenPair, AuthFormRejection> {
        form.apply(AuthFormEvent::Submit)
            .map_err(AuthFormRejection::Transition)?;
        match self.submit(form.mode(), credentials).await {
            Ok(pair) => {
                form.apply(AuthFormEvent::Succeeded)
                    .map_err(AuthFormRejection::Transition)?;
                Ok(pair)
            }
            Err(err) => {
                form.apply(AuthFormEvent::Failed(err.user_message()))
                    .map_err(AuthFormRejection::Transition)?;
                Err(AuthFormRejection::Auth(err))
            }
        }
    }

    /// Revoke the session on the server and clear it locally.
    pub async fn logout(&self) -> LogoutOutcome {
        revoke(&self.transport, &self.session).await
    }

    /// [`AuthFlow::logout`], then return a signed-in `form` to idle.
    pub async fn logout_form(&self, form: &mut AuthForm) -> LogoutOutcome {
        let outcome = self.logout().await;
        if form.apply(AuthFormEvent::Logout).is_err() {
            debug!(state = ?form.state(), "form was not signed in; state unchanged");
        }
        outcome
    }

    async fn exchange(&self, request: PreparedRequest) -> AuthResult<TokenPair> {
        let response: AuthTokensResponse = self.transport.execute(&request).await?.json()?;
        let (Some(access), Some(refresh)) = (response.access_token, response.refresh_token) else {
            warn!(endpoint = %request.path, "backend answered without a token pair");
            return Err(AuthError::MissingTokens);
        };
        let pair = TokenPair { access, refresh };
        self.session.store_pair(&pair)?;
        self.session.authenticate();
        info!(endpoint = %request.path, "session established");
        Ok(pair)
    }
}

/// Why [`AuthFlow::submit_form`] did not produce a token pair.
#[derive(Debug, Error)]
pub enum AuthFormRejection {
    /// The form was not in a state that accepts the event.
    #[error("form is not accepting submissions")]
    Transition(AuthFormEvent),
    /// The backend exchange failed.
    #[error("{}", .0.user_message())]
    Auth(#[source] AuthError),
}

/// POST `logout/` with the current bearer (if any), then invalidate the session.
pub(crate) async fn revoke(transport: &Transport, session: &Session) -> LogoutOutcome {
    let access = match session.access_token() {
        Ok(Some(access)) => access,
        Ok(None) => {
            info!("logout requested without an active session");
            return LogoutOutcome::NoSession;
        }
        Err(err) => {
            warn!(error = %err, "token store unreadable during logout");
            invalidate_logged(session);
            return LogoutOutcome::LocalOnly;
        }
    };

    let request = PreparedRequest::post(ENDPOINT_LOGOUT, json!({})).with_bearer(Some(access));
    let outcome = match transport.execute(&request).await {
        Ok(_) => LogoutOutcome::Revoked,
        Err(err) => {
            warn!(error = %err, status = ?err.status(), "server-side logout failed; clearing locally");
            LogoutOutcome::LocalOnly
        }
    };
    invalidate_logged(session);
    outcome
}

pub(crate) fn invalidate_logged(session: &Session) {
    if let Err(err) = session.invalidate() {
        warn!(error = %err, "failed to clear stored tokens");
    }
}

/// POST `refresh/` and return the new access token, if the server issued one.
pub(crate) async fn exchange_refresh(
    transport: &Transport,
    refresh: Option<&str>,
) -> ApiResult<Option<String>> {
    let request = PreparedRequest::post_json(ENDPOINT_REFRESH, &RefreshRequest { refresh })?;
    let response: RefreshResponse = transport.execute(&request).await?.json()?;
    Ok(response.access.filter(|access| !access.is_empty()))
}

/// What the refresher did before a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// One of the tokens was missing.
    Skipped,
    /// The access token has not expired.
    Fresh,
    /// The access token could not be decoded; it is sent unchanged.
    Undetermined,
    /// A new access token was stored and attached.
    Refreshed,
    /// The refresh failed and the session was logged out.
    Failed,
}

/// Request hook that refreshes an expired access token before dispatch.
#[derive(Clone)]
pub struct TokenRefresher {
    transport: Transport,
    session: Session,
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("TokenRefresher").finish_non_exhaustive()
    }
}

impl TokenRefresher {
    /// Refresher bound to a transport and session.
    #[must_use]
    pub const fn new(transport: Transport, session: Session) -> Self {
        Self { transport, session }
    }

    /// Refresh the access token when it has expired, rewriting the request's bearer.
    pub async fn refresh_if_expired(&self, request: &mut PreparedRequest) -> RefreshOutcome {
        let pair = match self.session.token_pair() {
            Ok(Some(pair)) => pair,
            Ok(None) => return RefreshOutcome::Skipped,
            Err(err) => {
                warn!(error = %err, "token store unreadable; skipping refresh");
                return RefreshOutcome::Skipped;
            }
        };

        match jwt::is_expired(&pair.access, Utc::now()) {
            None => {
                debug!("access token undecodable; sending as-is");
                return RefreshOutcome::Undetermined;
            }
            Some(false) => return RefreshOutcome::Fresh,
            Some(true) => {}
        }

        debug!(endpoint = %request.path, "access token expired; refreshing");
        match exchange_refresh(&self.transport, Some(&pair.refresh)).await {
            Ok(Some(access)) => {
                if let Err(err) = self.session.store_access(&access) {
                    warn!(error = %err, "failed to persist refreshed access token");
                }
                request.bearer = Some(access);
                RefreshOutcome::Refreshed
            }
            Ok(None) => {
                warn!("refresh response carried no access token; logging out");
                revoke(&self.transport, &self.session).await;
                RefreshOutcome::Failed
            }
            Err(err) => {
                warn!(error = %err, status = ?err.status(), "token refresh failed; logging out");
                revoke(&self.transport, &self.session).await;
                RefreshOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl RequestHook for TokenRefresher {
    async fn before_send(&self, request: &mut PreparedRequest) {
        let outcome = self.refresh_if_expired(request).await;
        debug!(?outcome, endpoint = %request.path, "refresh check complete");
    }
}

/// States of the login/register form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthFormState {
    /// Nothing submitted yet.
    #[default]
    AnonymousIdle,
    /// A request is in flight.
    Submitting,
    /// Tokens were received.
    Authenticated,
    /// The last attempt failed with the given message.
    Error(String),
}

/// Inputs that drive [`AuthFormState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFormEvent {
    /// The user submitted the form.
    Submit,
    /// The backend issued tokens.
    Succeeded,
    /// The backend rejected the attempt.
    Failed(String),
    /// The user logged out.
    Logout,
}

/// Login/register form state machine.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    mode: AuthMode,
    state: AuthFormState,
}

impl AuthForm {
    /// Idle form in the given mode.
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            state: AuthFormState::AnonymousIdle,
        }
    }

    /// Form for a process resuming persisted tokens: authenticated when an
    /// access token is stored, idle otherwise.
    #[must_use]
    pub fn resume(mode: AuthMode, session: &Session) -> Self {
        let state = match session.access_token() {
            Ok(Some(_)) => AuthFormState::Authenticated,
            _ => AuthFormState::AnonymousIdle,
        };
        Self { mode, state }
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Switch between login and register.
    pub const fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AuthFormState {
        &self.state
    }

    /// Message of the last failure, if the form is in the error state.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            AuthFormState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    /// Apply an event.
    ///
    /// # Errors
    ///
    /// Returns the event back when the current state does not accept it.
    pub fn apply(&mut self, event: AuthFormEvent) -> Result<&AuthFormState, AuthFormEvent> {
        let next = match (&self.state, event) {
            (AuthFormState::AnonymousIdle | AuthFormState::Error(_), AuthFormEvent::Submit) => {
                AuthFormState::Submitting
            }
            (AuthFormState::Submitting, AuthFormEvent::Succeeded) => AuthFormState::Authenticated,
            (AuthFormState::Submitting, AuthFormEvent::Failed(message)) => {
                AuthFormState::Error(message)
            }
            (AuthFormState::Authenticated, AuthFormEvent::Logout) => AuthFormState::AnonymousIdle,
            (_, event) => return Err(event),
        };
        self.state = next;
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::session::Route;
    use diskpull_test_support::fixtures::{expired_jwt, fresh_jwt};
    use httpmock::prelude::*;
    use reqwest::Client;

    fn transport_for(server: &MockServer) -> Transport {
        let base = format!("{}/disk/", server.base_url())
            .parse()
            .expect("valid URL");
        Transport::from_client(Client::new(), base)
    }

    fn seeded(access: &str, refresh: &str) -> Session {
        let session = Session::in_memory();
        session
            .store_pair(&TokenPair {
                access: access.into(),
                refresh: refresh.into(),
            })
            .expect("store");
        session
    }

    #[tokio::test]
    async fn login_stores_tokens_and_routes_home() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/disk/login/")
                .json_body(json!({"username": "alice", "password": "secret"}));
            then.status(200)
                .json_body(json!({"access_token": "A", "refresh_token": "R"}));
        });

        let session = Session::in_memory();
        session.navigate(Route::Login);
        let flow = AuthFlow::new(transport_for(&server), session.clone());
        let pair = flow.login("alice", "secret").await.expect("login");

        mock.assert();
        assert_eq!(pair.access, "A");
        assert_eq!(session.access_token().expect("read").as_deref(), Some("A"));
        assert_eq!(session.refresh_token().expect("read").as_deref(), Some("R"));
        assert!(session.is_authenticated());
        assert_eq!(session.route(), Route::Home);
    }

    #[tokio::test]
    async fn register_sends_email() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/disk/register/").json_body(
                json!({"username": "bob", "email": "bob@example.com", "password": "pw"}),
            );
            then.status(201)
                .json_body(json!({"access_token": "A", "refresh_token": "R"}));
        });

        let flow = AuthFlow::new(transport_for(&server), Session::in_memory());
        let credentials = Credentials {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "pw".into(),
        };
        flow.submit(AuthMode::Register, &credentials)
            .await
            .expect("register");
        mock.assert();
    }

    #[tokio::test]
    async fn login_failure_surfaces_detail_or_fallback() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/disk/login/");
            then.status(401)
                .json_body(json!({"detail": "No active account found"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/disk/register/");
            then.status(500).body("boom");
        });

        let session = Session::in_memory();
        let flow = AuthFlow::new(transport_for(&server), session.clone());
        let err = flow.login("alice", "wrong").await.expect_err("rejected");
        assert_eq!(err.user_message(), "No active account found");

        let err = flow
            .register("alice", "a@example.com", "pw")
            .await
            .expect_err("server error");
        assert_eq!(err.user_message(), AUTH_FAILED_FALLBACK);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn missing_tokens_is_a_validation_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/disk/login/");
            then.status(200).json_body(json!({"access_token": "A"}));
        });

        let session = Session::in_memory();
        let flow = AuthFlow::new(transport_for(&server), session.clone());
        let err = flow.login("alice", "secret").await.expect_err("no refresh");

        assert!(matches!(err, AuthError::MissingTokens));
        assert_eq!(err.to_string(), "tokens not received");
        assert_eq!(err.user_message(), AUTH_FAILED_FALLBACK);
        assert_eq!(session.access_token().expect("read"), None);
    }

    #[tokio::test]
    async fn logout_without_token_is_a_noop() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/disk/logout/");
            then.status(200);
        });

        let session = Session::in_memory();
        let flow = AuthFlow::new(transport_for(&server), session.clone());
        assert_eq!(flow.logout().await, LogoutOutcome::NoSession);
        assert_eq!(mock.hits(), 0);
        assert_eq!(session.route(), Route::Home);
    }

    #[tokio::test]
    async fn logout_clears_tokens_even_when_server_fails() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/disk/logout/")
                .header("authorization", "Bearer A");
            then.status(500);
        });

        let session = seeded("A", "R");
        session.authenticate();
        let flow = AuthFlow::new(transport_for(&server), session.clone());

        assert_eq!(flow.logout().await, LogoutOutcome::LocalOnly);
        mock.assert();
        assert_eq!(session.token_pair().expect("read"), None);
        assert!(!session.is_authenticated());
        assert_eq!(session.route(), Route::Login);
    }

    #[tokio::test]
    async fn logout_form_returns_resumed_form_to_idle() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/disk/logout/");
            then.status(200).json_body(json!({}));
        });

        let session = seeded("A", "R");
        let mut form = AuthForm::resume(AuthMode::Login, &session);
        assert_eq!(form.state(), &AuthFormState::Authenticated);

        let flow = AuthFlow::new(transport_for(&server), session.clone());
        assert_eq!(flow.logout_form(&mut form).await, LogoutOutcome::Revoked);
        assert_eq!(form.state(), &AuthFormState::AnonymousIdle);
        assert_eq!(
            AuthForm::resume(AuthMode::Login, &session).state(),
            &AuthFormState::AnonymousIdle
        );
        assert_eq!(flow.logout_form(&mut form).await, LogoutOutcome::NoSession);
        assert_eq!(form.state(), &AuthFormState::AnonymousIdle);
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_refresh() {
        let server = MockServer::start_async().await;
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/disk/refresh/")
                .json_body(json!({"refresh": "R"}));
            then.status(200).json_body(json!({"access": "NEW"}));
        });

        let session = seeded(&expired_jwt(), "R");
        let refresher = TokenRefresher::new(transport_for(&server), session.clone());
        let mut request = PreparedRequest::get("files/").with_bearer(Some(expired_jwt()));

        let outcome = refresher.refresh_if_expired(&mut request).await;

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert_eq!(refresh.hits(), 1);
        assert_eq!(request.bearer.as_deref(), Some("NEW"));
        assert_eq!(session.access_token().expect("read").as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn fresh_or_opaque_tokens_skip_refresh() {
        let server = MockServer::start_async().await;
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/disk/refresh/");
            then.status(200).json_body(json!({"access": "NEW"}));
        });

        let transport = transport_for(&server);
        let fresh = TokenRefresher::new(transport.clone(), seeded(&fresh_jwt(), "R"));
        let opaque = TokenRefresher::new(transport.clone(), seeded("opaque", "R"));
        let missing = TokenRefresher::new(transport, Session::in_memory());

        let mut request = PreparedRequest::get("files/");
        assert_eq!(fresh.refresh_if_expired(&mut request).await, RefreshOutcome::Fresh);
        assert_eq!(
            opaque.refresh_if_expired(&mut request).await,
            RefreshOutcome::Undetermined
        );
        assert_eq!(
            missing.refresh_if_expired(&mut request).await,
            RefreshOutcome::Skipped
        );
        assert_eq!(refresh.hits(), 0);
    }

    #[tokio::test]
    async fn failed_refresh_logs_out_and_keeps_original_bearer() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/disk/refresh/");
            then.status(401).json_body(json!({"detail": "Token is invalid"}));
        });
        let logout = server.mock(|when, then| {
            when.method(POST).path("/disk/logout/");
            then.status(205);
        });

        let stale = expired_jwt();
        let session = seeded(&stale, "R");
        let refresher = TokenRefresher::new(transport_for(&server), session.clone());
        let mut request = PreparedRequest::get("files/").with_bearer(Some(stale.clone()));

        assert_eq!(
            refresher.refresh_if_expired(&mut request).await,
            RefreshOutcome::Failed
        );
        assert_eq!(logout.hits(), 1);
        assert_eq!(request.bearer, Some(stale));
        assert_eq!(session.token_pair().expect("read"), None);
        assert_eq!(session.route(), Route::Login);
    }

    #[test]
    fn form_follows_allowed_transitions() {
        let mut form = AuthForm::new(AuthMode::Login);
        assert_eq!(form.apply(AuthFormEvent::Submit), Ok(&AuthFormState::Submitting));
        assert_eq!(
            form.apply(AuthFormEvent::Failed("nope".into())),
            Ok(&AuthFormState::Error("nope".into()))
        );
        assert_eq!(form.error(), Some("nope"));
        assert_eq!(form.apply(AuthFormEvent::Submit), Ok(&AuthFormState::Submitting));
        assert_eq!(
            form.apply(AuthFormEvent::Succeeded),
            Ok(&AuthFormState::Authenticated)
        );
        assert_eq!(
            form.apply(AuthFormEvent::Logout),
            Ok(&AuthFormState::AnonymousIdle)
        );
    }

    #[test]
    fn form_rejects_other_transitions() {
        let mut form = AuthForm::default();
        assert_eq!(
            form.apply(AuthFormEvent::Succeeded),
            Err(AuthFormEvent::Succeeded)
        );
        assert_eq!(form.apply(AuthFormEvent::Logout), Err(AuthFormEvent::Logout));
        form.apply(AuthFormEvent::Submit).expect("submit");
        assert_eq!(form.apply(AuthFormEvent::Submit), Err(AuthFormEvent::Submit));
        assert_eq!(form.state(), &AuthFormState::Submitting);
    }

    #[test]
    fn toggling_mode_flips_between_forms() {
        let mut form = AuthForm::default();
        assert_eq!(form.mode(), AuthMode::Login);
        form.toggle_mode();
        assert_eq!(form.mode(), AuthMode::Register);
    }

    #[tokio::test]
    async fn submit_form_records_failure_message() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/disk/login/");
            then.status(400).json_body(json!({"detail": "bad input"}));
        });

        let flow = AuthFlow::new(transport_for(&server), Session::in_memory());
        let mut form = AuthForm::new(AuthMode::Login);
        let err = flow
            .submit_form(&mut form, &Credentials::default())
            .await
            .expect_err("rejected");

        assert!(matches!(
            err,
            AuthFormRejection::Auth(AuthError::Request {
                source: ApiError::Status { status: 400, .. }
            })
        ));
        assert_eq!(err.to_string(), "bad input");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(form.error(), Some("bad input"));
    }
}
