//! Start-up revalidation of a stored session.

use std::fmt;

use tracing::{info, warn};

use crate::auth::{exchange_refresh, invalidate_logged};
use crate::http::Transport;
use crate::session::{Route, Session};

/// Decides where a freshly started client lands.
#[derive(Clone)]
pub struct SessionGate {
    transport: Transport,
    session: Session,
}

impl fmt::Debug for SessionGate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("SessionGate").finish_non_exhaustive()
    }
}

impl SessionGate {
    /// Gate bound to a transport and session.
    #[must_use]
    pub const fn new(transport: Transport, session: Session) -> Self {
        Self { transport, session }
    }

    /// Revalidate the stored session and route accordingly.
    ///
    /// Any stored access token triggers a refresh attempt; success stores the new
    /// access token and routes home, failure invalidates the session.
    pub async fn check(&self) -> Route {
        let access = match self.session.access_token() {
            Ok(access) => access,
            Err(err) => {
                warn!(error = %err, "token store unreadable; treating session as absent");
                None
            }
        };
        if access.is_none() {
            self.session.navigate(Route::Login);
            return self.session.route();
        }

        let refresh = self.session.refresh_token().unwrap_or_else(|err| {
            warn!(error = %err, "refresh token unreadable");
            None
        });

        match exchange_refresh(&self.transport, refresh.as_deref()).await {
            Ok(Some(access)) => {
                if let Err(err) = self.session.store_access(&access) {
                    warn!(error = %err, "failed to persist refreshed access token");
                }
                self.session.authenticate();
                info!("stored session revalidated");
            }
            Ok(None) => {
                warn!("refresh response carried no access token");
                invalidate_logged(&self.session);
            }
            Err(err) => {
                warn!(error = %err, status = ?err.status(), "stored session rejected");
                invalidate_logged(&self.session);
            }
        }
        self.session.route()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenPair;
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn transport_for(server: &MockServer) -> Transport {
        let base = format!("{}/disk/", server.base_url())
            .parse()
            .expect("valid URL");
        Transport::from_client(Client::new(), base)
    }

    #[tokio::test]
    async fn no_token_routes_to_login_without_network() {
        let server = MockServer::start_async().await;
        let refresh = server.mock(|when, then| {
            when.method(POST).path("/disk/refresh/");
            then.status(200).json_body(json!({"access": "NEW"}));
        });

        let session = Session::in_memory();
        let route = SessionGate::new(transport_for(&server), session.clone())
            .check()
            .await;

        assert_eq!(route, Route::Login);
        assert_eq!(refresh.hits(), 0);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn valid_refresh_authenticates_and_stores_access() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/disk/refresh/")
                .json_body(json!({"refresh": "R"}));
            then.status(200).json_body(json!({"access": "NEW"}));
        });

        let session = Session::in_memory();
        session
            .store_pair(&TokenPair {
                access: "OLD".into(),
                refresh: "R".into(),
            })
            .expect("store");
        session.navigate(Route::Login);

        let route = SessionGate::new(transport_for(&server), session.clone())
            .check()
            .await;

        assert_eq!(route, Route::Home);
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().expect("read").as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn access_without_refresh_still_attempts_and_invalidates() {
        let server = MockServer::start_async().await;
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/disk/refresh/")
                .json_body(json!({"refresh": null}));
            then.status(400).json_body(json!({"refresh": ["This field may not be null."]}));
        });

        let session = Session::in_memory();
        session.store_access("OLD").expect("store");

        let route = SessionGate::new(transport_for(&server), session.clone())
            .check()
            .await;

        assert_eq!(refresh.hits(), 1);
        assert_eq!(route, Route::Login);
        assert_eq!(session.access_token().expect("read"), None);
        assert!(!session.is_authenticated());
    }
}
