//! Transport, request hooks, and the shared API client.
//!
//! # Design
//! - `Transport` resolves endpoints, sends one request, and classifies the answer.
//!   It never runs hooks, so hooks can use it without recursing.
//! - `ApiClient` prepares a request, attaches the session's bearer token, runs the
//!   installed hooks in order, and then hands the request to the transport.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::ErrorBody;
use crate::session::Session;

/// Correlation header attached to every backend request.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// A request that has not been dispatched yet; hooks may rewrite it.
#[derive(Clone, PartialEq)]
pub struct PreparedRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint path relative to the base URL.
    pub path: String,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Bearer credential, if any.
    pub bearer: Option<String>,
}

impl fmt::Debug for PreparedRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PreparedRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl PreparedRequest {
    /// `GET` request without a body.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// `POST` request carrying a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    /// `POST` request with a serialisable body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be encoded as JSON.
    pub fn post_json<B: Serialize>(path: impl Into<String>, body: &B) -> ApiResult<Self> {
        let path = path.into();
        let value = serde_json::to_value(body).map_err(|source| ApiError::Encode {
            endpoint: path.clone(),
            source,
        })?;
        Ok(Self::post(path, value))
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set the bearer credential.
    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Successful backend response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Endpoint that produced the response.
    pub endpoint: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_slice(&self.body).map_err(|source| ApiError::Decode {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}

/// Single-shot HTTP transport bound to the backend base URL.
#[derive(Clone, Debug)]
pub struct Transport {
    client: Client,
    base_url: Url,
}

impl Transport {
    /// Build a transport with the configured timeout and a request id header.
    ///
    /// # Errors
    ///
    /// Returns an error if the trace id is not a valid header value or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &ClientConfig, trace_id: &str) -> ApiResult<Self> {
        let mut default_headers = HeaderMap::new();
        if let Ok(request_id) = HeaderValue::from_str(trace_id) {
            default_headers.insert(HEADER_REQUEST_ID, request_id);
        } else {
            warn!("trace identifier contains invalid characters; omitting request id");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|source| ApiError::Build { source })?;

        Ok(Self::from_client(client, config.base_url.clone()))
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Base URL endpoints resolve against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying HTTP client.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.client
    }

    /// Resolve the request's endpoint and query against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined onto the base URL.
    pub fn endpoint_url(&self, request: &PreparedRequest) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|source| ApiError::InvalidUrl {
                endpoint: request.path.clone(),
                source,
            })?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send the request as-is.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success status.
    pub async fn execute(&self, request: &PreparedRequest) -> ApiResult<ApiResponse> {
        let url = self.endpoint_url(request)?;
        debug!(method = %request.method, endpoint = %request.path, "dispatching request");

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ApiError::from_reqwest(&request.path, source))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::from_reqwest(&request.path, source))?;

        if status.is_success() {
            Ok(ApiResponse {
                endpoint: request.path.clone(),
                status: status.as_u16(),
                body: body.to_vec(),
            })
        } else {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::message);
            debug!(endpoint = %request.path, status = status.as_u16(), "request rejected");
            Err(ApiError::Status {
                endpoint: request.path.clone(),
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// Hook run on every request before dispatch.
#[async_trait]
pub trait RequestHook: Send + Sync {
    /// Inspect or rewrite the request.
    async fn before_send(&self, request: &mut PreparedRequest);
}

/// Shared client: attaches the session's bearer token and runs request hooks.
#[derive(Clone)]
pub struct ApiClient {
    transport: Transport,
    session: Session,
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.transport.base_url().as_str())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Client without additional hooks.
    #[must_use]
    pub const fn new(transport: Transport, session: Session) -> Self {
        Self {
            transport,
            session,
            hooks: Vec::new(),
        }
    }

    /// Install a hook; hooks run in installation order after the bearer is attached.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Session the client reads tokens from.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Attach the bearer, run hooks, and dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or a non-success status.
    pub async fn request(&self, mut request: PreparedRequest) -> ApiResult<ApiResponse> {
        match self.session.access_token() {
            Ok(token) => request.bearer = token,
            Err(err) => warn!(error = %err, "token store unreadable; sending unauthenticated"),
        }
        for hook in &self.hooks {
            hook.before_send(&mut request).await;
        }
        self.transport.execute(&request).await
    }

    /// `GET` an endpoint and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on any request failure or if the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let request = query
            .iter()
            .fold(PreparedRequest::get(path), |request, (key, value)| {
                request.with_query(*key, *value)
            });
        self.request(request).await?.json()
    }

    /// `POST` a JSON body to an endpoint and decode the JSON answer.
    ///
    /// # Errors
    ///
    /// Returns an error on any request failure or if the body does not match `T`.
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = PreparedRequest::post_json(path, body)?;
        self.request(request).await?.json()
    }
}
