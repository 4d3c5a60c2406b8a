//! Async HTTP client for the game server.

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use reqwest::StatusCode;

use crate::{
    config::AppConfig,
    models::{Credentials, Game, GameList, LoginResponse, StrikeRequest, UserDetails},
    placement::ConfigureRequest,
    session::Session,
};

/// Failures surfaced by [`ApiClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable token; the request was never sent.
    #[error("not logged in")]
    MissingToken,
    /// The configured origin cannot carry request paths.
    #[error("invalid server URL {url}: {message}")]
    InvalidBaseUrl {
        /// Configured origin.
        url: String,
        /// Parser complaint.
        message: String,
    },
    /// A path segment such as a game id was empty or a dot segment.
    #[error("invalid path segment {0:?}")]
    InvalidPath(String),
    /// The server answered 401.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Response status.
        status: StatusCode,
        /// Server supplied message, or the status reason.
        message: String,
    },
    /// Any other non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Server supplied message, or the status reason.
        message: String,
    },
    /// Connection, timeout or protocol failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The body did not match the expected contract.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path that produced the body.
        endpoint: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether the server rejected the credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Authenticated client bound to one server origin.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// Build a client from the configured origin and timeout.
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.api_url).map_err(|err| ApiError::InvalidBaseUrl {
            url: config.api_url.clone(),
            message: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: config.api_url.clone(),
                message: "not a hierarchical URL".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, base })
    }

    /// Origin every path is resolved against.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Resolve `segments` below the origin, escaping each one.
    ///
    /// A segment never spans a `/` and never reaches the query or fragment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(ApiError::InvalidPath(bad.to_string()));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl {
                url: self.base.to_string(),
                message: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /auth/register`.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let url = self.endpoint(&["auth", "register"])?;
        let path = url.path().to_string();
        let request = self.http.post(url).json(credentials);
        self.send_empty(&path, request).await
    }

    /// `POST /auth/login`, returning a new session for the account.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        let path = url.path().to_string();
        let request = self.http.post(url).json(credentials);
        let response: LoginResponse = self.send(&path, request).await?;
        Ok(Session::new(response.access_token, credentials.email.clone()))
    }

    /// `GET /user/details/me`.
    pub async fn user_details(&self, session: &Session) -> Result<UserDetails, ApiError> {
        let url = self.endpoint(&["user", "details", "me"])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.get(url))?;
        self.send(&path, request).await
    }

    /// `GET /game`.
    pub async fn games(&self, session: &Session) -> Result<Vec<Game>, ApiError> {
        let url = self.endpoint(&["game"])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.get(url))?;
        let list: GameList = self.send(&path, request).await?;
        Ok(list.games)
    }

    /// `POST /game`.
    pub async fn create_game(&self, session: &Session) -> Result<Game, ApiError> {
        let url = self.endpoint(&["game"])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.post(url).json(&serde_json::json!({})))?;
        self.send(&path, request).await
    }

    /// `POST /game/join/{id}`.
    pub async fn join_game(&self, session: &Session, game_id: &str) -> Result<Game, ApiError> {
        let url = self.endpoint(&["game", "join", game_id])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.post(url).json(&serde_json::json!({})))?;
        self.send(&path, request).await
    }

    /// `GET /game/{id}`.
    pub async fn game(&self, session: &Session, game_id: &str) -> Result<Game, ApiError> {
        let url = self.endpoint(&["game", game_id])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.get(url))?;
        self.send(&path, request).await
    }

    /// `PATCH /game/{id}` with the full fleet, replacing any earlier one.
    pub async fn configure_game(
        &self,
        session: &Session,
        request: &ConfigureRequest,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["game", &request.game_id])?;
        let path = url.path().to_string();
        let builder = self.authorized(session, self.http.patch(url).json(&request.body))?;
        self.send_empty(&path, builder).await
    }

    /// `POST /game/strike/{id}`.
    pub async fn strike(
        &self,
        session: &Session,
        game_id: &str,
        target: &StrikeRequest,
    ) -> Result<Game, ApiError> {
        let url = self.endpoint(&["game", "strike", game_id])?;
        let path = url.path().to_string();
        let request = self.authorized(session, self.http.post(url).json(target))?;
        self.send(&path, request).await
    }

    fn authorized(
        &self,
        session: &Session,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(request.bearer_auth(session.bearer()?))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.dispatch(path, request).await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }

    async fn send_empty(&self, path: &str, request: RequestBuilder) -> Result<(), ApiError> {
        self.dispatch(path, request).await.map(|_| ())
    }

    async fn dispatch(&self, path: &str, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%path, status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(body);
        }

        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::Unauthorized { status, message })
        } else {
            Err(ApiError::Status { status, message })
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}

/// Game to open after a join attempt.
///
/// A 401 from the join endpoint usually means the caller already belongs to
/// the game, so it resolves to the requested id instead of an error.
pub fn resolve_join(result: Result<Game, ApiError>, requested_id: &str) -> Result<String, ApiError> {
    match result {
        Ok(game) => Ok(game.id),
        Err(err) if err.is_unauthorized() => Ok(requested_id.to_string()),
        Err(err) => Err(err),
    }
}
