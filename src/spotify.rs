//! Spotify Web API playback client.
//!
//! [`Client`] implements [`Playback`], the set of player operations the bot
//! needs. Callers refresh the access token before each sequence of calls;
//! the token is the only state the client keeps between calls.
//!
//! Failed requests turn into an [`Error`] whose kind follows the HTTP status
//! and whose source is an [`ApiError`] with the raw response body. That body
//! is meant for logs, never for chat:
//!
//! ```rust
//! if let Err(e) = playback.skip_to_next().await {
//!     error!("{e}");
//!     if let Some(detail) = e.downcast::<ApiError>() {
//!         debug!("spotify api error details: {}", detail.body);
//!     }
//! }
//! ```

use std::sync::RwLock;

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    StatusCode, Url,
};
use thiserror::Error;

use crate::{
    config::Config,
    error::{Error, ErrorKind, Result},
    http::Client as HttpClient,
    protocol::spotify::{
        CurrentlyPlaying, ErrorObject, ErrorResponse, PlayContext, TokenResponse, Track,
    },
    track::TrackId,
};

/// Player operations used by the redemption actions and the control API.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Exchanges the refresh token for a new access token.
    async fn refresh_access_token(&self) -> Result<()>;

    /// Starts playback of a context (playlist, album) on the active device.
    async fn play_context(&self, context_uri: &str) -> Result<()>;

    /// Resumes playback where it was paused.
    async fn resume(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn skip_to_next(&self) -> Result<()>;

    /// Appends an item to the user's playback queue.
    async fn add_to_queue(&self, uri: &str) -> Result<()>;

    /// Fetches catalog information for a track.
    async fn track(&self, id: &TrackId) -> Result<Track>;

    /// Fetches the playback state, or `None` when no device reports any.
    async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>>;
}

/// Non-success response of the Spotify Web API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("spotify responded with {status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    /// Short description taken from the error object, if the body had one.
    pub message: String,
    /// Response body as received.
    pub body: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, body: String) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(ErrorResponse {
                error: ErrorObject::Regular { message, .. },
            }) => message,
            Ok(ErrorResponse {
                error: ErrorObject::Code(code),
            }) => code,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_owned(),
        };

        Self {
            status,
            message,
            body,
        }
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Self::new(ErrorKind::from_status(e.status), e)
    }
}

pub struct Client {
    http_client: HttpClient,

    api_url: Url,
    token_url: Url,

    client_id: String,
    client_secret: String,
    refresh_token: String,

    access_token: RwLock<Option<String>>,
}

impl Client {
    /// Base URL of the Web API. The trailing slash matters for `Url::join`.
    const API_URL: &'static str = "https://api.spotify.com/v1/";

    /// Token endpoint of the accounts service.
    const TOKEN_URL: &'static str = "https://accounts.spotify.com/api/token";

    const JSON_CONTENT: &'static str = "application/json";
    const FORM_CONTENT: &'static str = "application/x-www-form-urlencoded";

    /// Creates a client from the Spotify credentials in `config`.
    ///
    /// No request is made until the first token refresh.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            api_url: Url::parse(Self::API_URL)?,
            token_url: Url::parse(Self::TOKEN_URL)?,
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            refresh_token: config.spotify_refresh_token.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Talks to another Web API and token endpoint than Spotify's.
    ///
    /// `api_url` needs a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns error if either URL cannot be parsed.
    pub fn with_urls(mut self, api_url: &str, token_url: &str) -> Result<Self> {
        self.api_url = Url::parse(api_url)?;
        self.token_url = Url::parse(token_url)?;
        Ok(self)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url.join(path).map_err(Into::into)
    }

    fn bearer(&self) -> Result<HeaderValue> {
        let guard = self
            .access_token
            .read()
            .map_err(|e| Error::internal(e.to_string()))?;
        let token = guard
            .as_deref()
            .ok_or_else(|| Error::unauthenticated("access token was not refreshed"))?;

        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Turns non-success responses into errors carrying the body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::new(status, body).into())
    }

    /// Sends an authorized request to the Web API.
    async fn send(&self, mut request: reqwest::Request) -> Result<reqwest::Response> {
        request.headers_mut().insert(AUTHORIZATION, self.bearer()?);
        let response = self.http_client.execute(request).await?;
        Self::check(response).await
    }

    /// Sends a player command that answers without a body of interest.
    async fn command(&self, request: reqwest::Request) -> Result<()> {
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl Playback for Client {
    async fn refresh_access_token(&self) -> Result<()> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", &self.refresh_token)
            .finish();

        let credentials =
            BASE64_STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let mut authorization = HeaderValue::from_str(&format!("Basic {credentials}"))?;
        authorization.set_sensitive(true);

        let mut request = self.http_client.post(self.token_url.clone(), body);
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(Self::FORM_CONTENT));

        let response = Self::check(self.http_client.execute(request).await?).await?;
        let token = response.json::<TokenResponse>().await?;
        debug!("access token refreshed; expires in {}s", token.expires_in);

        let mut guard = self
            .access_token
            .write()
            .map_err(|e| Error::internal(e.to_string()))?;
        *guard = Some(token.access_token);

        Ok(())
    }

    async fn play_context(&self, context_uri: &str) -> Result<()> {
        let body = serde_json::to_string(&PlayContext { context_uri })?;
        let mut request = self.http_client.put(self.endpoint("me/player/play")?, body);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(Self::JSON_CONTENT));
        self.command(request).await
    }

    async fn resume(&self) -> Result<()> {
        let request = self.http_client.put(self.endpoint("me/player/play")?, "");
        self.command(request).await
    }

    async fn pause(&self) -> Result<()> {
        let request = self.http_client.put(self.endpoint("me/player/pause")?, "");
        self.command(request).await
    }

    async fn skip_to_next(&self) -> Result<()> {
        let request = self.http_client.post(self.endpoint("me/player/next")?, "");
        self.command(request).await
    }

    async fn add_to_queue(&self, uri: &str) -> Result<()> {
        let mut url = self.endpoint("me/player/queue")?;
        url.query_pairs_mut().append_pair("uri", uri);

        let request = self.http_client.post(url, "");
        self.command(request).await
    }

    async fn track(&self, id: &TrackId) -> Result<Track> {
        let request = self
            .http_client
            .get(self.endpoint(&format!("tracks/{id}"))?, "");
        let response = self.send(request).await?;
        response.json::<Track>().await.map_err(Into::into)
    }

    async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>> {
        let request = self
            .http_client
            .get(self.endpoint("me/player/currently-playing")?, "");
        let response = self.send(request).await?;

        // No active device: success without content.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        response
            .json::<CurrentlyPlaying>()
            .await
            .map(Some)
            .map_err(Into::into)
    }
}
