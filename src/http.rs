//! HTTP client for the Spotify Web API.
//!
//! A thin wrapper around `reqwest::Client` that applies the same user agent,
//! keepalive and timeouts to every request.
//!
//! # Example
//!
//! ```rust
//! use pointify::http::Client;
//!
//! let client = Client::new(&config)?;
//! let request = client.get(url, "");
//! let response = client.execute(request).await?;
//! ```

use std::time::Duration;

use reqwest::{
    header::{HeaderValue, ACCEPT},
    Body, Method, Url,
};

use crate::{config::Config, error::Result};

pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    /// Duration to keep idle connections alive.
    ///
    /// Redemptions arrive in bursts during a stream; reusing the connection
    /// saves a TLS handshake on each of them.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Time allowed to establish a connection.
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Time allowed for a complete request, including reading the body.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized or the user
    /// agent is not a valid header value.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let inner = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .timeout(Self::REQUEST_TIMEOUT)
            .default_headers(headers)
            .user_agent(HeaderValue::from_str(&config.user_agent)?)
            .build()?;

        Ok(Self { inner })
    }

    /// Builds a request with specified method, URL and body.
    pub fn request<T>(&self, method: Method, url: Url, body: T) -> reqwest::Request
    where
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url);
        *request.body_mut() = Some(body.into());
        request
    }

    /// Builds a GET request.
    pub fn get<T>(&self, url: Url, body: T) -> reqwest::Request
    where
        T: Into<Body>,
    {
        self.request(Method::GET, url, body)
    }

    /// Builds a POST request.
    pub fn post<T>(&self, url: Url, body: T) -> reqwest::Request
    where
        T: Into<Body>,
    {
        self.request(Method::POST, url, body)
    }

    /// Builds a PUT request.
    pub fn put<T>(&self, url: Url, body: T) -> reqwest::Request
    where
        T: Into<Body>,
    {
        self.request(Method::PUT, url, body)
    }

    /// Executes a request.
    ///
    /// Only transport failures are errors here; the caller inspects the
    /// status code.
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails or times out.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        trace!("{} {}", request.method(), request.url().path());
        self.inner.execute(request).await.map_err(Into::into)
    }
}
