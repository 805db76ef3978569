//! Error handling for pointify.
//!
//! Errors pair a category ([`ErrorKind`]) with the underlying error. The
//! categories follow gRPC status codes, so that failures from very different
//! sources (the Spotify Web API, the Twitch websockets, configuration files)
//! can be reasoned about uniformly.
//!
//! # Example
//!
//! ```rust
//! use pointify::error::{Error, ErrorKind, Result};
//!
//! fn playlist(playlists: &[String]) -> Result<&str> {
//!     playlists
//!         .first()
//!         .map(String::as_str)
//!         .ok_or_else(|| Error::failed_precondition("no playlists configured"))
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// Used to recover provider-specific detail, for example the response
    /// body of a failed Spotify request:
    ///
    /// ```rust
    /// if let Some(detail) = error.downcast::<spotify::ApiError>() {
    ///     error!("spotify api error details: {}", detail.body);
    /// }
    /// ```
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for pointify operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories, numbered like gRPC status codes.
///
/// Remote failures are classified by [`ErrorKind::from_status`]; the HTTP
/// status a category usually stems from is noted on each variant.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// The operation was cancelled, typically by closing a connection.
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// Anything that fits no other category.
    #[error("unknown error")]
    Unknown = 2,

    /// 400: a malformed request or configuration value.
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// 408 or 504
    #[error("operation timed out")]
    DeadlineExceeded = 4,

    /// 404: for the player endpoints this usually means no active device.
    #[error("not found")]
    NotFound = 5,

    /// 403: missing scope or not a premium account.
    #[error("permission denied")]
    PermissionDenied = 7,

    /// 429: rate limited.
    #[error("resource has been exhausted")]
    ResourceExhausted = 8,

    #[error("invalid state")]
    FailedPrecondition = 9,

    /// 409, or a connection the other side ended.
    #[error("operation aborted")]
    Aborted = 10,

    #[error("out of range")]
    OutOfRange = 11,

    /// 5xx other than 502 and 503.
    #[error("internal error")]
    Internal = 13,

    /// 502 or 503, or a service that cannot be reached.
    #[error("service unavailable")]
    Unavailable = 14,

    /// Truncated or corrupt responses.
    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,

    /// 401: expired or revoked tokens.
    #[error("no valid authentication credentials")]
    Unauthenticated = 16,
}

impl ErrorKind {
    /// Classifies an unsuccessful HTTP status returned by a remote service.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidArgument,
            StatusCode::UNAUTHORIZED => Self::Unauthenticated,
            StatusCode::FORBIDDEN => Self::PermissionDenied,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::CONFLICT => Self::Aborted,
            StatusCode::TOO_MANY_REQUESTS => Self::ResourceExhausted,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => Self::DeadlineExceeded,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Self::Unavailable,
            status if status.is_server_error() => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

macro_rules! constructor {
    ($(#[$doc:meta])* $name:ident => $kind:ident) => {
        $(#[$doc])*
        pub fn $name<E>(error: E) -> Self
        where
            E: Into<Box<dyn std::error::Error + Send + Sync>>,
        {
            Self::new(ErrorKind::$kind, error)
        }
    };
}

impl Error {
    /// Creates a new error with specified kind and details.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::new(ErrorKind::NotFound, "track not found");
    /// assert_eq!(err.kind, ErrorKind::NotFound);
    /// ```
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    constructor!(
        /// Creates an error for interrupted operations (HTTP 409).
        aborted => Aborted
    );
    constructor!(
        /// Creates an error for cancelled operations (HTTP 499).
        cancelled => Cancelled
    );
    constructor!(
        /// Creates an error for corrupted or truncated data (HTTP 500).
        data_loss => DataLoss
    );
    constructor!(
        /// Creates an error for operations that ran out of time (HTTP 504).
        deadline_exceeded => DeadlineExceeded
    );
    constructor!(
        /// Creates an error for operations that cannot run in the current
        /// state (HTTP 400).
        failed_precondition => FailedPrecondition
    );
    constructor!(
        /// Creates an error for unexpected internal failures (HTTP 500).
        internal => Internal
    );
    constructor!(
        /// Creates an error for arguments that fail validation (HTTP 400).
        invalid_argument => InvalidArgument
    );
    constructor!(
        /// Creates an error for missing resources (HTTP 404).
        not_found => NotFound
    );
    constructor!(
        /// Creates an error for values outside their bounds (HTTP 400).
        out_of_range => OutOfRange
    );
    constructor!(
        /// Creates an error for refused access (HTTP 403).
        permission_denied => PermissionDenied
    );
    constructor!(
        /// Creates an error for exhausted quotas or buffers (HTTP 429).
        resource_exhausted => ResourceExhausted
    );
    constructor!(
        /// Creates an error for missing or rejected credentials (HTTP 401).
        unauthenticated => Unauthenticated
    );
    constructor!(
        /// Creates an error for services that cannot be reached (HTTP 503).
        unavailable => Unavailable
    );
    constructor!(
        /// Creates an error that fits no other category (HTTP 500).
        unknown => Unknown
    );
}

/// Returns the underlying error source.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error as `"{kind}: {details}"`.
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrInUse | AlreadyExists => Self::aborted(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            WriteZero => Self::resource_exhausted(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts HTTP client errors into appropriate error kinds.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_connect() {
            return Self::unavailable(err);
        }

        if err.is_redirect() {
            return Self::resource_exhausted(err);
        }

        if let Some(status) = err.status() {
            return Self::new(ErrorKind::from_status(status), err);
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        Self::unknown(err)
    }
}

/// Converts websocket errors into appropriate error kinds.
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error::*;
        match err {
            ConnectionClosed => Self::cancelled(err),
            AlreadyClosed => Self::unavailable(err),
            Io(err) => err.into(),
            Capacity(err) => Self::out_of_range(err),
            Utf8 => Self::invalid_argument(err),
            WriteBufferFull(_) => Self::resource_exhausted(err.to_string()),
            AttackAttempt => Self::permission_denied(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts JSON errors through IO error mapping.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

/// Converts TOML parsing errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

/// Converts invalid header errors to `Internal`.
impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::internal(e.to_string())
    }
}

/// Converts URL parsing errors to `Internal`.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::internal(e.to_string())
    }
}
