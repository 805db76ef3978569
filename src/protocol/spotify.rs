//! Spotify Web API payloads.
//!
//! Only the fields pointify reads are modelled; serde ignores the rest.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response of the token endpoint for the `refresh_token` grant.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    /// Spotify may rotate the refresh token; pointify keeps using the
    /// configured one, matching the single-token configuration.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Body of `PUT /v1/me/player/play` when starting a context.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct PlayContext<'a> {
    pub context_uri: &'a str,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Artist {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Album {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
}

impl Track {
    /// Artist names joined for display: `"A, B"`.
    #[must_use]
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn album_name(&self) -> &str {
        self.album.as_ref().map_or("", |album| album.name.as_str())
    }
}

/// Response of `GET /v1/me/player/currently-playing`.
///
/// `item` is absent or `null` while nothing plays, and also while an
/// episode or ad plays (its shape differs from a track).
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default, deserialize_with = "lenient_track")]
    pub item: Option<Track>,
}

fn lenient_track<'de, D>(deserializer: D) -> Result<Option<Track>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

/// Error object in non-success responses of the Web API.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorObject {
    /// Regular API errors: `{"error": {"status": 404, "message": "..."}}`
    Regular { status: u16, message: String },
    /// Authentication errors: `{"error": "invalid_grant", "error_description": "..."}`
    Code(String),
}
