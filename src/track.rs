//! Spotify track references parsed from chat input.
//!
//! Viewers paste links in whatever form their client gives them. Two shapes
//! are recognized anywhere in the text:
//!
//! * `spotify:track:<id>` (URI, as copied from the desktop client)
//! * `spotify.com/track/<id>` (web link, with or without scheme and query)
//!
//! # Example
//!
//! ```rust
//! use pointify::track::TrackId;
//!
//! let id = TrackId::extract("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x");
//! assert_eq!(id.unwrap().as_str(), "4uLU6hMCjMI75M1A2tKUQC");
//! ```

use std::{fmt, sync::LazyLock};

use regex_lite::Regex;

static TRACK_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"spotify:track:([a-zA-Z0-9]+)|spotify\.com/track/([a-zA-Z0-9]+)")
        .expect("track link pattern is valid")
});

/// Opaque Spotify track identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    /// Finds the first track reference in `input`.
    ///
    /// Returns `None` when the text contains neither link shape.
    #[must_use]
    pub fn extract(input: &str) -> Option<Self> {
        let captures = TRACK_LINK.captures(input)?;
        captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|id| Self(id.as_str().to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `spotify:track:<id>` URI that the player endpoints expect.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
