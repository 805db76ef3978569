//! Process configuration.
//!
//! Built once at startup from key/value pairs (the environment, optionally
//! backed by a secrets file) and then shared read-only.

use std::net::SocketAddr;

use veil::Redact;

use crate::error::{Error, Result};

/// Keys recognized in the environment and in the secrets file.
pub mod keys {
    pub const BOT_NICK: &str = "BOT_NICK";
    pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
    pub const CHANNEL_NAME: &str = "CHANNEL_NAME";
    pub const USER_ID: &str = "USER_ID";
    pub const SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
    pub const SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
    pub const SPOTIFY_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";
    pub const SWAP_PLAYLISTS_REDEMPTION: &str = "SWAP_PLAYLISTS_REDEMPTION";
    pub const SONG_REQUEST_REDEMPTION: &str = "SONG_REQUEST_REDEMPTION";

    /// Playlist slots are numbered from 1: `PLAYLIST_1_URI`, `PLAYLIST_2_URI`...
    #[must_use]
    pub fn playlist(slot: usize) -> String {
        format!("PLAYLIST_{slot}_URI")
    }
}

#[derive(Redact, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub user_agent: String,

    /// Twitch login of the bot account.
    pub bot_nick: String,
    /// Twitch OAuth token of the bot account, without `oauth:` prefix.
    #[redact]
    pub access_token: String,
    /// Channel to post messages in, without leading `#`.
    pub channel_name: String,
    /// Numeric Twitch user ID of the broadcaster.
    pub broadcaster_id: u64,

    pub spotify_client_id: String,
    #[redact]
    pub spotify_client_secret: String,
    #[redact]
    pub spotify_refresh_token: String,

    /// Reward title that rotates to the next playlist.
    pub swap_playlists_redemption: String,
    /// Reward title that queues a track from the user input.
    pub song_request_redemption: String,

    /// Spotify context URIs in rotation order. Never empty.
    pub playlists: Vec<String>,

    /// Address of the HTTP control surface, or `None` to disable it.
    pub api_addr: Option<SocketAddr>,
}

impl Config {
    /// Default address of the HTTP control surface.
    pub const DEFAULT_API_ADDR: &'static str = "127.0.0.1:3000";

    /// Builds the configuration from a key lookup function.
    ///
    /// `lookup` is typically backed by the process environment. Playlist
    /// slots are read from `PLAYLIST_1_URI` upwards until the first key
    /// that is not set; slots that are set but empty are skipped. Slots set
    /// after that gap are reported, not read.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when a required key is missing or empty,
    /// when `USER_ID` is not numeric, or when no playlist is configured.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
                _ => Err(Error::invalid_argument(format!("{key} is not set"))),
            }
        };

        let access_token = required(keys::ACCESS_TOKEN)?;
        let access_token = access_token
            .strip_prefix("oauth:")
            .unwrap_or(&access_token)
            .to_owned();

        let broadcaster_id = required(keys::USER_ID)?;
        let broadcaster_id = broadcaster_id.parse::<u64>().map_err(|e| {
            Error::invalid_argument(format!(
                "{} must be a numeric user id: {e}",
                keys::USER_ID
            ))
        })?;

        let channel_name = required(keys::CHANNEL_NAME)?;
        let channel_name = channel_name.trim_start_matches('#').to_lowercase();

        let mut playlists = Vec::new();
        let mut first_unset = 1;
        loop {
            match lookup(&keys::playlist(first_unset)) {
                Some(uri) if uri.trim().is_empty() => {
                    trace!("playlist slot {first_unset} is empty");
                }
                Some(uri) => playlists.push(uri.trim().to_owned()),
                None => break,
            }
            first_unset += 1;
        }

        let stray = stray_playlist_slot(&lookup, first_unset).map(|slot| {
            format!(
                "{} is ignored because {} is not set; leave unused slots empty instead",
                keys::playlist(slot),
                keys::playlist(first_unset)
            )
        });
        if playlists.is_empty() {
            return Err(Error::invalid_argument(format!(
                "at least one playlist must be set in {}{}",
                keys::playlist(1),
                stray.map(|hint| format!(" ({hint})")).unwrap_or_default()
            )));
        }
        if let Some(hint) = stray {
            warn!("{hint}");
        }

        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let user_agent = format!(
            "{app_name}/{app_version} (Rust; {})",
            std::env::consts::OS
        );

        Ok(Self {
            app_name,
            app_version,
            user_agent,

            bot_nick: required(keys::BOT_NICK)?.to_lowercase(),
            access_token,
            channel_name,
            broadcaster_id,

            spotify_client_id: required(keys::SPOTIFY_CLIENT_ID)?,
            spotify_client_secret: required(keys::SPOTIFY_CLIENT_SECRET)?,
            spotify_refresh_token: required(keys::SPOTIFY_REFRESH_TOKEN)?,

            swap_playlists_redemption: required(keys::SWAP_PLAYLISTS_REDEMPTION)?,
            song_request_redemption: required(keys::SONG_REQUEST_REDEMPTION)?,

            playlists,

            api_addr: Some(
                Self::DEFAULT_API_ADDR
                    .parse()
                    .map_err(|e| Error::internal(format!("default api address: {e}")))?,
            ),
        })
    }
}

/// Slots past the first unset one that are searched for stray playlists.
const STRAY_SLOT_SEARCH: usize = 16;

/// Finds a playlist slot that is set after a gap in the numbering.
fn stray_playlist_slot<F>(lookup: &F, first_unset: usize) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    (first_unset + 1..=first_unset + STRAY_SLOT_SEARCH)
        .find(|&slot| lookup(&keys::playlist(slot)).is_some())
}
