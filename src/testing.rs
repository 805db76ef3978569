//! Test doubles for the Spotify and chat clients.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    chat::Chat,
    config::{tests::complete, Config},
    error::{Error, Result},
    protocol::spotify::{Album, Artist, CurrentlyPlaying, Track},
    spotify::{ApiError, Playback},
    track::TrackId,
};

/// Configuration with three playlists and the reward titles
/// `"Swap Playlists"` and `"Song Request"`.
pub(crate) fn config() -> Config {
    let mut vars: HashMap<String, String> = complete();
    vars.insert("PLAYLIST_2_URI".to_owned(), "spotify:playlist:two".to_owned());
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub(crate) fn track() -> Track {
    Track {
        id: Some("abc123".to_owned()),
        name: "Never Gonna Give You Up".to_owned(),
        artists: vec![
            Artist {
                name: "Rick Astley".to_owned(),
            },
            Artist {
                name: "Someone Else".to_owned(),
            },
        ],
        album: Some(Album {
            name: "Whenever You Need Somebody".to_owned(),
        }),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Refresh,
    PlayContext(String),
    Resume,
    Pause,
    Next,
    Queue(String),
    Track(String),
    CurrentlyPlaying,
}

#[derive(Default)]
pub(crate) struct MockPlayback {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    playing: Mutex<Option<CurrentlyPlaying>>,
}

impl MockPlayback {
    /// Makes every later call of `method` fail like Spotify does without an
    /// active device.
    pub(crate) fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub(crate) fn set_playing(&self, playing: Option<CurrentlyPlaying>) {
        *self.playing.lock().unwrap() = playing;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn contexts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PlayContext(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    fn record(&self, method: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);

        if self.failing.lock().unwrap().contains(method) {
            return Err(ApiError::new(
                StatusCode::NOT_FOUND,
                r#"{"error":{"status":404,"message":"Player command failed: No active device found","reason":"NO_ACTIVE_DEVICE"}}"#
                    .to_owned(),
            )
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl Playback for MockPlayback {
    async fn refresh_access_token(&self) -> Result<()> {
        self.record("refresh_access_token", Call::Refresh)
    }

    async fn play_context(&self, context_uri: &str) -> Result<()> {
        self.record("play_context", Call::PlayContext(context_uri.to_owned()))
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume", Call::Resume)
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause", Call::Pause)
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.record("skip_to_next", Call::Next)
    }

    async fn add_to_queue(&self, uri: &str) -> Result<()> {
        self.record("add_to_queue", Call::Queue(uri.to_owned()))
    }

    async fn track(&self, id: &TrackId) -> Result<Track> {
        self.record("track", Call::Track(id.to_string()))?;
        Ok(track())
    }

    async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>> {
        self.record("currently_playing", Call::CurrentlyPlaying)?;
        Ok(self.playing.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub(crate) struct MockChat {
    messages: Mutex<Vec<String>>,
    disconnected: Mutex<bool>,
}

impl MockChat {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn disconnect(&self) {
        *self.disconnected.lock().unwrap() = true;
    }
}

#[async_trait]
impl Chat for MockChat {
    async fn say(&self, message: &str) -> Result<()> {
        if *self.disconnected.lock().unwrap() {
            return Err(Error::unavailable("chat connection is closed"));
        }

        self.messages.lock().unwrap().push(message.to_owned());
        Ok(())
    }
}
