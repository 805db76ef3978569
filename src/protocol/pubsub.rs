//! Twitch PubSub frames.
//!
//! Every frame is a JSON object tagged by `type`:
//!
//! ```json
//! {"type": "LISTEN", "nonce": "...", "data": {"topics": ["..."], "auth_token": "..."}}
//! {"type": "MESSAGE", "data": {"topic": "...", "message": "<JSON string>"}}
//! ```
//!
//! `MESSAGE` frames wrap their payload in a string that is itself JSON;
//! [`Redemption::decode`] unwraps the channel points payload.

use std::{fmt, iter};

use serde::{Deserialize, Serialize};
use veil::Redact;

use crate::error::Result;

/// Prefix of the channel points topic. The broadcaster ID follows it.
pub const REWARDS_TOPIC_PREFIX: &str = "channel-points-channel-v1.";

const NONCE_LENGTH: usize = 26;

/// Topic with channel point redemptions for one broadcaster.
#[must_use]
pub fn rewards_topic(broadcaster_id: u64) -> String {
    format!("{REWARDS_TOPIC_PREFIX}{broadcaster_id}")
}

/// Random token to correlate a request with its `RESPONSE`.
#[must_use]
pub fn nonce() -> String {
    iter::repeat_with(fastrand::alphanumeric)
        .take(NONCE_LENGTH)
        .collect()
}

/// Frames sent by the client.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Request {
    Listen { nonce: String, data: Listen },
    Ping,
}

impl Request {
    /// Subscribes to `topics` with a fresh nonce.
    #[must_use]
    pub fn listen(topics: Vec<String>, auth_token: &str) -> Self {
        Self::Listen {
            nonce: nonce(),
            data: Listen {
                topics,
                auth_token: auth_token.to_owned(),
            },
        }
    }
}

#[derive(Redact, Clone, Serialize, PartialEq, Eq)]
pub struct Listen {
    pub topics: Vec<String>,
    #[redact]
    pub auth_token: String,
}

/// Frames sent by the server.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Response {
    /// Result of a `LISTEN`; `error` is empty on success.
    Response {
        #[serde(default)]
        nonce: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    /// A message published on a subscribed topic.
    Message { data: MessageData },
    Pong,
    /// The server is about to restart; reconnect soon.
    Reconnect,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct MessageData {
    pub topic: String,
    /// JSON encoded payload.
    pub message: String,
}

/// A viewer claimed a channel points reward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redemption {
    /// Display name of the viewer.
    pub user: String,
    /// Title of the reward as set up by the broadcaster.
    pub reward: String,
    /// Text the viewer entered, for rewards that ask for it.
    pub user_input: Option<String>,
}

impl Redemption {
    /// Decodes the payload of a `MESSAGE` frame.
    ///
    /// Returns `None` for topics other than channel points.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a channel points message.
    pub fn decode(data: &MessageData) -> Result<Option<Self>> {
        if !data.topic.starts_with(REWARDS_TOPIC_PREFIX) {
            return Ok(None);
        }

        let payload: RewardPayload = serde_json::from_str(&data.message)?;
        let redemption = payload.data.redemption;

        Ok(Some(Self {
            user: redemption.user.display_name,
            reward: redemption.reward.title,
            user_input: redemption.user_input,
        }))
    }
}

impl fmt::Display for Redemption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} redeemed: {}", self.user, self.reward)
    }
}

#[derive(Deserialize)]
struct RewardPayload {
    data: RewardData,
}

#[derive(Deserialize)]
struct RewardData {
    redemption: RawRedemption,
}

#[derive(Deserialize)]
struct RawRedemption {
    user: RawUser,
    reward: RawReward,
    #[serde(default)]
    user_input: Option<String>,
}

#[derive(Deserialize)]
struct RawUser {
    display_name: String,
}

#[derive(Deserialize)]
struct RawReward {
    title: String,
}
