//! Wire types of the services the bot talks to.
//!
//! * [`pubsub`] - Twitch PubSub frames and channel points payloads
//! * [`spotify`] - Spotify Web API requests and responses

pub mod pubsub;
pub mod spotify;
