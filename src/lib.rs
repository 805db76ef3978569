//! Twitch channel points for Spotify.
//!
//! `pointify` listens for channel point redemptions on a Twitch channel and
//! acts on the broadcaster's Spotify player:
//!
//! * a *swap playlists* reward starts the next playlist of a configured
//!   rotation
//! * a *song request* reward queues the Spotify track the viewer linked
//!
//! Outcomes are reported in the channel's chat. A small HTTP API on
//! loopback controls playback directly.
//!
//! # Modules
//!
//! * [`pubsub`] - redemption listener with reconnects
//! * [`controller`] - the actions behind the rewards
//! * [`spotify`] - Spotify Web API client
//! * [`chat`] - Twitch chat client
//! * [`api`] - HTTP control surface
//! * [`config`] and [`secrets`] - configuration from environment and file
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod protocol;
pub mod pubsub;
pub mod secrets;
pub mod signal;
pub mod spotify;
pub mod track;

#[cfg(test)]
mod testing;
