//! Channel points listener over Twitch PubSub.
//!
//! [`Listener::start`] runs one session: connect, `LISTEN` on the rewards
//! topic, then hand every redemption to the [`Controller`] until the
//! connection ends. [`Listener::run`] wraps sessions in the reconnect
//! policy: after a session ends for any reason, one new session starts
//! after a fixed delay. There is no backoff, no retry limit and no jitter.
//!
//! # Example
//!
//! ```rust
//! let (commands, rx) = tokio::sync::mpsc::unbounded_channel();
//! let listener = Listener::new(&config, controller);
//! tokio::spawn(async move { listener.run(rx).await });
//!
//! // Later: drop the current connection and reconnect right away.
//! commands.send(Command::Reconnect)?;
//! ```

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc, time::Instant};
use tokio_tungstenite::{
    tungstenite::Message as WebsocketMessage, MaybeTlsStream, WebSocketStream,
};

use crate::{
    config::Config,
    controller::Controller,
    error::{Error, Result},
    protocol::pubsub::{rewards_topic, Redemption, Request, Response},
};

type WebsocketSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WebsocketMessage>;

/// Requests to a running [`Listener::run`] loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Drop the current connection and any pending reconnect timer, then
    /// connect immediately.
    Reconnect,
    /// Stop listening.
    Shutdown,
}

pub struct Listener {
    url: String,
    topic: String,
    auth_token: String,
    controller: Arc<Controller>,

    reconnect_delay: Duration,
    ping_interval: Duration,
}

impl Listener {
    /// Twitch PubSub endpoint.
    pub const URL: &'static str = "wss://pubsub-edge.twitch.tv";

    /// Wait between the end of a session and the next connection attempt.
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

    /// PubSub drops clients that stay silent for five minutes.
    pub const PING_INTERVAL: Duration = Duration::from_secs(4 * 60);

    /// Messages larger than this are not parsed. Redemptions are a few
    /// kilobytes at most.
    const MAX_MESSAGE_SIZE: usize = 64 * 1024;

    #[must_use]
    pub fn new(config: &Config, controller: Arc<Controller>) -> Self {
        Self {
            url: Self::URL.to_owned(),
            topic: rewards_topic(config.broadcaster_id),
            auth_token: config.access_token.clone(),
            controller,
            reconnect_delay: Self::RECONNECT_DELAY,
            ping_interval: Self::PING_INTERVAL,
        }
    }

    /// Connects to another PubSub server.
    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        url.clone_into(&mut self.url);
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Runs sessions until [`Command::Shutdown`] is received or every
    /// sender of `commands` is dropped.
    ///
    /// The first session starts immediately. Each later one starts
    /// `reconnect_delay` after the previous one ended. Only one reconnect
    /// timer exists at a time; [`Command::Reconnect`] replaces it.
    pub async fn run(&self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let restart_timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(restart_timer);

        loop {
            tokio::select! {
                // Commands take priority over the session.
                biased;

                command = commands.recv() => match command {
                    Some(Command::Reconnect) => {
                        info!("reconnecting to twitch pubsub");
                        restart_timer.as_mut().reset(Instant::now());
                    }
                    Some(Command::Shutdown) | None => {
                        info!("stopped listening for redemptions");
                        break;
                    }
                },

                result = self.start(), if restart_timer.is_elapsed() => {
                    match result {
                        Ok(()) => info!("disconnected from twitch pubsub"),
                        Err(e) => error!("disconnected from twitch pubsub: {e}"),
                    }

                    info!("reconnecting in {:.1}s", self.reconnect_delay.as_secs_f32());
                    restart_timer.as_mut().reset(Instant::now() + self.reconnect_delay);
                }

                () = &mut restart_timer, if !restart_timer.is_elapsed() => {}
            }
        }
    }

    /// Runs a single session until the connection ends.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established, breaks, is
    /// closed by the server, or the server asks to reconnect.
    pub async fn start(&self) -> Result<()> {
        info!("connecting to twitch pubsub");
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        info!("connected to twitch pubsub");

        info!("subscribing to topic: {}", self.topic);
        let listen = Request::listen(vec![self.topic.clone()], &self.auth_token);
        Self::send(&mut ws_tx, &listen).await?;

        let mut keepalive =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    Self::send(&mut ws_tx, &Request::Ping).await?;
                }

                message = ws_rx.next() => match message {
                    Some(Ok(message)) => {
                        if let ControlFlow::Break(e) = self.handle_message(&message) {
                            // Best effort: the session ends either way.
                            let _ = ws_tx.close().await;
                            return Err(e);
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
            }
        }
    }

    fn handle_message(&self, message: &WebsocketMessage) -> ControlFlow<Error> {
        match message {
            WebsocketMessage::Text(text) => {
                let size = text.len();
                if size > Self::MAX_MESSAGE_SIZE {
                    error!("ignoring oversized message with {size} bytes");
                    return ControlFlow::Continue(());
                }

                match serde_json::from_str::<Response>(text.as_str()) {
                    Ok(response) => return self.handle_response(response),
                    Err(e) => {
                        trace!("{text}");
                        error!("error parsing message: {e}");
                    }
                }
            }

            WebsocketMessage::Close(payload) => {
                return ControlFlow::Break(Error::aborted(format!(
                    "connection closed by server: {payload:?}"
                )));
            }

            // Pongs to websocket pings are queued by tungstenite itself.
            WebsocketMessage::Ping(_) => trace!("ping -> pong"),

            _ => trace!("message type unimplemented"),
        }

        ControlFlow::Continue(())
    }

    fn handle_response(&self, response: Response) -> ControlFlow<Error> {
        match response {
            Response::Message { data } => match Redemption::decode(&data) {
                Ok(Some(redemption)) => {
                    // Fire and forget: actions report their own outcome.
                    let _ = self.controller.dispatch(redemption);
                }
                Ok(None) => debug!("ignoring message on topic {}", data.topic),
                Err(e) => error!("error decoding redemption: {e}"),
            },

            Response::Response { error, .. } => match error.as_deref() {
                None | Some("") => info!("listening for channel point redemptions"),
                Some(e) => error!("subscription to {} failed: {e}", self.topic),
            },

            Response::Pong => trace!("pong"),

            Response::Reconnect => {
                return ControlFlow::Break(Error::unavailable("server requested reconnect"));
            }

            Response::Unknown => debug!("ignoring unknown message type"),
        }

        ControlFlow::Continue(())
    }

    async fn send(ws_tx: &mut WebsocketSink, request: &Request) -> Result<()> {
        let text = serde_json::to_string(request)?;
        trace!("sending message: {request:?}");
        ws_tx.send(WebsocketMessage::text(text)).await.map_err(Into::into)
    }
}
