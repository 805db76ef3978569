//! Twitch chat over IRC-on-websocket.
//!
//! The bot only talks: it logs in once at startup, joins the configured
//! channel and sends `PRIVMSG`s. Incoming traffic is read just far enough to
//! answer keepalive `PING`s and to notice a rejected login.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WebsocketMessage;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Sink for messages to the broadcaster's chat.
#[async_trait]
pub trait Chat: Send + Sync {
    /// Posts `message` to the configured channel.
    async fn say(&self, message: &str) -> Result<()>;
}

/// Credentials and channel for one chat session.
struct Login {
    nick: String,
    token: String,
    channel: String,
}

/// Handle to the chat connection.
///
/// Cloning is not needed: the handle is shared behind an `Arc`. Dropping the
/// last handle closes the connection.
pub struct Client {
    channel: String,
    tx: mpsc::UnboundedSender<String>,
}

impl Client {
    /// Twitch chat over secure websockets.
    pub const URL: &'static str = "wss://irc-ws.chat.twitch.tv:443";

    /// Connects to Twitch chat in the background.
    ///
    /// The connection is attempted once. When it fails or drops, the error
    /// is logged and later calls to [`Chat::say`] return `Unavailable`.
    #[must_use]
    pub fn connect(config: &Config) -> Self {
        Self::connect_to(Self::URL, config)
    }

    /// Like [`connect`](Self::connect), against a custom server.
    #[must_use]
    pub fn connect_to(url: &str, config: &Config) -> Self {
        let login = Login {
            nick: config.bot_nick.clone(),
            token: config.access_token.clone(),
            channel: config.channel_name.clone(),
        };
        let channel = login.channel.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let url = url.to_owned();
        tokio::spawn(async move {
            match Self::run(&url, login, rx).await {
                Ok(()) => debug!("chat connection closed"),
                Err(e) => error!("chat connection failed: {e}"),
            }
        });

        Self { channel, tx }
    }

    async fn run(url: &str, login: Login, mut rx: mpsc::UnboundedReceiver<String>) -> Result<()> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        for line in [
            format!("PASS oauth:{}", login.token),
            format!("NICK {}", login.nick),
            format!("JOIN #{}", login.channel),
        ] {
            ws_tx.send(WebsocketMessage::text(line)).await?;
        }
        info!("chat client connected as {}", login.nick);

        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    if let Some(line) = outgoing {
                        ws_tx.send(WebsocketMessage::text(line)).await?;
                    } else {
                        // Every handle is gone: shutting down.
                        ws_tx.close().await?;
                        return Ok(());
                    }
                }

                incoming = ws_rx.next() => match incoming {
                    Some(Ok(WebsocketMessage::Text(text))) => {
                        for line in text.as_str().lines() {
                            if let Some(reply) = reply_to(line)? {
                                ws_tx.send(WebsocketMessage::text(reply)).await?;
                            }
                        }
                    }
                    Some(Ok(WebsocketMessage::Close(frame))) => {
                        return Err(Error::aborted(format!("chat closed by server: {frame:?}")));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(Error::aborted("chat stream ended")),
                },
            }
        }
    }
}

/// Interprets one line from the chat server.
///
/// Returns the line to send back, if any.
///
/// # Errors
///
/// Returns `Unauthenticated` when the server rejects the login.
fn reply_to(line: &str) -> Result<Option<String>> {
    let line = line.trim_end_matches('\r');

    if let Some(origin) = line.strip_prefix("PING ") {
        trace!("chat ping -> pong");
        return Ok(Some(format!("PONG {origin}")));
    }

    if (line.contains(" NOTICE * :") && line.contains("authentication failed"))
        || line.ends_with(":Improperly formatted auth")
    {
        return Err(Error::unauthenticated(format!("chat login rejected: {line}")));
    }

    if line.contains(" JOIN #") {
        debug!("chat: {line}");
    } else {
        trace!("chat: {line}");
    }

    Ok(None)
}

#[async_trait]
impl Chat for Client {
    async fn say(&self, message: &str) -> Result<()> {
        // A line break would end the IRC command early.
        let message = message.replace(['\r', '\n'], " ");
        info!("#{}: {message}", self.channel);

        self.tx
            .send(format!("PRIVMSG #{} :{message}", self.channel))
            .map_err(|_| Error::unavailable("chat connection is closed"))
    }
}
