//! Process signals.
//!
//! Ctrl-C and SIGTERM stop the bot. SIGHUP drops the PubSub connection and
//! reconnects right away, which helps after the network changed. Windows
//! only gets Ctrl-C.

use std::fmt;

use crate::error::Result;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal as UnixSignal, SignalKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Signal {
    /// Ctrl-C (SIGINT)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Reconnect,
}

impl Signal {
    /// Whether the bot should exit on this signal.
    #[must_use]
    pub fn is_shutdown(self) -> bool {
        matches!(self, Self::Interrupt | Self::Terminate)
    }
}

pub struct Handler {
    #[cfg(unix)]
    sigterm: UnixSignal,
    #[cfg(unix)]
    sighup: UnixSignal,
}

impl Handler {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns error if signal handlers cannot be registered.
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sighup: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Waits for the next signal.
    pub async fn recv(&mut self) -> Signal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => Signal::Interrupt,
                _ = self.sigterm.recv() => Signal::Terminate,
                _ = self.sighup.recv() => Signal::Reconnect,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            Signal::Interrupt
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "Ctrl+C"),
            Signal::Terminate => write!(f, "SIGTERM"),
            Signal::Reconnect => write!(f, "SIGHUP"),
        }
    }
}
