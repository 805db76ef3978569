use std::{collections::HashMap, env, net::SocketAddr, process, sync::Arc};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use tokio::sync::{mpsc, oneshot};

use pointify::{
    api,
    chat::{self, Chat},
    config::Config,
    controller::Controller,
    error::{ErrorKind, Result},
    pubsub::{Command, Listener},
    secrets,
    signal,
    spotify::{self, Playback},
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Secrets file
    ///
    /// TOML file with any of the configuration keys, for example
    /// `SPOTIFY_REFRESH_TOKEN = "..."`. Environment variables take
    /// precedence. Keep this file private: it grants access to your Twitch
    /// and Spotify accounts.
    ///
    /// [default: secrets.toml, if present]
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    secrets_file: Option<String>,

    /// Address of the control API
    #[arg(long, value_name = "ADDR", default_value = Config::DEFAULT_API_ADDR)]
    api_addr: SocketAddr,

    /// Disable the control API
    #[arg(long, default_value_t = false, conflicts_with = "api_addr")]
    no_api: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("pointify", level);
    }

    logger.init();
}

/// Loads the secrets file, if any.
///
/// A missing file is only an error when it was named explicitly.
fn load_secrets(secrets_file: Option<&str>) -> Result<HashMap<String, String>> {
    let path = secrets_file.unwrap_or(DEFAULT_SECRETS_FILE);

    match secrets::load(path) {
        Ok(secrets) => {
            info!("loaded {} secrets from {path}", secrets.len());
            Ok(secrets)
        }
        Err(e) if e.kind == ErrorKind::NotFound && secrets_file.is_none() => {
            debug!("{path} not found, using environment only");
            Ok(HashMap::new())
        }
        Err(e) => {
            if e.kind == ErrorKind::NotFound {
                info!("read the documentation on how to write {path}");
            }
            Err(e)
        }
    }
}

/// Main application loop.
///
/// # Errors
///
/// Returns error when the configuration is incomplete or the control API
/// cannot be started. Everything after startup is logged and retried.
async fn run(args: Args) -> Result<()> {
    let secrets = load_secrets(args.secrets_file.as_deref())?;
    let mut config =
        Config::from_lookup(|key| env::var(key).ok().or_else(|| secrets.get(key).cloned()))?;
    config.api_addr = (!args.no_api).then_some(args.api_addr);
    debug!("{config:#?}");

    let playback: Arc<dyn Playback> = Arc::new(spotify::Client::new(&config)?);
    let chat: Arc<dyn Chat> = Arc::new(chat::Client::connect(&config));
    let controller = Arc::new(Controller::new(&config, Arc::clone(&playback), chat));

    // Bind before going online so that a taken port stops startup.
    let api = match config.api_addr {
        Some(addr) => {
            let listener = api::bind(addr).await?;
            let (stop, stopped) = oneshot::channel::<()>();
            let server = tokio::spawn(api::serve(listener, Arc::clone(&playback), async move {
                let _ = stopped.await;
            }));
            Some((stop, server))
        }
        None => {
            info!("control api disabled");
            None
        }
    };

    let (commands, rx) = mpsc::unbounded_channel();
    let listener = Listener::new(&config, controller);
    let listening = tokio::spawn(async move { listener.run(rx).await });

    let mut signals = signal::Handler::new()?;
    loop {
        let signal = signals.recv().await;
        if signal.is_shutdown() {
            info!("received {signal}, shutting down gracefully");
            break;
        }

        info!("received {signal}, reconnecting");
        let _ = commands.send(Command::Reconnect);
    }

    let _ = commands.send(Command::Shutdown);
    if let Err(e) = listening.await {
        error!("listener failed: {e}");
    }

    if let Some((stop, server)) = api {
        let _ = stop.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("control api failed: {e}"),
            Err(e) => error!("control api failed: {e}"),
        }
    }

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
