//! HTTP control surface.
//!
//! JSON endpoints that drive the Spotify player directly, without going
//! through chat:
//!
//! | Method | Path                 | Body                          |
//! |--------|----------------------|-------------------------------|
//! | GET    | `/api/current_track` |                               |
//! | POST   | `/api/playback`      | `{"action": "play"\|"pause"}` |
//! | POST   | `/api/next`          |                               |
//! | POST   | `/api/queue`         | `{"uri": "spotify:track:..."}`|
//!
//! Failures answer with `{"error": "..."}` and never include what Spotify
//! returned. The endpoints are not authenticated; bind them to loopback.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::{
    error::{Error, Result},
    spotify::{ApiError, Playback},
};

#[derive(Clone)]
struct ApiState {
    playback: Arc<dyn Playback>,
}

#[derive(Debug, Serialize)]
struct CurrentTrack {
    name: String,
    /// Artist names, comma separated.
    artist: String,
    album: String,
}

#[derive(Debug, Serialize)]
struct Status {
    status: &'static str,
}

const SUCCESS: Status = Status { status: "success" };

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct PlaybackRequest {
    #[serde(default)]
    action: String,
}

#[derive(Debug, Deserialize)]
struct QueueRequest {
    uri: String,
}

type Reply<T> = std::result::Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

/// Builds the router with all control endpoints.
pub fn router(playback: Arc<dyn Playback>) -> Router {
    Router::new()
        .route("/api/current_track", get(current_track))
        .route("/api/playback", post(control_playback))
        .route("/api/next", post(next))
        .route("/api/queue", post(queue))
        .with_state(ApiState { playback })
}

/// Binds the control surface to `addr`.
///
/// # Errors
///
/// Returns error if `addr` cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("control api listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serves the control endpoints on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns error if the server fails.
pub async fn serve<F>(
    listener: TcpListener,
    playback: Arc<dyn Playback>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(playback))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Into::into)
}

fn failure(message: &'static str, e: &Error) -> (StatusCode, Json<ErrorBody>) {
    error!("{message}: {e}");
    if let Some(detail) = e.downcast::<ApiError>() {
        error!("spotify api error details: {}", detail.body);
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { error: message }),
    )
}

async fn current_track(State(state): State<ApiState>) -> Reply<CurrentTrack> {
    const FAILED: &str = "Failed to get current track";

    let result = async {
        state.playback.refresh_access_token().await?;
        state.playback.currently_playing().await
    }
    .await;

    match result {
        Ok(playing) => match playing.and_then(|playing| playing.item) {
            Some(track) => Ok(Json(CurrentTrack {
                artist: track.artist_names(),
                album: track.album_name().to_owned(),
                name: track.name,
            })),
            None => Err((
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "No track currently playing",
                }),
            )),
        },
        Err(e) => Err(failure(FAILED, &e)),
    }
}

/// Plays or pauses. Unrecognized or missing actions leave playback alone
/// and still report success.
async fn control_playback(
    State(state): State<ApiState>,
    request: std::result::Result<Json<PlaybackRequest>, JsonRejection>,
) -> Reply<Status> {
    let request = request.map_or_else(
        |rejection| {
            warn!("unreadable playback request: {}", rejection.body_text());
            PlaybackRequest::default()
        },
        |Json(request)| request,
    );

    let result = async {
        state.playback.refresh_access_token().await?;
        match request.action.as_str() {
            "play" => state.playback.resume().await,
            "pause" => state.playback.pause().await,
            other => {
                warn!("ignoring unknown playback action \"{other}\"");
                Ok(())
            }
        }
    }
    .await;

    result
        .map(|()| Json(SUCCESS))
        .map_err(|e| failure("Failed to control playback", &e))
}

async fn next(State(state): State<ApiState>) -> Reply<Status> {
    let result = async {
        state.playback.refresh_access_token().await?;
        state.playback.skip_to_next().await
    }
    .await;

    result
        .map(|()| Json(SUCCESS))
        .map_err(|e| failure("Failed to skip track", &e))
}

async fn queue(
    State(state): State<ApiState>,
    request: std::result::Result<Json<QueueRequest>, JsonRejection>,
) -> Reply<Status> {
    const FAILED: &str = "Failed to add track to queue";

    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("unreadable queue request: {}", rejection.body_text());
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody { error: FAILED }),
            ));
        }
    };

    let result = async {
        state.playback.refresh_access_token().await?;
        state.playback.add_to_queue(&request.uri).await
    }
    .await;

    result
        .map(|()| Json(SUCCESS))
        .map_err(|e| failure(FAILED, &e))
}
