use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use pointify::{
    api,
    error::{Error, Result},
    protocol::spotify::{Album, Artist, CurrentlyPlaying, Track},
    spotify::Playback,
    track::TrackId,
};

/// Records player commands and reports one track as playing.
#[derive(Default)]
struct Player {
    commands: Mutex<Vec<String>>,
    idle: bool,
}

impl Player {
    fn record(&self, command: impl Into<String>) -> Result<()> {
        self.commands.lock().unwrap().push(command.into());
        Ok(())
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl Playback for Player {
    async fn refresh_access_token(&self) -> Result<()> {
        self.record("refresh")
    }

    async fn play_context(&self, context_uri: &str) -> Result<()> {
        self.record(format!("play {context_uri}"))
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume")
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause")
    }

    async fn skip_to_next(&self) -> Result<()> {
        self.record("next")
    }

    async fn add_to_queue(&self, uri: &str) -> Result<()> {
        self.record(format!("queue {uri}"))
    }

    async fn track(&self, _id: &TrackId) -> Result<Track> {
        Err(Error::internal("not used by the control api"))
    }

    async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>> {
        self.record("currently playing")?;
        if self.idle {
            return Ok(None);
        }

        Ok(Some(CurrentlyPlaying {
            is_playing: true,
            item: Some(Track {
                id: Some("4uLU6hMCjMI75M1A2tKUQC".to_owned()),
                name: "Take On Me".to_owned(),
                artists: vec![Artist {
                    name: "a-ha".to_owned(),
                }],
                album: Some(Album {
                    name: "Hunting High and Low".to_owned(),
                }),
            }),
        }))
    }
}

struct Server {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<Result<()>>,
}

async fn start(player: &Arc<Player>) -> Server {
    let listener = api::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(api::serve(
        listener,
        Arc::clone(player) as Arc<dyn Playback>,
        async move {
            let _ = stopped.await;
        },
    ));

    Server { addr, stop, task }
}

impl Server {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn serves_over_http() {
    let player = Arc::new(Player::default());
    let server = start(&player).await;
    let client = reqwest::Client::new();

    let current: Value = client
        .get(format!("http://{}/api/current_track", server.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        current,
        json!({"name": "Take On Me", "artist": "a-ha", "album": "Hunting High and Low"})
    );

    let response = client
        .post(format!("http://{}/api/playback", server.addr))
        .json(&json!({"action": "pause"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client
        .post(format!("http://{}/api/queue", server.addr))
        .json(&json!({"uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    assert_eq!(
        player.commands(),
        vec![
            "refresh",
            "currently playing",
            "refresh",
            "pause",
            "refresh",
            "queue spotify:track:4uLU6hMCjMI75M1A2tKUQC",
        ]
    );

    server.shutdown().await;
}

#[tokio::test]
async fn idle_player_is_not_found() {
    let player = Arc::new(Player {
        idle: true,
        ..Player::default()
    });
    let server = start(&player).await;

    let response = reqwest::get(format!("http://{}/api/current_track", server.addr))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "No track currently playing"}));

    server.shutdown().await;
}
