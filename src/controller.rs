//! Actions triggered by channel point redemptions.
//!
//! Each action refreshes the Spotify access token, performs its player
//! calls and reports the outcome in chat. Failures never escape an action:
//! they are logged with whatever detail Spotify returned and the viewer gets
//! a generic message.

use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    chat::Chat,
    config::Config,
    error::{Error, Result},
    protocol::pubsub::Redemption,
    spotify::{ApiError, Playback},
    track::TrackId,
};

const SWAPPED: &str = "Switched to a new playlist! 🎵";
const SWAP_FAILED: &str = "Unable to swap playlists. Please try again later.";

pub struct Controller {
    playback: Arc<dyn Playback>,
    chat: Arc<dyn Chat>,

    swap_playlists_redemption: String,
    song_request_redemption: String,

    playlists: Vec<String>,

    /// Index into `playlists` of the playlist that was started last.
    ///
    /// Held for the whole swap so that concurrent swaps run one after the
    /// other.
    rotation: Mutex<usize>,
}

impl Controller {
    /// # Panics
    ///
    /// Panics if `config` has no playlists, which configuration loading
    /// rules out.
    #[must_use]
    pub fn new(config: &Config, playback: Arc<dyn Playback>, chat: Arc<dyn Chat>) -> Self {
        assert!(!config.playlists.is_empty(), "no playlists configured");

        Self {
            playback,
            chat,
            swap_playlists_redemption: config.swap_playlists_redemption.clone(),
            song_request_redemption: config.song_request_redemption.clone(),
            playlists: config.playlists.clone(),
            rotation: Mutex::new(0),
        }
    }

    /// Starts the action for a redemption on its own task.
    ///
    /// Returns the task handle, or `None` when the reward is not one of
    /// ours. Callers do not need to await the handle: actions report their
    /// own outcome.
    pub fn dispatch(self: &Arc<Self>, redemption: Redemption) -> Option<JoinHandle<()>> {
        info!("[REWARD REDEEMED] {redemption}");

        if redemption.reward == self.swap_playlists_redemption {
            let this = Arc::clone(self);
            return Some(tokio::spawn(async move { this.swap_playlists().await }));
        }

        if redemption.reward == self.song_request_redemption {
            let this = Arc::clone(self);
            let input = redemption.user_input.unwrap_or_default();
            return Some(tokio::spawn(async move {
                this.add_song_to_queue(&input, &redemption.user).await;
            }));
        }

        debug!("ignoring reward \"{}\"", redemption.reward);
        None
    }

    /// Starts the next playlist in the rotation.
    ///
    /// The rotation only advances once playback has started, so a failed
    /// swap retries the same playlist next time.
    pub async fn swap_playlists(&self) {
        let mut rotation = self.rotation.lock().await;
        let next = (*rotation + 1) % self.playlists.len();
        let playlist = &self.playlists[next];

        match self.start_playlist(playlist).await {
            Ok(()) => {
                *rotation = next;
                info!("switched to playlist: {playlist}");
                self.notify(SWAPPED).await;
            }
            Err(e) => {
                log_failure("error swapping playlists", &e);
                self.notify(SWAP_FAILED).await;
            }
        }
    }

    async fn start_playlist(&self, playlist: &str) -> Result<()> {
        self.playback.refresh_access_token().await?;
        self.playback.play_context(playlist).await
    }

    /// Queues the track linked in `input` on behalf of `user`.
    pub async fn add_song_to_queue(&self, input: &str, user: &str) {
        info!("song request by {user}: {input}");

        let Some(track_id) = TrackId::extract(input) else {
            warn!("invalid spotify track link from {user}");
            self.notify(&format!(
                "@{user}, the provided Spotify link is invalid. Please try again with a valid link."
            ))
            .await;
            return;
        };

        match self.queue_track(&track_id).await {
            Ok(message) => self.notify(&format!("@{user}, {message}")).await,
            Err(e) => {
                log_failure("error adding song to queue", &e);
                self.notify(&format!(
                    "@{user}, there was an error adding your song to the queue. Please try again later."
                ))
                .await;
            }
        }
    }

    async fn queue_track(&self, track_id: &TrackId) -> Result<String> {
        let uri = track_id.uri();
        debug!("parsed track uri: {uri}");

        self.playback.refresh_access_token().await?;
        self.playback.add_to_queue(&uri).await?;
        info!("added to queue: {uri}");

        let track = self.playback.track(track_id).await?;
        Ok(format!(
            "added \"{}\" by {} to the queue! 🎶",
            track.name,
            track.artist_names()
        ))
    }

    /// Index of the playlist that was started last.
    pub async fn playlist_index(&self) -> usize {
        *self.rotation.lock().await
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.chat.say(message).await {
            error!("could not send chat message: {e}");
        }
    }
}

fn log_failure(context: &str, e: &Error) {
    error!("{context}: {e}");
    if let Some(detail) = e.downcast::<ApiError>() {
        error!("spotify api error details: {}", detail.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, Call, MockChat, MockPlayback};

    fn controller(playback: &Arc<MockPlayback>, chat: &Arc<MockChat>) -> Arc<Controller> {
        Arc::new(Controller::new(
            &config(),
            Arc::clone(playback) as Arc<dyn Playback>,
            Arc::clone(chat) as Arc<dyn Chat>,
        ))
    }

    fn redemption(reward: &str, user_input: Option<&str>) -> Redemption {
        Redemption {
            user: "SomeViewer".to_owned(),
            reward: reward.to_owned(),
            user_input: user_input.map(ToOwned::to_owned),
        }
    }

    #[tokio::test]
    async fn rotation_wraps_around() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        for _ in 0..4 {
            controller.swap_playlists().await;
        }

        assert_eq!(controller.playlist_index().await, 1);
        assert_eq!(
            playback.contexts(),
            vec![
                "spotify:playlist:two",
                "spotify:playlist:three",
                "spotify:playlist:one",
                "spotify:playlist:two",
            ]
        );
        assert_eq!(chat.messages(), vec![SWAPPED; 4]);
    }

    #[tokio::test]
    async fn failed_swap_keeps_rotation() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        playback.fail("play_context");
        controller.swap_playlists().await;

        assert_eq!(controller.playlist_index().await, 0);
        assert_eq!(chat.messages(), vec![SWAP_FAILED]);
    }

    #[tokio::test]
    async fn failed_refresh_skips_playback() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        playback.fail("refresh_access_token");
        controller.swap_playlists().await;

        assert_eq!(playback.calls(), vec![Call::Refresh]);
        assert_eq!(chat.messages(), vec![SWAP_FAILED]);
    }

    #[tokio::test]
    async fn concurrent_swaps_each_advance_once() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        let handles: Vec<_> = (0..3)
            .filter_map(|_| controller.dispatch(redemption("Swap Playlists", None)))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(controller.playlist_index().await, 0);
        let mut contexts = playback.contexts();
        contexts.sort();
        assert_eq!(
            contexts,
            vec![
                "spotify:playlist:one",
                "spotify:playlist:three",
                "spotify:playlist:two",
            ]
        );
    }

    #[tokio::test]
    async fn song_request_queues_and_confirms() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        controller
            .dispatch(redemption(
                "Song Request",
                Some("check out spotify:track:abc123"),
            ))
            .unwrap()
            .await
            .unwrap();

        assert_eq!(
            playback.calls(),
            vec![
                Call::Refresh,
                Call::Queue("spotify:track:abc123".to_owned()),
                Call::Track("abc123".to_owned()),
            ]
        );
        assert_eq!(
            chat.messages(),
            vec!["@SomeViewer, added \"Never Gonna Give You Up\" by Rick Astley, Someone Else to the queue! 🎶"]
        );
    }

    #[tokio::test]
    async fn invalid_link_makes_no_calls() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        controller
            .add_song_to_queue("https://youtu.be/dQw4w9WgXcQ", "SomeViewer")
            .await;

        assert!(playback.calls().is_empty());
        assert_eq!(
            chat.messages(),
            vec!["@SomeViewer, the provided Spotify link is invalid. Please try again with a valid link."]
        );
    }

    #[tokio::test]
    async fn missing_input_is_an_invalid_link() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        controller
            .dispatch(redemption("Song Request", None))
            .unwrap()
            .await
            .unwrap();

        assert!(playback.calls().is_empty());
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn provider_errors_stay_out_of_chat() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        playback.fail("add_to_queue");
        controller
            .add_song_to_queue("spotify:track:abc123", "SomeViewer")
            .await;

        assert_eq!(
            chat.messages(),
            vec!["@SomeViewer, there was an error adding your song to the queue. Please try again later."]
        );
        assert!(!chat.messages()[0].contains("NO_ACTIVE_DEVICE"));
    }

    #[tokio::test]
    async fn other_rewards_are_ignored() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        assert!(controller.dispatch(redemption("Hydrate!", None)).is_none());
        assert!(playback.calls().is_empty());
        assert!(chat.messages().is_empty());
    }

    #[tokio::test]
    async fn chat_failures_are_swallowed() {
        let playback = Arc::new(MockPlayback::default());
        let chat = Arc::new(MockChat::default());
        let controller = controller(&playback, &chat);

        chat.disconnect();
        controller.swap_playlists().await;

        assert_eq!(controller.playlist_index().await, 1);
    }
}
