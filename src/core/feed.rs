use crate::core::merge;
use crate::models::{FeedStats, Match, ProfileCard, SendMessageRequest, ViewState};
use crate::services::{Collaborators, PictureResolver, ServiceError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, trace, warn};
use validator::Validate;

/// Errors surfaced by feed operations
///
/// None of these touch the content state; a failed batch fetch is reported
/// through `FeedContentState::Error` instead.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Swipe decision failed: {0}")]
    Decision(#[source] ServiceError),

    #[error("Sending message failed: {0}")]
    Messaging(#[source] ServiceError),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Tuning of the picture resolution fan-out
#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    /// Extra attempts per picture after the first failure
    pub resolve_retries: u32,
    /// Backoff before retry `n` is `n * retry_backoff`
    pub retry_backoff: Duration,
    /// Abort resolutions of a superseded load instead of letting them finish
    pub cancel_stale_tasks: bool,
    /// Upper bound on concurrent resolver calls, unbounded when `None`
    pub max_concurrent_resolutions: Option<usize>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            resolve_retries: 0,
            retry_backoff: Duration::from_millis(250),
            cancel_stale_tasks: false,
            max_concurrent_resolutions: None,
        }
    }
}

/// Owner of the swipeable profile feed
///
/// Holds the single `ViewState` in a watch channel. Every mutation is an
/// atomic read-modify-publish on that channel, so picture resolutions
/// completing in any order merge without losing updates.
/// Observers get the current value plus change notifications via
/// [`FeedMachine::subscribe`].
pub struct FeedMachine {
    collaborators: Collaborators,
    options: FeedOptions,
    state: Arc<watch::Sender<ViewState>>,
    tasks: Mutex<Resolutions>,
    permits: Option<Arc<Semaphore>>,
}

/// Spawned picture resolutions
///
/// `settle` takes `running` out to drain it without holding the lock, so
/// cancellation goes through `handles`, which stays behind.
#[derive(Default)]
struct Resolutions {
    running: JoinSet<()>,
    handles: Vec<AbortHandle>,
}

impl Resolutions {
    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        self.running.abort_all();
    }

    fn reap(&mut self) {
        while self.running.try_join_next().is_some() {}
        self.handles.retain(|handle| !handle.is_finished());
    }
}

/// One picture slot to resolve
struct PictureJob {
    generation: u64,
    profile_id: String,
    index: usize,
    picture_name: String,
}

impl FeedMachine {
    pub fn new(collaborators: Collaborators, options: FeedOptions) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        let permits = options
            .max_concurrent_resolutions
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        Self {
            collaborators,
            options,
            state: Arc::new(state),
            tasks: Mutex::new(Resolutions::default()),
            permits,
        }
    }

    /// Create a machine and run the first load
    pub async fn start(collaborators: Collaborators, options: FeedOptions) -> Self {
        let machine = Self::new(collaborators, options);
        machine.load_feed().await;
        machine
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn stats(&self) -> FeedStats {
        FeedStats::of(&self.state.borrow())
    }

    /// Fetch a fresh batch and fan out picture resolution
    ///
    /// Returns once the batch is published; pictures keep arriving through
    /// the state stream afterwards. Results of earlier loads still in flight
    /// are discarded when they complete.
    pub async fn load_feed(&self) {
        let mut generation = 0;
        self.state.send_modify(|state| generation = merge::begin_load(state));

        if self.options.cancel_stale_tasks {
            self.tasks.lock().await.abort_all();
        }

        info!("Loading feed (generation {})", generation);

        let profiles = match self.collaborators.profiles.fetch_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to fetch profiles (generation {}): {}", generation, e);
                let message = e.to_string();
                self.state
                    .send_if_modified(|state| merge::publish_error(state, generation, message));
                return;
            }
        };

        let jobs: Vec<PictureJob> = profiles
            .iter()
            .flat_map(|profile| {
                profile
                    .picture_names
                    .iter()
                    .enumerate()
                    .map(|(index, picture_name)| PictureJob {
                        generation,
                        profile_id: profile.id.clone(),
                        index,
                        picture_name: picture_name.clone(),
                    })
            })
            .collect();
        let card_count = profiles.len();

        if !self
            .state
            .send_if_modified(|state| merge::publish_batch(state, generation, profiles))
        {
            debug!("Discarded batch of superseded generation {}", generation);
            return;
        }

        info!(
            "Feed loaded with {} cards, resolving {} pictures",
            card_count,
            jobs.len()
        );

        let mut tasks = self.tasks.lock().await;
        tasks.reap();

        for job in jobs {
            let handle = tasks.running.spawn(resolve_picture(
                self.collaborators.pictures.clone(),
                self.state.clone(),
                self.permits.clone(),
                self.options,
                job,
            ));
            tasks.handles.push(handle);
        }
    }

    /// Record a like or pass for a card
    ///
    /// The card stays in the stack; callers remove it with
    /// [`FeedMachine::dismiss_top_card`] once it has left the screen.
    pub async fn decide(
        &self,
        card: &ProfileCard,
        is_like: bool,
    ) -> Result<Option<Match>, FeedError> {
        if !is_like {
            self.collaborators
                .swipes
                .pass(&card.profile)
                .await
                .map_err(|e| {
                    warn!("Failed to pass profile {}: {}", card.id(), e);
                    FeedError::Decision(e)
                })?;

            debug!("Passed profile {}", card.id());
            return Ok(None);
        }

        let new_match = self
            .collaborators
            .swipes
            .like(&card.profile)
            .await
            .map_err(|e| {
                warn!("Failed to like profile {}: {}", card.id(), e);
                FeedError::Decision(e)
            })?;

        match &new_match {
            Some(found) => {
                info!("New match {} with profile {}", found.id, card.id());
                let found = found.clone();
                self.state
                    .send_modify(|state| merge::open_match_dialog(state, found, card));
            }
            None => debug!("Liked profile {}", card.id()),
        }

        Ok(new_match)
    }

    /// Remove the topmost card, returning it
    ///
    /// Call exactly once per dismissed card: each call removes another one.
    pub fn dismiss_top_card(&self) -> Option<ProfileCard> {
        let mut removed = None;
        self.state.send_if_modified(|state| {
            removed = merge::drop_top_card(state);
            removed.is_some()
        });

        if let Some(card) = &removed {
            debug!("Dismissed card {}", card.id());
        }
        removed
    }

    pub fn close_dialog(&self) {
        self.state.send_if_modified(merge::close_dialog);
    }

    pub async fn send_message(&self, match_id: &str, text: &str) -> Result<(), FeedError> {
        let request = SendMessageRequest::new(match_id, text);
        request
            .validate()
            .map_err(|e| FeedError::InvalidMessage(e.to_string()))?;

        self.collaborators
            .messages
            .send(&request.match_id, &request.text)
            .await
            .map_err(|e| {
                warn!("Failed to send message to match {}: {}", request.match_id, e);
                FeedError::Messaging(e)
            })?;

        debug!("Sent message to match {}", request.match_id);
        Ok(())
    }

    /// Wait for every picture resolution spawned so far
    pub async fn settle(&self) {
        loop {
            let mut pending = std::mem::take(&mut self.tasks.lock().await.running);
            if pending.is_empty() {
                return;
            }

            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    if e.is_panic() {
                        warn!("Picture resolution task panicked: {}", e);
                    }
                }
            }
        }
    }
}

async fn resolve_picture(
    resolver: Arc<dyn PictureResolver>,
    state: Arc<watch::Sender<ViewState>>,
    permits: Option<Arc<Semaphore>>,
    options: FeedOptions,
    job: PictureJob,
) {
    let _permit = match permits {
        Some(permits) => permits.acquire_owned().await.ok(),
        None => None,
    };

    let mut attempt = 0;
    let url = loop {
        match resolver.resolve(&job.profile_id, &job.picture_name).await {
            Ok(url) => break url,
            Err(e) if attempt < options.resolve_retries => {
                attempt += 1;
                debug!(
                    "Retrying picture {} of profile {} (attempt {}): {}",
                    job.picture_name, job.profile_id, attempt, e
                );
                tokio::time::sleep(options.retry_backoff * attempt).await;

                let stale = state.borrow().generation != job.generation;
                if stale {
                    trace!("Stopped retrying picture {} of stale generation", job.picture_name);
                    return;
                }
            }
            Err(e) => {
                warn!(
                    "Failed to resolve picture {} of profile {}: {}",
                    job.picture_name, job.profile_id, e
                );
                return;
            }
        }
    };

    let merged = state.send_if_modified(|view| {
        merge::merge_picture(view, job.generation, &job.profile_id, job.index, &url)
    });

    if merged {
        debug!("Resolved picture {} of profile {}", job.index, job.profile_id);
    } else {
        trace!(
            "Discarded stale picture {} of profile {} (generation {})",
            job.index,
            job.profile_id,
            job.generation
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DialogState, FeedContentState, PictureSlot};
    use crate::services::{
        MockMessageService, MockPictureResolver, MockProfileSource, MockSwipeService,
    };

    fn demo_machine() -> FeedMachine {
        FeedMachine::new(Collaborators::demo(), FeedOptions::default())
    }

    #[tokio::test]
    async fn test_initial_state() {
        let machine = demo_machine();
        let state = machine.state();
        assert_eq!(state.dialog, DialogState::NoDialog);
        assert_eq!(state.content, FeedContentState::Loading);
    }

    #[tokio::test]
    async fn test_demo_feed_resolves_every_picture() {
        let machine = FeedMachine::start(Collaborators::demo(), FeedOptions::default()).await;
        machine.settle().await;

        let stats = machine.stats();
        assert_eq!(stats.cards, 8);
        assert_eq!(stats.pending_slots, 0);
        assert_eq!(stats.resolved_slots, 8);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_slot_pending() {
        let pictures = Arc::new(
            MockPictureResolver::new()
                .with_url("1", "a", "https://img/a")
                .with_failure("b"),
        );
        let collaborators = Collaborators {
            profiles: Arc::new(MockProfileSource::new(vec![crate::models::Profile {
                id: "1".into(),
                name: "One".into(),
                age: 30,
                picture_names: vec!["a".into(), "b".into()],
            }])),
            pictures: pictures.clone(),
            swipes: Arc::new(MockSwipeService::new()),
            messages: Arc::new(MockMessageService::new()),
        };
        let options = FeedOptions {
            resolve_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..FeedOptions::default()
        };

        let machine = FeedMachine::start(collaborators, options).await;
        machine.settle().await;

        let state = machine.state();
        let card = &state.content.cards().unwrap()[0];
        assert_eq!(card.slots()[0], PictureSlot::Resolved("https://img/a".into()));
        assert_eq!(card.slots()[1], PictureSlot::Pending("b".into()));
        // one call for "a", three for "b"
        assert_eq!(pictures.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_message_is_not_sent() {
        let messages = Arc::new(MockMessageService::new());
        let collaborators = Collaborators {
            messages: messages.clone(),
            ..Collaborators::demo()
        };
        let machine = FeedMachine::new(collaborators, FeedOptions::default());

        let result = machine.send_message("m1", "").await;
        assert!(matches!(result, Err(FeedError::InvalidMessage(_))));
        assert!(messages.sent().is_empty());
    }
}
