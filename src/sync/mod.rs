//! # Conversation Synchronizer
//!
//! Keeps the direct-message conversation between the local user and one
//! selected peer fresh by polling the message store, and shows sends
//! optimistically before the store acknowledges them.
//!
//! ## Architecture
//!
//! - **Timeline**: confirmed messages keyed by id, merged with each poll
//! - **Optimistic ledger**: pending sends, absorbed once persisted
//! - **Scheduler**: fixed-period poll loop tied to a cancellation token
//! - **Failure notice**: rate-limited reporting of background poll failures
//! - **Metrics**: per-conversation poll counters
//!
//! ## Lifecycle
//!
//! At most one conversation is live per synchronizer. Selecting a peer
//! cancels the previous conversation's poll loop and discards its state.
//! Every selection gets a new epoch; any store response that comes back for
//! an older epoch is dropped instead of applied. Dropping the synchronizer,
//! or calling [`ConversationSynchronizer::shutdown`], cancels everything.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cinesync::graph::FollowGraph;
//! use cinesync::shared::{SyncConfig, UserId};
//! use cinesync::stores::memory::{InMemoryFollowGraphStore, InMemoryMessageStore, InMemoryUserDirectory};
//! use cinesync::sync::ConversationSynchronizer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (me, friend) = (UserId::new(), UserId::new());
//! let graph = Arc::new(FollowGraph::new(Arc::new(InMemoryFollowGraphStore::new())));
//! graph.follow(me, friend).await?;
//!
//! let sync = ConversationSynchronizer::new(
//!     me,
//!     graph,
//!     Arc::new(InMemoryMessageStore::new()),
//!     Arc::new(InMemoryUserDirectory::new()),
//!     SyncConfig::default(),
//! )?;
//! sync.select(friend).await?;
//! sync.send("seen anything good lately?").await?;
//! let view = sync.view();
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod notice;
pub mod optimistic;
pub mod scheduler;
pub mod sync_state;
pub mod timeline;

pub use metrics::PollMetrics;
pub use notice::FailureNotice;
pub use optimistic::OptimisticLedger;
pub use sync_state::{ConversationPhase, ConversationView};
pub use timeline::{merge_snapshot, Timeline};

use chrono::Utc;
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::graph::FollowGraph;
use crate::shared::config::{ConfigError, SyncConfig};
use crate::shared::error::{SyncError, SyncResult};
use crate::shared::messaging::{
    ConversationKey, DisplayedMessage, Message, UserId, UserSummary,
};
use crate::stores::{MessageStore, UserDirectory};

/// State of the selected conversation
struct ActiveConversation {
    peer: UserId,
    timeline: Timeline,
    ledger: OptimisticLedger,
    rendered: Vec<DisplayedMessage>,
    notice: FailureNotice,
    metrics: PollMetrics,
    in_flight_sends: usize,
    cancel: CancellationToken,
    poller: Option<JoinHandle<()>>,
}

impl ActiveConversation {
    fn new(local: UserId, peer: UserId, config: &SyncConfig, cancel: CancellationToken) -> Self {
        Self {
            peer,
            timeline: Timeline::new(ConversationKey::new(local, peer)),
            ledger: OptimisticLedger::new(),
            rendered: Vec::new(),
            notice: FailureNotice::new(config.failure_notice_interval),
            metrics: PollMetrics::new(),
            in_flight_sends: 0,
            cancel,
            poller: None,
        }
    }

    /// Merge a snapshot; returns whether the display changed
    fn merge(&mut self, snapshot: Vec<Message>) -> bool {
        let next = merge_snapshot(&mut self.timeline, &mut self.ledger, snapshot);
        self.replace_rendered(next)
    }

    fn rerender(&mut self) -> bool {
        let next = self.timeline.render(&self.ledger);
        self.replace_rendered(next)
    }

    fn replace_rendered(&mut self, next: Vec<DisplayedMessage>) -> bool {
        if next == self.rendered {
            return false;
        }
        self.rendered = next;
        true
    }

    fn teardown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct SessionState {
    epoch: u64,
    phase: ConversationPhase,
    active: Option<ActiveConversation>,
}

impl SessionState {
    /// The active conversation, if it still belongs to `epoch`
    fn active_for(&mut self, epoch: u64) -> Option<&mut ActiveConversation> {
        if self.epoch != epoch {
            return None;
        }
        self.active.as_mut().filter(|active| !active.cancel.is_cancelled())
    }

    fn close_active(&mut self) -> Option<UserId> {
        self.epoch += 1;
        self.phase = ConversationPhase::Idle;
        self.active.take().map(|mut active| {
            active.teardown();
            active.peer
        })
    }

    fn view(&self) -> ConversationView {
        match &self.active {
            None => ConversationView::idle(),
            Some(active) => ConversationView {
                phase: self.phase,
                peer: Some(active.peer),
                messages: active.rendered.clone(),
                notice: active.notice.current().cloned(),
                metrics: active.metrics.clone(),
            },
        }
    }
}

struct Shared {
    local: UserId,
    graph: Arc<FollowGraph>,
    messages: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    config: SyncConfig,
    state: Mutex<SessionState>,
    view_tx: watch::Sender<ConversationView>,
}

impl Shared {
    /// Publish the current view; subscribers are woken only when the display changed
    fn publish(&self, state: &SessionState) {
        let next = state.view();
        self.view_tx.send_if_modified(|view| {
            let changed = !view.same_display(&next);
            *view = next;
            changed
        });
    }

    /// One poll of the conversation opened at `epoch`
    ///
    /// Returns whether the displayed sequence changed. A response for a
    /// conversation that has since been closed yields `Cancelled`.
    async fn poll_cycle(
        &self,
        epoch: u64,
        peer: UserId,
        cancel: &CancellationToken,
    ) -> SyncResult<bool> {
        let started = Instant::now();
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            result = self.messages.list_messages_between(self.local, peer) => result,
        };

        let mut state = self.state.lock().await;
        let Some(active) = state.active_for(epoch) else {
            debug!("[SYNC] discarding poll response for closed conversation with {}", peer);
            return Err(SyncError::Cancelled);
        };
        let elapsed = started.elapsed();

        let outcome = match fetched {
            Ok(snapshot) => {
                let count = snapshot.len();
                let changed = active.merge(snapshot);
                active.metrics.record_success(elapsed, changed);
                if let Some(streak) = active.notice.record_success() {
                    info!("[SYNC] polling {} recovered after {} failures", peer, streak);
                }
                debug!("[SYNC] polled {} messages with {} (changed: {})", count, peer, changed);
                Ok(changed)
            }
            Err(e) => {
                let error = SyncError::from_read(e);
                active.metrics.record_failure(elapsed);
                if active.notice.record_failure(error.clone(), Instant::now()) {
                    warn!(
                        "[SYNC] polling {} failed ({} in a row): {}",
                        peer,
                        active.notice.streak(),
                        error
                    );
                } else {
                    debug!("[SYNC] polling {} failed again: {}", peer, error);
                }
                Err(error)
            }
        };
        self.publish(&state);
        outcome
    }
}

/// Synchronizer for the local user's direct-message conversations
pub struct ConversationSynchronizer {
    shared: Arc<Shared>,
    /// Parent of every conversation token; cancelled on shutdown
    session: CancellationToken,
}

impl std::fmt::Debug for ConversationSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSynchronizer")
            .field("local", &self.shared.local)
            .finish_non_exhaustive()
    }
}

impl ConversationSynchronizer {
    /// Create a synchronizer for `local`; fails if `config` does not validate
    pub fn new(
        local: UserId,
        graph: Arc<FollowGraph>,
        messages: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        config: SyncConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (view_tx, _) = watch::channel(ConversationView::idle());
        Ok(Self {
            shared: Arc::new(Shared {
                local,
                graph,
                messages,
                directory,
                config,
                state: Mutex::new(SessionState::default()),
                view_tx,
            }),
            session: CancellationToken::new(),
        })
    }

    pub fn local_user(&self) -> UserId {
        self.shared.local
    }

    /// Peers the local user may message: everyone they follow
    pub async fn contacts(&self) -> BTreeSet<UserId> {
        self.shared.graph.following(self.shared.local).await
    }

    /// Contacts resolved through the user directory, ordered by display name
    ///
    /// Contacts the directory cannot resolve are skipped.
    pub async fn contact_list(&self) -> Vec<UserSummary> {
        let mut summaries = Vec::new();
        for id in self.contacts().await {
            match self.shared.directory.get_user(id).await {
                Ok(user) => summaries.push(user.summary()),
                Err(e) => warn!("[SYNC] skipping contact {}: {}", id, e),
            }
        }
        summaries.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    /// Open the conversation with `peer`
    ///
    /// Closes the current conversation, loads the full history, then starts
    /// polling. A failed load leaves the synchronizer idle and returns
    /// `FetchFailed`.
    pub async fn select(&self, peer: UserId) -> SyncResult<ConversationView> {
        if peer == self.shared.local {
            return Err(SyncError::invalid_operation(
                "cannot open a conversation with yourself",
            ));
        }
        if self.session.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let (epoch, cancel) = {
            let mut state = self.shared.state.lock().await;
            if let Some(previous) = state.close_active() {
                info!("[SYNC] closed conversation with {}", previous);
            }
            let cancel = self.session.child_token();
            state.phase = ConversationPhase::Loading;
            state.active = Some(ActiveConversation::new(
                self.shared.local,
                peer,
                &self.shared.config,
                cancel.clone(),
            ));
            self.shared.publish(&state);
            (state.epoch, cancel)
        };
        info!("[SYNC] loading conversation with {}", peer);

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            result = self.shared.messages.list_messages_between(self.shared.local, peer) => result,
        };

        let mut state = self.shared.state.lock().await;
        if state.active_for(epoch).is_none() {
            debug!("[SYNC] discarding history for abandoned conversation with {}", peer);
            return Err(SyncError::Cancelled);
        }

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                state.close_active();
                self.shared.publish(&state);
                warn!("[SYNC] loading conversation with {} failed: {}", peer, e);
                return Err(SyncError::from_read(e));
            }
        };

        let poller = self.spawn_poller(epoch, peer, cancel);
        state.phase = ConversationPhase::Live;
        if let Some(active) = state.active_for(epoch) {
            active.merge(snapshot);
            active.poller = Some(poller);
            info!(
                "[SYNC] conversation with {} live ({} messages)",
                peer,
                active.rendered.len()
            );
        }
        self.shared.publish(&state);
        Ok(state.view())
    }

    /// Close the current conversation, if any
    pub async fn deselect(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(peer) = state.close_active() {
            info!("[SYNC] closed conversation with {}", peer);
        }
        self.shared.publish(&state);
    }

    /// Send `content` to the selected peer
    ///
    /// The message is displayed at once as pending. On success it is
    /// replaced by the stored copy, which is returned. On failure it is
    /// removed and `SendFailed` is returned; nothing is retried.
    pub async fn send(&self, content: &str) -> SyncResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::EmptyContent);
        }
        let local = self.shared.local;

        let (epoch, peer, temp_id) = {
            let mut state = self.shared.state.lock().await;
            if !state.phase.is_live() {
                return Err(SyncError::NoActiveConversation);
            }
            let epoch = state.epoch;
            let Some(active) = state.active_for(epoch) else {
                return Err(SyncError::NoActiveConversation);
            };
            let peer = active.peer;
            if !self.shared.graph.is_following(local, peer).await {
                warn!("[SYNC] refusing to message {}: not followed by {}", peer, local);
                return Err(SyncError::NotAuthorized {
                    from: local,
                    to: peer,
                });
            }

            let pending = active.ledger.insert(
                local,
                peer,
                content.to_string(),
                Utc::now(),
                &active.timeline,
            );
            active.in_flight_sends += 1;
            active.rerender();
            state.phase = ConversationPhase::Sending;
            self.shared.publish(&state);
            (epoch, peer, pending.temp_id)
        };
        debug!("[SYNC] sending {} to {}", temp_id, peer);

        // The persist call is not tied to the conversation token: a message
        // handed to the store is sent even if the user navigates away.
        let result = self
            .shared
            .messages
            .create_message(local, peer, content.to_string())
            .await;

        let mut state = self.shared.state.lock().await;
        let still_open = match state.active_for(epoch) {
            Some(active) => {
                match &result {
                    Ok(message) => {
                        if !active.ledger.confirm(temp_id, message) {
                            debug!("[SYNC] {} already absorbed by a poll", temp_id);
                        }
                        active.timeline.upsert(message.clone());
                    }
                    Err(_) => {
                        active.ledger.rollback(temp_id);
                    }
                }
                active.in_flight_sends = active.in_flight_sends.saturating_sub(1);
                active.rerender();
                active.in_flight_sends == 0
            }
            None => false,
        };
        if still_open {
            state.phase = ConversationPhase::Live;
        }
        self.shared.publish(&state);

        match result {
            Ok(message) => {
                info!("[SYNC] message {} delivered to {}", message.id, peer);
                Ok(message)
            }
            Err(e) => {
                warn!("[SYNC] send to {} failed: {}", peer, e);
                Err(SyncError::from_send(e))
            }
        }
    }

    /// Poll the selected conversation now and report the outcome
    ///
    /// A failure keeps the previous display. Returns whether the display changed.
    pub async fn refresh_now(&self) -> SyncResult<bool> {
        let (epoch, peer, cancel) = {
            let mut state = self.shared.state.lock().await;
            if !state.phase.is_live() {
                return Err(SyncError::NoActiveConversation);
            }
            let epoch = state.epoch;
            match state.active_for(epoch) {
                Some(active) => (epoch, active.peer, active.cancel.clone()),
                None => return Err(SyncError::NoActiveConversation),
            }
        };
        self.shared.poll_cycle(epoch, peer, &cancel).await
    }

    /// Latest published view
    pub fn view(&self) -> ConversationView {
        self.shared.view_tx.borrow().clone()
    }

    /// Receiver woken whenever the displayed conversation changes
    pub fn subscribe(&self) -> watch::Receiver<ConversationView> {
        self.shared.view_tx.subscribe()
    }

    /// Cancel the current conversation and refuse further selections
    pub async fn shutdown(&self) {
        self.session.cancel();
        self.deselect().await;
        info!("[SYNC] synchronizer for {} shut down", self.shared.local);
    }

    fn spawn_poller(&self, epoch: u64, peer: UserId, cancel: CancellationToken) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let period = self.shared.config.poll_interval;
        tokio::spawn(async move {
            let token = cancel.clone();
            scheduler::run_every(period, cancel, move |_| {
                let shared = Arc::clone(&shared);
                let token = token.clone();
                async move {
                    match shared.poll_cycle(epoch, peer, &token).await {
                        Err(SyncError::Cancelled) => ControlFlow::Break(()),
                        _ => ControlFlow::Continue(()),
                    }
                }
            })
            .await;
        })
    }
}

impl Drop for ConversationSynchronizer {
    fn drop(&mut self) {
        self.session.cancel();
    }
}
