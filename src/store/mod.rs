//! Client-side deal cache.
//!
//! `DealStore` is the single writer of the deal list visible to the current
//! session. It fetches from the remote API, keeps derived fields in step with
//! every fetch, applies optimistic deletes, and refreshes itself in the
//! background while any deal is still being analyzed. Readers get cheap
//! snapshots, or a `watch` receiver to be told about every change.
//!
//! No public operation propagates a transport failure: reads record
//! `last_error`, writes return a `StoreError`.

mod optimistic;
mod poller;

use crate::config::Config;
use crate::datasource::DealApi;
use crate::domain::{
    Deal, DealId, FeedbackId, FeedbackSubmission, RawDeal, UserId, DEFAULT_EXPECTED_REVIEWERS,
};
use chrono::{DateTime, Utc};
use optimistic::Optimistic;
use poller::Poller;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const FETCH_FAILED: &str = "Failed to fetch deals.";
const DELETE_DEAL_FAILED: &str = "Could not delete deal. Please try again.";
const SUBMIT_FEEDBACK_FAILED: &str = "Failed to submit feedback.";
const DELETE_FEEDBACK_FAILED: &str = "Could not delete feedback.";
const PDF_FAILED: &str = "Could not fetch PDF.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Period of the background refresh while a deal is analyzing.
    pub poll_interval: Duration,
    /// Reviewer count at which a deal's review is complete.
    pub expected_reviewers: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            expected_reviewers: DEFAULT_EXPECTED_REVIEWERS,
        }
    }
}

impl From<&Config> for StoreConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            expected_reviewers: config.expected_reviewers,
        }
    }
}

/// What presentation code sees. Every change publishes a new `deals` list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DealSnapshot {
    pub deals: Arc<Vec<Deal>>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    /// When the list was last replaced by a successful fetch.
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl DealSnapshot {
    pub fn get(&self, id: DealId) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == id)
    }

    pub fn any_analyzing(&self) -> bool {
        self.deals.iter().any(Deal::is_analyzing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend rejected or never answered the request.
    #[error("{0}")]
    Remote(String),
    #[error("The {0} rating must be between 0 and 5.")]
    InvalidRating(&'static str),
}

/// Cloneable handle to the deal cache; clones share state.
#[derive(Debug, Clone)]
pub struct DealStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    api: Arc<dyn DealApi>,
    config: StoreConfig,
    state: watch::Sender<DealSnapshot>,
    session: Mutex<Option<UserId>>,
    /// Sequence number handed to the most recently started fetch.
    fetch_seq: AtomicU64,
    /// Fetches numbered at or below this are stale and are dropped.
    applied_seq: AtomicU64,
    /// Bumped on every reset; writes begun in an earlier session are discarded.
    epoch: AtomicU64,
    /// Deals whose delete is in flight; fetch results never bring them back.
    pending_deletes: Mutex<HashSet<DealId>>,
    poller: Mutex<Option<Poller>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DealStore {
    /// Create an empty store in the loading state. Nothing is fetched until
    /// `initialize` is given a user.
    pub fn new(api: Arc<dyn DealApi>, config: StoreConfig) -> Self {
        let (state, _) = watch::channel(DealSnapshot {
            is_loading: true,
            ..Default::default()
        });

        Self {
            inner: Arc::new(Inner {
                api,
                config,
                state,
                session: Mutex::new(None),
                fetch_seq: AtomicU64::new(0),
                applied_seq: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                pending_deletes: Mutex::new(HashSet::new()),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> DealSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DealSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn get(&self, id: DealId) -> Option<Deal> {
        self.inner.state.borrow().get(id).cloned()
    }

    pub fn session_user(&self) -> Option<UserId> {
        lock(&self.inner.session).clone()
    }

    /// Whether the background refresh is currently scheduled.
    pub fn is_polling(&self) -> bool {
        lock(&self.inner.poller)
            .as_ref()
            .map_or(false, |p| !p.is_finished())
    }

    /// Start (or keep) the session for `user` and load its deals once.
    ///
    /// `None` means nobody is signed in: the store is emptied and stops
    /// loading. Repeated calls with the current user are no-ops, so callers
    /// may invoke this on every render. A different user ends the previous
    /// session first.
    pub async fn initialize(&self, user: Option<UserId>) {
        let Some(user) = user else {
            if self.session_user().is_some() {
                self.dispose();
            } else {
                self.inner.state.send_if_modified(|state| {
                    std::mem::replace(&mut state.is_loading, false)
                });
            }
            return;
        };

        let replaced = {
            let mut session = lock(&self.inner.session);
            match session.as_ref() {
                Some(current) if *current == user => return,
                Some(_) => {
                    *session = Some(user.clone());
                    true
                }
                None => {
                    *session = Some(user.clone());
                    false
                }
            }
        };

        if replaced {
            info!("Session switched to {}; discarding cached deals", user);
            self.reset(true);
        } else {
            info!("Session started for {}; loading deals", user);
        }

        self.fetch_all().await;
    }

    /// End the session: stop polling, drop results of in-flight fetches, and
    /// clear the cache.
    pub fn dispose(&self) {
        if let Some(user) = lock(&self.inner.session).take() {
            info!("Session ended for {}", user);
        }
        self.reset(false);
    }

    fn reset(&self, is_loading: bool) {
        drop(lock(&self.inner.poller).take());
        lock(&self.inner.pending_deletes).clear();

        let fence = self.inner.fetch_seq.load(Ordering::SeqCst);
        self.inner.state.send_modify(|state| {
            self.inner.applied_seq.fetch_max(fence, Ordering::SeqCst);
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            *state = DealSnapshot {
                is_loading,
                ..Default::default()
            };
        });
    }

    /// Replace the whole list with the backend's current one.
    ///
    /// On failure the previous list is kept and `last_error` is set. Only the
    /// first completed fetch clears `is_loading`; later ones run silently. A
    /// response that arrives after a newer one has been applied is dropped.
    pub async fn fetch_all(&self) {
        let Some(user) = self.session_user() else {
            debug!("Skipping deal fetch: no active session");
            return;
        };

        let seq = self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.api.list_deals().await;
        let pending = lock(&self.inner.pending_deletes).clone();
        let expected_reviewers = self.inner.config.expected_reviewers;
        let applied_seq = &self.inner.applied_seq;

        let applied = self.inner.state.send_if_modified(|state| {
            if seq <= applied_seq.load(Ordering::SeqCst) {
                return false;
            }
            applied_seq.store(seq, Ordering::SeqCst);
            state.is_loading = false;

            match result {
                Ok(raw_deals) => {
                    let deals: Vec<Deal> = raw_deals
                        .into_iter()
                        .filter(|raw| !pending.contains(&raw.id))
                        .map(|raw| Deal::from_raw(raw, Some(&user), expected_reviewers))
                        .collect();
                    debug!("Fetched {} deals", deals.len());
                    state.deals = Arc::new(deals);
                    state.last_error = None;
                    state.last_synced_at = Some(Utc::now());
                }
                Err(e) => {
                    warn!("Failed to fetch deals: {}", e);
                    state.last_error = Some(e.user_message(FETCH_FAILED));
                }
            }
            true
        });

        if !applied {
            debug!("Dropping stale deal list from fetch #{}", seq);
        }

        self.reconcile_polling();
    }

    /// Prepend a deal the backend just created. No round-trip.
    pub fn add(&self, raw: RawDeal) -> Deal {
        let user = self.session_user();
        let deal = Deal::from_raw(raw, user.as_ref(), self.inner.config.expected_reviewers);

        self.inner.state.send_modify(|state| {
            let mut deals = Vec::with_capacity(state.deals.len() + 1);
            deals.push(deal.clone());
            deals.extend(state.deals.iter().filter(|d| d.id != deal.id).cloned());
            state.deals = Arc::new(deals);
        });

        self.reconcile_polling();
        deal
    }

    /// Delete a deal, removing it locally before the backend confirms.
    ///
    /// If the backend refuses, the list published before the call is restored
    /// exactly and `last_error` is set.
    pub async fn remove(&self, id: DealId) -> Result<(), StoreError> {
        lock(&self.inner.pending_deletes).insert(id);
        let change = Optimistic::apply(&self.inner.state, &self.inner.epoch, |deals| {
            deals.iter().filter(|d| d.id != id).cloned().collect()
        });

        let result = self.inner.api.delete_deal(id).await;
        lock(&self.inner.pending_deletes).remove(&id);

        let current = change.is_current();
        let outcome = match result {
            Ok(()) => {
                info!("Deleted deal {}", id);
                change.commit();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete deal {}: {}", id, e);
                let message = e.user_message(DELETE_DEAL_FAILED);
                if !change.rollback(message.clone()) {
                    debug!("Session changed during delete of deal {}; not restoring", id);
                }
                Err(StoreError::Remote(message))
            }
        };

        if current {
            self.reconcile_polling();
        }
        outcome
    }

    /// Post feedback, then refetch so the server-assigned id, ordering and any
    /// status change show up. Nothing is inserted locally.
    pub async fn submit_feedback(
        &self,
        deal_id: DealId,
        submission: FeedbackSubmission,
    ) -> Result<(), StoreError> {
        if let Some(field) = submission.ratings.out_of_range() {
            return Err(StoreError::InvalidRating(field));
        }

        match self.inner.api.submit_feedback(deal_id, &submission).await {
            Ok(feedback) => {
                info!("Submitted feedback {} on deal {}", feedback.id, deal_id);
                self.fetch_all().await;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to submit feedback on deal {}: {}", deal_id, e);
                Err(StoreError::Remote(e.user_message(SUBMIT_FEEDBACK_FAILED)))
            }
        }
    }

    /// Delete one feedback entry, then refetch to reconcile.
    pub async fn delete_feedback(
        &self,
        deal_id: DealId,
        feedback_id: FeedbackId,
    ) -> Result<(), StoreError> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        match self.inner.api.delete_feedback(feedback_id).await {
            Ok(()) => {
                info!("Deleted feedback {} on deal {}", feedback_id, deal_id);
                self.fetch_all().await;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Failed to delete feedback {} on deal {}: {}",
                    feedback_id, deal_id, e
                );
                let message = e.user_message(DELETE_FEEDBACK_FAILED);
                self.inner.state.send_if_modified(|state| {
                    if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                        return false;
                    }
                    state.last_error = Some(message.clone());
                    true
                });
                Err(StoreError::Remote(message))
            }
        }
    }

    /// Bytes of the deal's source document.
    pub async fn view_pdf(&self, id: DealId) -> Result<Vec<u8>, StoreError> {
        self.inner.api.fetch_pdf(id).await.map_err(|e| {
            warn!("Failed to load PDF for deal {}: {}", id, e);
            StoreError::Remote(e.user_message(PDF_FAILED))
        })
    }

    /// Run the background refresh exactly while a signed-in session has a deal
    /// in `Analyzing`.
    fn reconcile_polling(&self) {
        let wanted = self.inner.state.borrow().any_analyzing() && self.session_user().is_some();
        let mut poller = lock(&self.inner.poller);
        let running = poller.as_ref().map_or(false, |p| !p.is_finished());

        if wanted && !running {
            let period = self.inner.config.poll_interval;
            info!("Deal analysis in progress; refreshing every {:?}", period);
            let weak = Arc::downgrade(&self.inner);
            *poller = Some(Poller::spawn(period, move || {
                weak.upgrade().map(|inner| async move {
                    DealStore { inner }.fetch_all().await;
                })
            }));
        } else if !wanted && running {
            info!("No deals analyzing; stopping background refresh");
            *poller = None;
        }
    }
}
