//! Snapshot / apply / commit-or-rollback for local mutations that run ahead
//! of server confirmation.

use super::DealSnapshot;
use crate::domain::Deal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// A local change to the deal list that has been published but not yet
/// confirmed by the backend.
#[must_use = "an optimistic change must be committed or rolled back"]
pub(crate) struct Optimistic<'a> {
    state: &'a watch::Sender<DealSnapshot>,
    epoch: &'a AtomicU64,
    started_in: u64,
    snapshot: Arc<Vec<Deal>>,
}

impl<'a> Optimistic<'a> {
    /// Remember the current list, then publish `mutate`'s result in its place.
    ///
    /// `epoch` identifies the session; it is read under the channel's write
    /// lock, so it pairs with the exact list being replaced.
    pub(crate) fn apply<F>(
        state: &'a watch::Sender<DealSnapshot>,
        epoch: &'a AtomicU64,
        mutate: F,
    ) -> Self
    where
        F: FnOnce(&[Deal]) -> Vec<Deal>,
    {
        let mut snapshot = None;
        let mut started_in = 0;
        state.send_modify(|current| {
            started_in = epoch.load(Ordering::SeqCst);
            let previous = Arc::clone(&current.deals);
            current.deals = Arc::new(mutate(&previous));
            snapshot = Some(previous);
        });

        Self {
            state,
            epoch,
            started_in,
            snapshot: snapshot.unwrap_or_default(),
        }
    }

    /// Whether the session this change was made in is still the current one.
    pub(crate) fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.started_in
    }

    /// The server accepted the change; the published list already reflects it.
    pub(crate) fn commit(self) {}

    /// Restore the exact list that was published before `apply`, and record `error`.
    ///
    /// Nothing is written if the session ended or changed since `apply`;
    /// returns whether the rollback was published.
    pub(crate) fn rollback(self, error: String) -> bool {
        let Self {
            state,
            epoch,
            started_in,
            snapshot,
        } = self;
        state.send_if_modified(|current| {
            if epoch.load(Ordering::SeqCst) != started_in {
                return false;
            }
            current.deals = snapshot;
            current.last_error = Some(error);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DealId, DealStatus, RawDeal};

    fn deal(id: i64) -> Deal {
        let raw = RawDeal {
            id: DealId(id),
            file_name: format!("{}.pdf", id),
            user_name: None,
            status: DealStatus::Complete,
            analysis_data: None,
            feedbacks: None,
        };
        Deal::from_raw(raw, None, 5)
    }

    fn ids(state: &watch::Sender<DealSnapshot>) -> Vec<i64> {
        state.borrow().deals.iter().map(|d| d.id.as_i64()).collect()
    }

    fn without(id: i64) -> impl FnOnce(&[Deal]) -> Vec<Deal> {
        move |deals| deals.iter().filter(|d| d.id != DealId(id)).cloned().collect()
    }

    #[test]
    fn test_rollback_restores_same_list() {
        let (state, _rx) = watch::channel(DealSnapshot {
            deals: Arc::new(vec![deal(1), deal(2), deal(3)]),
            ..Default::default()
        });
        let before = Arc::clone(&state.borrow().deals);

        let epoch = AtomicU64::new(0);
        let change = Optimistic::apply(&state, &epoch, without(2));
        assert_eq!(ids(&state), vec![1, 3]);

        assert!(change.rollback("Could not delete deal.".to_string()));
        assert_eq!(ids(&state), vec![1, 2, 3]);
        assert!(Arc::ptr_eq(&before, &state.borrow().deals));
        assert_eq!(
            state.borrow().last_error.as_deref(),
            Some("Could not delete deal.")
        );
    }

    #[test]
    fn test_commit_keeps_change_and_publishes_new_list() {
        let (state, rx) = watch::channel(DealSnapshot {
            deals: Arc::new(vec![deal(1), deal(2)]),
            ..Default::default()
        });
        let before = Arc::clone(&rx.borrow().deals);

        let epoch = AtomicU64::new(0);
        Optimistic::apply(&state, &epoch, without(1)).commit();
        assert_eq!(ids(&state), vec![2]);
        assert!(!Arc::ptr_eq(&before, &rx.borrow().deals));
        assert!(state.borrow().last_error.is_none());
    }

    #[test]
    fn test_rollback_skipped_after_session_change() {
        let (state, _rx) = watch::channel(DealSnapshot {
            deals: Arc::new(vec![deal(1), deal(2)]),
            ..Default::default()
        });
        let epoch = AtomicU64::new(3);

        let change = Optimistic::apply(&state, &epoch, without(2));
        state.send_modify(|current| {
            epoch.fetch_add(1, Ordering::SeqCst);
            *current = DealSnapshot::default();
        });
        assert!(!change.is_current());

        assert!(!change.rollback("Could not delete deal.".to_string()));
        assert!(state.borrow().deals.is_empty());
        assert!(state.borrow().last_error.is_none());
    }
}
