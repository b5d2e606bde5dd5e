// SPDX-License-Identifier: MIT
//! Reconciles evaluated achievements against the persisted unlock ledger.
//!
//! The reconciler is the only writer of the ledger and the only producer of
//! unlock notifications. Its contract: each achievement id yields at most one
//! [`UnlockEvent`] per ledger lifetime, and an event is only emitted after
//! the unlock has been durably saved. Save failures suppress the event and
//! leave the id retryable on the next counter change.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::achievements::catalog;
use crate::achievements::model::{UnlockEvent, UnlockLedger};
use crate::achievements::store::LedgerStore;
use crate::progress::ProgressSnapshot;

pub struct UnlockReconciler {
    store: Arc<dyn LedgerStore>,

    /// Last ledger state known to be persisted.
    ledger: UnlockLedger,

    /// Ids handed to `save` this session. Entries are added before the save
    /// await point so a reconcile racing past a slow save cannot double-emit,
    /// and removed again if the save fails so the unlock can be retried.
    processed: HashSet<String>,

    loaded: bool,
}

impl UnlockReconciler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            ledger: UnlockLedger::default(),
            processed: HashSet::new(),
            loaded: false,
        }
    }

    /// Loads the persisted ledger. Runs once at startup, before the RPC
    /// server accepts connections.
    ///
    /// A missing document means a fresh profile; an unreadable one is logged
    /// and treated the same way. Worst case the daemon re-unlocks (and
    /// re-announces) achievements the user already earned, which beats
    /// refusing to track progress at all.
    pub async fn load(&mut self) {
        match self.store.load().await {
            Ok(Some(ledger)) => {
                debug!(unlocked = ledger.unlocked_count(), "loaded unlock ledger");
                self.ledger = ledger;
            }
            Ok(None) => {
                debug!("no unlock ledger yet, starting empty");
            }
            Err(e) => {
                warn!(error = %e, "failed to load unlock ledger, starting empty");
            }
        }
        self.loaded = true;
    }

    /// Evaluates the catalog against `snapshot` and persists any unlocks not
    /// already in the ledger. Returns one event per newly persisted unlock;
    /// the caller broadcasts them.
    pub async fn reconcile(&mut self, snapshot: &ProgressSnapshot) -> Vec<UnlockEvent> {
        if !self.loaded {
            warn!("reconcile called before ledger load, skipping");
            return Vec::new();
        }

        let genuinely_new: Vec<&'static str> = catalog::eligible_ids(snapshot)
            .into_iter()
            .filter(|id| !self.ledger.is_unlocked(id) && !self.processed.contains(*id))
            .collect();

        if genuinely_new.is_empty() {
            return Vec::new();
        }

        // Mark before the await so a concurrent reconcile over the same
        // snapshot cannot pick these ids up again mid-save.
        for id in &genuinely_new {
            self.processed.insert((*id).to_string());
        }

        let candidate = self
            .ledger
            .with_unlocked(genuinely_new.iter().copied(), Utc::now().to_rfc3339());

        match self.store.save(&candidate).await {
            Ok(()) => {
                info!(achievements = ?genuinely_new, "unlocked achievements");
                self.ledger = candidate;
                genuinely_new
                    .iter()
                    .filter_map(|id| catalog::find(id))
                    .map(|def| UnlockEvent {
                        id: def.id.to_string(),
                        name: def.name.to_string(),
                        description: def.description.to_string(),
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "failed to persist unlocks, will retry");
                for id in &genuinely_new {
                    self.processed.remove(*id);
                }
                Vec::new()
            }
        }
    }

    pub fn ledger(&self) -> &UnlockLedger {
        &self.ledger
    }

    pub fn unlocked_count(&self) -> usize {
        self.ledger.unlocked_count()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.ledger.is_unlocked(id)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::achievements::store::LedgerStoreError;

    /// In-memory store; counts saves so tests can assert write amplification.
    #[derive(Default)]
    struct MemoryLedgerStore {
        ledger: Mutex<Option<UnlockLedger>>,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl LedgerStore for MemoryLedgerStore {
        async fn load(&self) -> Result<Option<UnlockLedger>, LedgerStoreError> {
            Ok(self.ledger.lock().unwrap().clone())
        }

        async fn save(&self, ledger: &UnlockLedger) -> Result<(), LedgerStoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.ledger.lock().unwrap() = Some(ledger.clone());
            Ok(())
        }
    }

    /// Fails the first `failures` saves, then delegates to memory.
    #[derive(Default)]
    struct FlakyLedgerStore {
        inner: MemoryLedgerStore,
        failures: AtomicUsize,
        fail_loads: bool,
    }

    impl FlakyLedgerStore {
        fn failing_saves(n: usize) -> Self {
            let store = Self::default();
            store.failures.store(n, Ordering::SeqCst);
            store
        }
    }

    #[async_trait]
    impl LedgerStore for FlakyLedgerStore {
        async fn load(&self) -> Result<Option<UnlockLedger>, LedgerStoreError> {
            if self.fail_loads {
                return Err(LedgerStoreError::Load("disk unplugged".to_string()));
            }
            self.inner.load().await
        }

        async fn save(&self, ledger: &UnlockLedger) -> Result<(), LedgerStoreError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(LedgerStoreError::Save("disk full".to_string()));
            }
            self.inner.save(ledger).await
        }
    }

    fn snapshot_with_logs(log_count: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            log_count,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn load_absent_starts_empty() {
        let mut rec = UnlockReconciler::new(Arc::new(MemoryLedgerStore::default()));
        rec.load().await;
        assert_eq!(rec.unlocked_count(), 0);
    }

    #[tokio::test]
    async fn load_failure_recovers_to_empty() {
        let store = FlakyLedgerStore {
            fail_loads: true,
            ..Default::default()
        };
        let mut rec = UnlockReconciler::new(Arc::new(store));
        rec.load().await;

        // Still operational: unlocks persist despite the failed load.
        let events = rec.reconcile(&snapshot_with_logs(1)).await;
        assert_eq!(events.len(), 1);
        assert!(rec.is_unlocked(catalog::FIRST_LOG));
    }

    #[tokio::test]
    async fn reconcile_before_load_is_inert() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut rec = UnlockReconciler::new(store.clone());

        let events = rec.reconcile(&snapshot_with_logs(1)).await;
        assert!(events.is_empty());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unlock_fires_exactly_once() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut rec = UnlockReconciler::new(store.clone());
        rec.load().await;

        let events = rec.reconcile(&snapshot_with_logs(1)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, catalog::FIRST_LOG);
        assert_eq!(events[0].name, "First Entry");

        // Same counters again: no event, no second write.
        let events = rec.reconcile(&snapshot_with_logs(1)).await;
        assert!(events.is_empty());
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_unlocks_share_one_save() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut rec = UnlockReconciler::new(store.clone());
        rec.load().await;

        let snapshot = ProgressSnapshot {
            log_count: 1,
            study_hours: 10.0,
            accepted_findings: 1,
            ..Default::default()
        };
        let events = rec.reconcile(&snapshot).await;
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![catalog::FIRST_LOG, catalog::STUDY_10H, catalog::FIRST_BLOOD]
        );
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regressed_counters_never_relock() {
        let mut rec = UnlockReconciler::new(Arc::new(MemoryLedgerStore::default()));
        rec.load().await;

        let mut snapshot = ProgressSnapshot {
            study_hours: 12.0,
            ..Default::default()
        };
        assert_eq!(rec.reconcile(&snapshot).await.len(), 1);

        // Hours corrected downward: unlock stays, nothing new fires.
        snapshot.study_hours = 3.0;
        assert!(rec.reconcile(&snapshot).await.is_empty());
        assert!(rec.is_unlocked(catalog::STUDY_10H));
    }

    #[tokio::test]
    async fn save_failure_suppresses_event_then_retries() {
        let store = Arc::new(FlakyLedgerStore::failing_saves(1));
        let mut rec = UnlockReconciler::new(store.clone());
        rec.load().await;

        // First attempt: save fails, so no event and no unlock.
        let events = rec.reconcile(&snapshot_with_logs(1)).await;
        assert!(events.is_empty());
        assert!(!rec.is_unlocked(catalog::FIRST_LOG));

        // Next counter change retries and emits exactly one event overall.
        let events = rec.reconcile(&snapshot_with_logs(2)).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, catalog::FIRST_LOG);
        assert!(rec.is_unlocked(catalog::FIRST_LOG));

        // And it never fires again after the retry.
        assert!(rec.reconcile(&snapshot_with_logs(3)).await.is_empty());
    }

    #[tokio::test]
    async fn restart_does_not_replay_notifications() {
        let store = Arc::new(MemoryLedgerStore::default());

        let mut first = UnlockReconciler::new(store.clone());
        first.load().await;
        assert_eq!(first.reconcile(&snapshot_with_logs(1)).await.len(), 1);

        // Fresh session over the same store: ledger survives, event does not.
        let mut second = UnlockReconciler::new(store.clone());
        second.load().await;
        assert!(second.reconcile(&snapshot_with_logs(1)).await.is_empty());
        assert!(second.is_unlocked(catalog::FIRST_LOG));
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn week_warrior_survives_streak_regression() {
        let store = Arc::new(MemoryLedgerStore::default());
        let mut rec = UnlockReconciler::new(store.clone());
        rec.load().await;

        let mut snapshot = ProgressSnapshot {
            current_streak: 7,
            ..Default::default()
        };
        let events = rec.reconcile(&snapshot).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, catalog::WEEK_WARRIOR);

        // Streak collapses to 2: the ledger keeps the badge and no
        // second event fires.
        snapshot.current_streak = 2;
        assert!(rec.reconcile(&snapshot).await.is_empty());
        assert!(rec.is_unlocked(catalog::WEEK_WARRIOR));

        let views = catalog::views(&snapshot, &rec.ledger().unlocked_ids);
        let week = views
            .iter()
            .find(|v| v.id == catalog::WEEK_WARRIOR)
            .unwrap();
        assert!(week.unlocked);
        assert_eq!(week.current, week.requirement);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unlock_batches_refresh_timestamp() {
        let mut rec = UnlockReconciler::new(Arc::new(MemoryLedgerStore::default()));
        rec.load().await;
        assert!(rec.ledger().last_updated.is_empty());

        rec.reconcile(&snapshot_with_logs(1)).await;
        assert!(!rec.ledger().last_updated.is_empty());
    }
}
