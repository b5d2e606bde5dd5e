// SPDX-License-Identifier: MIT
//! Progress counters pushed by the HuntLog app.
//!
//! The app owns the raw data (daily logs, bounty reports, goals) and pushes
//! pre-computed counters via `progress.update`. The daemon derives exactly
//! one value itself, the study streak, and keeps the latest snapshot in
//! memory only. Nothing here is persisted: on restart the counters are zero
//! until the app pushes again.

pub mod handlers;
pub mod streak;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

// ─── ProgressSnapshot ─────────────────────────────────────────────────────────

/// The latest known progress counters, as evaluated by the achievement
/// catalog. `current_streak` is derived from the pushed log dates; every
/// other field arrives from the app as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSnapshot {
    /// Total study hours logged, fractional.
    pub study_hours: f64,

    /// Consecutive study days ending today or yesterday (derived, never
    /// taken from the client).
    pub current_streak: u32,

    /// Total daily log entries.
    pub log_count: u64,

    /// Accepted findings of high or critical severity.
    pub accepted_findings: u64,

    /// Cumulative bounty income in the user's display currency.
    pub bounty_total: f64,

    /// Whether any earnings have been recorded, bounty or otherwise.
    pub earnings_positive: bool,

    /// Reported bugs confirmed fixed by the vendor.
    pub bug_fixes: u64,

    /// Personal goals marked completed.
    pub goals_completed: u64,
}

// ─── ProgressTracker ──────────────────────────────────────────────────────────

/// Holds the most recent snapshot for `progress.get` and `daemon.status`.
#[derive(Default)]
pub struct ProgressTracker {
    snapshot: RwLock<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest snapshot (zero-valued before the first `progress.update`).
    pub async fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn replace(&self, snapshot: ProgressSnapshot) {
        *self.snapshot.write().await = snapshot;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
