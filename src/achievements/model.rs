// SPDX-License-Identifier: MIT
//! Achievement data models: the persisted unlock ledger and the ephemeral
//! per-achievement view returned by `achievements.list`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

// ─── UnlockLedger ─────────────────────────────────────────────────────────────

/// The set of achievement ids ever unlocked, persisted as the `achievements`
/// document: `{"unlockedIds": [...], "lastUpdated": "<RFC 3339>"}`.
///
/// This is the single source of truth for "permanently unlocked". Ids are
/// only ever added; counters regressing below a threshold never remove one.
/// Both fields default, so an absent document and a partial one parse the
/// same way: no unlocks yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnlockLedger {
    /// Unlocked achievement ids, sorted for stable serialisation.
    pub unlocked_ids: BTreeSet<String>,

    /// RFC 3339 timestamp of the last unlock batch. Empty until the first
    /// unlock is written.
    pub last_updated: String,
}

impl UnlockLedger {
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_ids.contains(id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked_ids.len()
    }

    /// A copy of this ledger with `ids` added and the timestamp refreshed.
    /// Existing ids are always carried over, keeping the ledger monotonic.
    pub fn with_unlocked<I, S>(&self, ids: I, last_updated: String) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unlocked_ids = self.unlocked_ids.clone();
        unlocked_ids.extend(ids.into_iter().map(Into::into));
        Self {
            unlocked_ids,
            last_updated,
        }
    }
}

// ─── AchievementView ──────────────────────────────────────────────────────────

/// One achievement as shown on the achievements screen (earned = full color,
/// unearned = grayscale with a progress bar).
///
/// `unlocked` is true when the id is in the ledger *or* the current counters
/// meet the requirement; once ledgered, `current` is pinned to `requirement`
/// so a regressed counter still renders as fully complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    /// Machine-stable identifier, e.g. `"week_warrior"`.
    pub id: String,

    /// Human-readable badge name.
    pub name: String,

    /// Short description shown on the achievement card.
    pub description: String,

    /// Progress toward the requirement, in the metric's own unit.
    pub current: f64,

    /// The threshold at which the achievement unlocks.
    pub requirement: f64,

    pub unlocked: bool,
}

// ─── UnlockEvent ──────────────────────────────────────────────────────────────

/// A newly persisted unlock, returned by the reconciler exactly once per
/// achievement so the caller can broadcast `achievement.unlocked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockEvent {
    pub id: String,
    pub name: String,
    pub description: String,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
