// SPDX-License-Identifier: MIT
//! The achievement catalog and its evaluator.
//!
//! Every achievement is a threshold over one numeric metric read from a
//! [`ProgressSnapshot`]. Evaluation is pure: no clock, no I/O, no memory of
//! previous runs. Anything stateful (which unlocks have been persisted,
//! which notifications have fired) lives in the reconciler, not here.
//!
//! Ids are stable across daemon versions; the persisted ledger stores them
//! verbatim, so renaming one would silently re-lock it for existing users.

use std::collections::BTreeSet;

use crate::achievements::model::AchievementView;
use crate::progress::ProgressSnapshot;

// ─── Achievement ids ──────────────────────────────────────────────────────────

pub const FIRST_LOG: &str = "first_log";
pub const LOG_100: &str = "log_100";
pub const STUDY_10H: &str = "study_10h";
pub const STUDY_100H: &str = "study_100h";
pub const STUDY_500H: &str = "study_500h";
pub const WEEK_WARRIOR: &str = "week_warrior";
pub const MONTH_MARATHON: &str = "month_marathon";
pub const FIRST_BLOOD: &str = "first_blood";
pub const CRITICAL_FIVE: &str = "critical_five";
pub const FIRST_BOUNTY: &str = "first_bounty";
pub const FOUR_FIGURES: &str = "four_figures";
pub const FIVE_FIGURES: &str = "five_figures";
pub const BUG_SQUASHER: &str = "bug_squasher";
pub const GOAL_GETTER: &str = "goal_getter";
pub const GOAL_CRUSHER: &str = "goal_crusher";

// ─── Definitions ──────────────────────────────────────────────────────────────

/// One catalog entry: a fixed threshold over a single snapshot metric.
#[derive(Debug, Clone, Copy)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: f64,
    /// Reads the metric this achievement is gated on.
    pub metric: fn(&ProgressSnapshot) -> f64,
}

impl AchievementDef {
    /// Current progress toward the requirement, in the metric's own unit.
    pub fn current(&self, snapshot: &ProgressSnapshot) -> f64 {
        (self.metric)(snapshot)
    }

    /// True once progress reaches the threshold (inclusive).
    pub fn met(&self, snapshot: &ProgressSnapshot) -> bool {
        self.current(snapshot) >= self.requirement
    }
}

/// Catalog order is display order on the achievements screen.
static DEFINITIONS: [AchievementDef; 15] = [
    AchievementDef {
        id: FIRST_LOG,
        name: "First Entry",
        description: "Write your first study log.",
        requirement: 1.0,
        metric: |s| s.log_count as f64,
    },
    AchievementDef {
        id: LOG_100,
        name: "Centurion",
        description: "Write 100 study logs.",
        requirement: 100.0,
        metric: |s| s.log_count as f64,
    },
    AchievementDef {
        id: STUDY_10H,
        name: "Warming Up",
        description: "Log 10 hours of study time.",
        requirement: 10.0,
        metric: |s| s.study_hours,
    },
    AchievementDef {
        id: STUDY_100H,
        name: "Scholar",
        description: "Log 100 hours of study time.",
        requirement: 100.0,
        metric: |s| s.study_hours,
    },
    AchievementDef {
        id: STUDY_500H,
        name: "Obsessed",
        description: "Log 500 hours of study time.",
        requirement: 500.0,
        metric: |s| s.study_hours,
    },
    AchievementDef {
        id: WEEK_WARRIOR,
        name: "Week Warrior",
        description: "Keep a 7-day logging streak.",
        requirement: 7.0,
        metric: |s| s.current_streak as f64,
    },
    AchievementDef {
        id: MONTH_MARATHON,
        name: "Month Marathon",
        description: "Keep a 30-day logging streak.",
        requirement: 30.0,
        metric: |s| s.current_streak as f64,
    },
    AchievementDef {
        id: FIRST_BLOOD,
        name: "First Blood",
        description: "Get a finding accepted.",
        requirement: 1.0,
        metric: |s| s.accepted_findings as f64,
    },
    AchievementDef {
        id: CRITICAL_FIVE,
        name: "Critical Five",
        description: "Get 5 findings accepted.",
        requirement: 5.0,
        metric: |s| s.accepted_findings as f64,
    },
    AchievementDef {
        id: FIRST_BOUNTY,
        name: "First Bounty",
        description: "Earn your first bounty payout.",
        requirement: 1.0,
        metric: |s| if s.earnings_positive { 1.0 } else { 0.0 },
    },
    AchievementDef {
        id: FOUR_FIGURES,
        name: "Four Figures",
        description: "Reach $1,000 in total bounty earnings.",
        requirement: 1000.0,
        metric: |s| s.bounty_total,
    },
    AchievementDef {
        id: FIVE_FIGURES,
        name: "Five Figures",
        description: "Reach $10,000 in total bounty earnings.",
        requirement: 10000.0,
        metric: |s| s.bounty_total,
    },
    AchievementDef {
        id: BUG_SQUASHER,
        name: "Bug Squasher",
        description: "Fix 10 bugs in your own tooling.",
        requirement: 10.0,
        metric: |s| s.bug_fixes as f64,
    },
    AchievementDef {
        id: GOAL_GETTER,
        name: "Goal Getter",
        description: "Complete your first goal.",
        requirement: 1.0,
        metric: |s| s.goals_completed as f64,
    },
    AchievementDef {
        id: GOAL_CRUSHER,
        name: "Goal Crusher",
        description: "Complete 10 goals.",
        requirement: 10.0,
        metric: |s| s.goals_completed as f64,
    },
];

/// All catalog entries in display order.
pub fn all_definitions() -> &'static [AchievementDef] {
    &DEFINITIONS
}

pub fn find(id: &str) -> Option<&'static AchievementDef> {
    DEFINITIONS.iter().find(|def| def.id == id)
}

// ─── Evaluation ───────────────────────────────────────────────────────────────

/// Ids whose requirement the snapshot currently meets, in catalog order.
pub fn eligible_ids(snapshot: &ProgressSnapshot) -> Vec<&'static str> {
    DEFINITIONS
        .iter()
        .filter(|def| def.met(snapshot))
        .map(|def| def.id)
        .collect()
}

/// Views for the achievements screen, in catalog order.
///
/// An achievement renders as unlocked when the ledger says so or the live
/// counters meet the requirement. Ledgered unlocks pin `current` to the
/// requirement, so a streak that later breaks still shows a full bar.
pub fn views(snapshot: &ProgressSnapshot, unlocked: &BTreeSet<String>) -> Vec<AchievementView> {
    DEFINITIONS
        .iter()
        .map(|def| {
            let ledgered = unlocked.contains(def.id);
            let current = if ledgered {
                def.requirement
            } else {
                def.current(snapshot)
            };
            AchievementView {
                id: def.id.to_string(),
                name: def.name.to_string(),
                description: def.description.to_string(),
                current,
                requirement: def.requirement,
                unlocked: ledgered || def.met(snapshot),
            }
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
