// SPDX-License-Identifier: MIT
//! RPC handlers for the `progress.*` methods.

use anyhow::Result;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::progress::{streak, ProgressSnapshot};
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateParams {
    study_hours: f64,
    log_dates: Vec<String>,
    /// Total log entries; defaults to the number of distinct logged days.
    log_count: Option<u64>,
    accepted_findings: u64,
    bounty_total: f64,
    /// Defaults to `bounty_total > 0`.
    earnings_positive: Option<bool>,
    bug_fixes: u64,
    goals_completed: u64,
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        anyhow::bail!("INVALID_PARAMS: {field} must be a non-negative finite number");
    }
    Ok(())
}

/// Handle progress.update: replace the tracked counters, re-derive the
/// streak, and reconcile achievements. Newly persisted unlocks are pushed
/// to every connected client as `achievement.unlocked` notifications.
pub async fn update(params: Value, ctx: &AppContext) -> Result<Value> {
    let update: UpdateParams =
        serde_json::from_value(params).map_err(|e| anyhow::anyhow!("INVALID_PARAMS: {e}"))?;

    require_non_negative("studyHours", update.study_hours)?;
    require_non_negative("bountyTotal", update.bounty_total)?;

    let days = streak::parse_log_days(update.log_dates.iter().map(String::as_str));
    let current_streak = streak::streak_on(&days, Local::now().date_naive());

    let snapshot = ProgressSnapshot {
        study_hours: update.study_hours,
        current_streak,
        log_count: update.log_count.unwrap_or(days.len() as u64),
        accepted_findings: update.accepted_findings,
        bounty_total: update.bounty_total,
        earnings_positive: update.earnings_positive.unwrap_or(update.bounty_total > 0.0),
        bug_fixes: update.bug_fixes,
        goals_completed: update.goals_completed,
    };
    debug!(
        streak = current_streak,
        logs = snapshot.log_count,
        "progress updated"
    );
    ctx.progress.replace(snapshot.clone()).await;

    let events = {
        let mut reconciler = ctx.reconciler.lock().await;
        reconciler.reconcile(&snapshot).await
    };

    for event in &events {
        ctx.broadcaster.broadcast(
            "achievement.unlocked",
            json!({
                "id": event.id,
                "name": event.name,
                "description": event.description,
                "navigateTo": "/achievements",
            }),
        );
    }

    let newly_unlocked: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    Ok(json!({
        "currentStreak": current_streak,
        "newlyUnlocked": newly_unlocked,
    }))
}

/// Handle progress.get: return the last stored snapshot.
pub async fn get(_params: Value, ctx: &AppContext) -> Result<Value> {
    let snapshot = ctx.progress.snapshot().await;
    Ok(serde_json::to_value(snapshot)?)
}
