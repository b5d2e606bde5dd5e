use crate::achievements::catalog;
use crate::AppContext;
use anyhow::Result;
use serde_json::{json, Value};

pub async fn ping(_params: Value, _ctx: &AppContext) -> Result<Value> {
    Ok(json!({ "pong": true }))
}

pub async fn status(_params: Value, ctx: &AppContext) -> Result<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    let current_streak = ctx.progress.snapshot().await.current_streak;
    let achievements_unlocked = ctx.reconciler.lock().await.unlocked_count();
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": uptime,
        "port": ctx.config.port,
        "currentStreak": current_streak,
        "achievementsUnlocked": achievements_unlocked,
        "achievementsTotal": catalog::all_definitions().len(),
        "connectedClients": ctx.broadcaster.receiver_count()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn ping_pongs() {
        let (ctx, _dir) = test_context().await;
        let result = ping(json!({}), &ctx).await.unwrap();
        assert_eq!(result["pong"], true);
    }

    #[tokio::test]
    async fn status_reports_achievement_counts() {
        let (ctx, _dir) = test_context().await;

        let before = status(json!({}), &ctx).await.unwrap();
        assert_eq!(before["achievementsUnlocked"], 0);
        assert_eq!(before["achievementsTotal"], 15);
        assert_eq!(before["version"], env!("CARGO_PKG_VERSION"));

        crate::progress::handlers::update(json!({ "goalsCompleted": 1 }), &ctx)
            .await
            .unwrap();

        let after = status(json!({}), &ctx).await.unwrap();
        assert_eq!(after["achievementsUnlocked"], 1);
        assert_eq!(after["currentStreak"], 0);
    }
}
