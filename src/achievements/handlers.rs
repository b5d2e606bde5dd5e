// SPDX-License-Identifier: MIT
//! RPC handlers for the `achievements.*` methods.

use anyhow::Result;
use serde_json::Value;

use crate::achievements::catalog;
use crate::AppContext;

/// Handle achievements.list: every catalog entry joined with live progress
/// and the persisted ledger, in display order.
pub async fn list(_params: Value, ctx: &AppContext) -> Result<Value> {
    let snapshot = ctx.progress.snapshot().await;
    let views = {
        let reconciler = ctx.reconciler.lock().await;
        catalog::views(&snapshot, &reconciler.ledger().unlocked_ids)
    };
    Ok(serde_json::to_value(views)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::test_context;

    #[tokio::test]
    async fn list_covers_whole_catalog() {
        let (ctx, _dir) = test_context().await;
        let result = list(json!({}), &ctx).await.unwrap();

        let entries = result.as_array().unwrap();
        assert_eq!(entries.len(), catalog::all_definitions().len());
        for entry in entries {
            assert!(entry["id"].is_string());
            assert!(entry["current"].is_number());
            assert!(entry["requirement"].is_number());
            assert_eq!(entry["unlocked"], false);
        }
    }

    #[tokio::test]
    async fn list_reflects_persisted_unlocks() {
        let (ctx, _dir) = test_context().await;

        crate::progress::handlers::update(json!({ "goalsCompleted": 1 }), &ctx)
            .await
            .unwrap();

        let result = list(json!({}), &ctx).await.unwrap();
        let getter = result
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"] == "goal_getter")
            .unwrap()
            .clone();
        assert_eq!(getter["unlocked"], true);
        assert_eq!(getter["current"], 1.0);
    }
}
