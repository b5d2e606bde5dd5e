// SPDX-License-Identifier: MIT
//! Achievement tracking: a fixed catalog of threshold badges, evaluated
//! against live progress counters and reconciled into a persisted unlock
//! ledger. Unlocks are permanent and announced to clients exactly once.

pub mod catalog;
pub mod handlers;
pub mod model;
pub mod reconciler;
pub mod store;

pub use catalog::AchievementDef;
pub use model::{AchievementView, UnlockEvent, UnlockLedger};
pub use reconciler::UnlockReconciler;
pub use store::{DocumentLedgerStore, LedgerStore, LedgerStoreError};
