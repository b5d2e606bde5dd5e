// SPDX-License-Identifier: MIT
//! Persistence seam for the unlock ledger.
//!
//! The reconciler talks to a [`LedgerStore`] trait object so its exactly-once
//! logic can be tested against in-memory and failure-injecting stores. The
//! production implementation keeps the ledger as one JSON document in the
//! daemon's SQLite database.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::achievements::model::UnlockLedger;
use crate::storage::Storage;

/// Document name the ledger is stored under.
const LEDGER_DOCUMENT: &str = "achievements";

#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("failed to load unlock ledger: {0}")]
    Load(String),

    #[error("failed to save unlock ledger: {0}")]
    Save(String),
}

/// Durable home of the unlock ledger.
///
/// `load` returns `Ok(None)` when no ledger has ever been written; a ledger
/// that exists but cannot be read comes back as `Err(Load)`, and the caller
/// decides whether that is recoverable.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load(&self) -> Result<Option<UnlockLedger>, LedgerStoreError>;
    async fn save(&self, ledger: &UnlockLedger) -> Result<(), LedgerStoreError>;
}

// ─── SQLite-backed implementation ─────────────────────────────────────────────

/// Stores the ledger as the `achievements` document.
pub struct DocumentLedgerStore {
    storage: Arc<Storage>,
}

impl DocumentLedgerStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl LedgerStore for DocumentLedgerStore {
    async fn load(&self) -> Result<Option<UnlockLedger>, LedgerStoreError> {
        let raw = self
            .storage
            .read_document(LEDGER_DOCUMENT)
            .await
            .map_err(|e| LedgerStoreError::Load(format!("{e:#}")))?;

        match raw {
            Some(json) => {
                let ledger = serde_json::from_str(&json)
                    .map_err(|e| LedgerStoreError::Load(format!("corrupt ledger document: {e}")))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, ledger: &UnlockLedger) -> Result<(), LedgerStoreError> {
        let json = serde_json::to_string(ledger)
            .map_err(|e| LedgerStoreError::Save(format!("serialise ledger: {e}")))?;
        self.storage
            .write_document(LEDGER_DOCUMENT, &json)
            .await
            .map_err(|e| LedgerStoreError::Save(format!("{e:#}")))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
