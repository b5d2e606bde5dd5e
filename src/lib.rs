pub mod achievements;
pub mod config;
pub mod ipc;
pub mod progress;
pub mod storage;

// Re-export auth so main.rs can use huntd::auth directly.
pub use ipc::auth;

use std::sync::Arc;

use achievements::UnlockReconciler;
use config::DaemonConfig;
use ipc::event::EventBroadcaster;
use progress::ProgressTracker;
use storage::Storage;

/// Shared application state passed to every RPC handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    pub broadcaster: Arc<EventBroadcaster>,
    /// Last progress snapshot pushed by the app.
    pub progress: Arc<ProgressTracker>,
    /// Single writer of the unlock ledger. Handlers lock it for the whole
    /// evaluate-persist cycle so rapid updates cannot double-unlock.
    pub reconciler: Arc<tokio::sync::Mutex<UnlockReconciler>>,
    pub started_at: std::time::Instant,
    /// Local WebSocket auth token.  Every new connection must send a
    /// `daemon.auth` RPC with this token before any other method call.
    /// Empty string means auth is disabled (not recommended).
    pub auth_token: String,
}
