//! Server state shared by every handler.

use std::sync::Arc;

use crate::usecase::ChatEngine;

/// Shared application state
pub struct AppState {
    /// ChatEngine（接続ライフサイクルの入口）
    pub engine: Arc<ChatEngine>,
}
