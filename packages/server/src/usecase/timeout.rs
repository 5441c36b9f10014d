//! Timeout wrapper for collaborator calls.

use std::{future::Future, time::Duration};

use crate::domain::StoreError;

/// Run a store call, failing with `StoreError::Timeout` after `limit`.
pub(crate) async fn store_call<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}
