//! Per-call time bounds for backend operations

use std::future::Future;
use std::time::Duration;

use tokio::time::error::Elapsed;

/// Run `fut`, failing with the backend's timeout error once `limit` passes
pub async fn with_deadline<T, E, F>(limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Elapsed>,
{
    tokio::time::timeout(limit, fut).await?
}
