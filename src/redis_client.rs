use redis::aio::ConnectionManager;

use crate::error::Result;

/// Creates a single `ConnectionManager` that auto-reconnects on failure.
///
/// `ConnectionManager` is cheaply cloneable; every clone shares the same
/// underlying multiplexed TCP connection. The flag store only touches one
/// key, so a single connection is plenty.
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let conn = ConnectionManager::new(client).await?;
    tracing::info!(url, "connected to redis");
    Ok(conn)
}
