//! Helper utilities for naivesocks
//!
//! This module provides common utility functions used throughout the application.

use crate::error::{NaiveSocksError, Result};
use std::future::Future;
use std::time::Duration;

/// Default buffer size for IO operations
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default handshake timeout in seconds
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Run `fut` for at most `secs` seconds
///
/// Zero disables the limit.
pub async fn with_timeout<F, T>(secs: u64, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if secs == 0 {
        return fut.await;
    }

    tokio::time::timeout(duration_from_secs(secs), fut)
        .await
        .map_err(|_| NaiveSocksError::Timeout(format!("{} after {}s", what, secs)))?
}
