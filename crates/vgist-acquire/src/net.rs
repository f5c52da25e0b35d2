//! Shared HTTP download plumbing for strategies.

use futures::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StrategyError;

/// Classify a non-success HTTP status into a strategy error.
pub(crate) fn classify_status(status: StatusCode) -> StrategyError {
    match status.as_u16() {
        403 | 429 => StrategyError::blocked(status.to_string()),
        404 | 410 => StrategyError::no_stream(status.to_string()),
        _ => StrategyError::transient(status.to_string()),
    }
}

/// Stream a response body to `part`, then atomically publish it at `dest`.
///
/// The rename keeps a partially-written file from ever being observed at the
/// destination, even when this attempt has already been abandoned by the
/// orchestrator.
pub(crate) async fn stream_to_file(
    request: reqwest::RequestBuilder,
    part: &Path,
    dest: &Path,
) -> Result<PathBuf, StrategyError> {
    let response = request.send().await.map_err(StrategyError::from)?;

    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status));
    }

    let mut file = tokio::fs::File::create(part).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(StrategyError::from)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    if written == 0 {
        let _ = tokio::fs::remove_file(part).await;
        return Err(StrategyError::no_stream("response body was empty"));
    }

    tokio::fs::rename(part, dest).await?;
    debug!(dest = %dest.display(), bytes = written, "Streamed media to disk");

    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StrategyError::BlockedOrRateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            StrategyError::BlockedOrRateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            StrategyError::NoStreamFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            StrategyError::TransientNetwork(_)
        ));
    }
}
