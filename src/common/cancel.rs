//! Cancellation plumbing
//!
//! Every network-facing operation takes a `CancellationToken`; the helper
//! below races the operation against it so a cancelled caller gets
//! `Error::Cancelled` promptly instead of a late result.

use crate::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, async { Ok(5) }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_while_pending() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result: Result<()> = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
