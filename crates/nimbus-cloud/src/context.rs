//! Call context: deadline and cancellation for remote calls

use crate::error::{CloudError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline and cancellation signal shared by every call of a pass.
///
/// Cloning yields a handle observing the same cancellation signal.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl CallContext {
    /// A context that never expires
    pub fn background() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            deadline: None,
            cancel_tx: Arc::new(tx),
            cancel_rx: rx,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().child_with_timeout(timeout)
    }

    /// Same cancellation signal, deadline no later than `timeout` from now
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            cancel_tx: Arc::clone(&self.cancel_tx),
            cancel_rx: self.cancel_rx.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Error for an expired or cancelled context, if any
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(CloudError::Cancelled("context cancelled".into()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CloudError::Timeout("context deadline exceeded".into()));
            }
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> CloudError {
        let mut rx = self.cancel_rx.clone();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = cancelled => CloudError::Cancelled("context cancelled".into()),
            _ = expired => CloudError::Timeout("context deadline exceeded".into()),
        }
    }

    /// Run a future, aborting it when the context ends first
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = fut => result,
        }
    }

    /// Sleep for `delay`, returning early with an error if the context ends
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_run() {
        let ctx = CallContext::with_timeout(Duration::from_secs(5));
        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CloudError::Timeout(_))));
        assert!(ctx.check().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_clone() {
        let ctx = CallContext::background();
        let other = ctx.clone();

        let handle = tokio::spawn(async move { other.sleep(Duration::from_secs(3600)).await });
        tokio::task::yield_now().await;
        ctx.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(CloudError::Cancelled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_keeps_earlier_deadline() {
        let parent = CallContext::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_timeout(Duration::from_secs(10));
        assert_eq!(child.deadline(), parent.deadline());

        let fast = parent.child_with_timeout(Duration::from_millis(10));
        assert!(fast.deadline() < parent.deadline());
    }

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = CallContext::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(ctx.remaining(), None);
    }
}
