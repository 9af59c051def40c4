//! Run context carrying the process-level cancellation signal.
//!
//! Every external call made by the pipeline (torrent client, HTTP, file copy)
//! is awaited through [`RunContext::guard`], so an interrupt stops the run at
//! the next suspension point.

use std::future::Future;

use tokio::sync::watch;

use crate::error::PipelineError;

/// Cancels every [`RunContext`] cloned from the same pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even with no receivers left.
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    rx: watch::Receiver<bool>,
}

impl RunContext {
    /// Create a context and the handle that cancels it.
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, CancelHandle { tx })
    }

    /// A context that is never cancelled.
    pub fn detached() -> Self {
        let (ctx, _handle) = Self::new();
        ctx
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail fast if the run was cancelled.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve once the run is cancelled. Pends forever if the handle was dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Await `fut` unless the run is cancelled first.
    pub async fn guard<T, E, F>(&self, fut: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<PipelineError>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(PipelineError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_through_result() {
        let ctx = RunContext::detached();
        let value = ctx
            .guard(async { Ok::<_, PipelineError>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_guard_converts_error() {
        let ctx = RunContext::detached();
        let result = ctx
            .guard(async { Err::<(), _>(std::io::Error::other("boom")) })
            .await;
        assert!(matches!(result, Err(PipelineError::Transport(_))));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let (ctx, handle) = RunContext::new();

        let task = tokio::spawn(async move {
            ctx.guard(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, PipelineError>(())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("guard did not observe cancellation")
            .unwrap();
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_check_after_cancel() {
        let (ctx, handle) = RunContext::new();
        assert!(ctx.check().is_ok());
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(PipelineError::Cancelled)));
    }

    #[test]
    fn test_guard_refuses_to_start_when_cancelled() {
        let (ctx, handle) = RunContext::new();
        handle.cancel();
        let result = tokio_test::block_on(ctx.guard(async { Ok::<_, PipelineError>(1) }));
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
