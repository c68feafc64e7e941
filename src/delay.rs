use async_trait::async_trait;
use std::time::Duration;

/// Suspension point for backoff waits. Production code sleeps on the tokio timer;
/// tests substitute a recorder that returns immediately.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
