use std::{fmt, time::Duration};

use async_trait::async_trait;

/// Every wait the client performs goes through a `Pacer`.
#[async_trait]
pub trait Pacer: Send + Sync + fmt::Debug {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_pacer_waits_for_the_full_duration() {
        let start = tokio::time::Instant::now();
        TokioPacer.pause(Duration::from_secs(6)).await;
        assert!(start.elapsed() >= Duration::from_secs(6));
    }
}
