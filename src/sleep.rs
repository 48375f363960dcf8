//! Injectable waiting
//!
//! Retry backoff, the sign-in poll interval and the sidebar focus delay all
//! wait through [`Sleeper`] so tests can run them without wall-clock time.

use futures::future::BoxFuture;
use std::time::Duration;

/// Something that can wait for a duration
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real timer backed by the tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
