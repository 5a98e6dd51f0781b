use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::harvest::traits::{IterationResult, ReportingIteration};

/// Callback adapter that keeps an iteration at least `interval` per item.
///
/// Some discovery endpoints enforce a minimum delay between requests. A
/// [`FullRecordIterator`](crate::FullRecordIterator) fetches the next record
/// only after the callback returns, so holding every `Continue` until
/// `interval` has passed since the callback started spaces the fetches by
/// at least that much. `Terminate` and errors return immediately.
#[derive(Debug)]
pub struct Throttled<R> {
    inner: R,
    interval: Duration,
}

impl<R> Throttled<R> {
    pub fn new(inner: R, interval: Duration) -> Self {
        Self { inner, interval }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<T, R> ReportingIteration<T> for Throttled<R>
where
    T: Send + 'static,
    R: ReportingIteration<T>,
{
    async fn process(&mut self, item: T) -> io::Result<IterationResult> {
        let started = Instant::now();
        let result = self.inner.process(item).await;
        if matches!(result, Ok(IterationResult::Continue)) {
            sleep_until(started + self.interval).await;
        }
        result
    }
}
