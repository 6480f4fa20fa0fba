//! Bounded retry for transient connectivity faults.
//!
//! Mirrors the configured policy of the store connection: at most 3
//! automatic retries with growing backoff, for transient faults only.
//! Everything else surfaces immediately. This policy is internal to the
//! persistence layer; callers above it only ever see the final outcome.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, StoreError};

const MAX_RETRIES: u32 = 3;
const BACKOFF: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_secs(2),
    Duration::from_secs(8),
];

pub(crate) async fn with_retries<T, F, Fut>(operation: &'static str, mut run: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match run().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                let delay = BACKOFF[attempt as usize];
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient database fault, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                return Err(StoreError::Unavailable {
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
