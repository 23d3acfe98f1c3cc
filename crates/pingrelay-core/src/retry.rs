// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-retry combinator for polling external state.
//!
//! Policy (attempt count, delay curve) lives at the call site instead of
//! being buried in inline loops, so it can be tested and reused.

use std::future::Future;
use std::time::Duration;

/// Runs `op` up to `max_attempts` times, sleeping `delay(attempt)` between
/// failures. The attempt number passed to both closures is zero-based.
///
/// Returns the first `Ok`, or the last `Err` once attempts are exhausted.
pub async fn retry<T, E, F, Fut, D>(mut op: F, max_attempts: u32, mut delay: D) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    D: FnMut(u32) -> Duration,
{
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < max_attempts {
                    tokio::time::sleep(delay(attempt)).await;
                }
            }
        }
    }
    match last_err {
        Some(e) => Err(e),
        // max_attempts == 0 is a caller bug; loop above never ran.
        None => unreachable!("retry requires max_attempts >= 1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
            5,
            |_| Duration::ZERO,
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(attempt)
                    }
                }
            },
            5,
            |_| Duration::ZERO,
        )
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), u32> = retry(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(attempt) }
            },
            3,
            |_| Duration::ZERO,
        )
        .await;
        assert_eq!(result, Err(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
