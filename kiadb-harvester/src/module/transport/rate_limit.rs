//! Process-wide sliding-window request gate

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Admits at most `limit` requests in any `window`.
///
/// `acquire` waits until a slot is free; it never fails. One gate is shared
/// (behind an `Arc`) by every endpoint and every worker.
#[derive(Debug)]
pub struct RateGate {
    limit: usize,
    window: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateGate {
    pub fn new(limit: usize, window: Duration) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            window,
            issued: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a free slot and claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut issued = self.issued.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = issued.front() {
                    if now.duration_since(oldest) >= self.window {
                        issued.pop_front();
                    } else {
                        break;
                    }
                }

                match issued.front() {
                    Some(&oldest) if issued.len() >= self.limit => {
                        self.window - now.duration_since(oldest)
                    }
                    _ => {
                        issued.push_back(now);
                        return;
                    }
                }
            };

            tracing::trace!("Rate gate full, waiting {:?}", wait);
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_admits_limit_then_waits_for_window() {
        let gate = RateGate::new(3, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..3 {
            gate.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(1));

        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_the_budget() {
        let gate = Arc::new(RateGate::new(3, Duration::from_secs(1)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..7 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.acquire().await;
                start.elapsed()
            }));
        }

        let mut elapsed = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }
        elapsed.sort();

        let first_window = elapsed.iter().filter(|d| **d < Duration::from_secs(1)).count();
        let second_window = elapsed
            .iter()
            .filter(|d| **d >= Duration::from_secs(1) && **d < Duration::from_secs(2))
            .count();
        assert_eq!(first_window, 3);
        assert_eq!(second_window, 3);
        assert!(elapsed[6] >= Duration::from_secs(2));
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let gate = RateGate::new(0, Duration::from_secs(1));
        assert_eq!(gate.limit(), 1);
    }
}
