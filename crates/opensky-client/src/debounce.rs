// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Coalescing of bursty updates such as viewport pans and zooms.
//!
//! [`Debounce::ready`] is cancel-safe and meant to sit in a `tokio::select!`
//! loop next to other event sources.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Default quiet period for viewport changes.
pub const DEFAULT_VIEWPORT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the latest pushed value until no new value arrived for `delay`.
#[derive(Debug)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debounce<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
        }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some(value);
        self.deadline = Some(Instant::now() + self.delay);
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// Wait for the quiet period to end and return the latest value.
    ///
    /// Never completes while nothing is pending.
    pub async fn ready(&mut self) -> T {
        loop {
            match self.deadline {
                Some(deadline) => {
                    // A dropped `ready()` keeps the deadline, so a later
                    // call resumes the same quiet period.
                    sleep_until(deadline).await;
                    self.deadline = None;
                    if let Some(value) = self.pending.take() {
                        return value;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced_to_last_value() {
        let mut debounce = Debounce::new(Duration::from_millis(300));
        debounce.push(1);
        tokio::time::advance(Duration::from_millis(100)).await;
        debounce.push(2);
        tokio::time::advance(Duration::from_millis(100)).await;
        debounce.push(3);

        let start = Instant::now();
        assert_eq!(debounce.ready().await, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert!(!debounce.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_pending_never_fires() {
        let mut debounce: Debounce<u32> = Debounce::new(Duration::from_millis(300));
        let result = tokio::time::timeout(Duration::from_secs(5), debounce.ready()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let mut debounce = Debounce::new(Duration::from_millis(300));
        debounce.push("pan");
        assert_eq!(debounce.cancel(), Some("pan"));
        let result = tokio::time::timeout(Duration::from_secs(1), debounce.ready()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_fire_separately() {
        let mut debounce = Debounce::new(Duration::from_millis(300));
        debounce.push(1);
        assert_eq!(debounce.ready().await, 1);
        debounce.push(2);
        assert_eq!(debounce.ready().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_keeps_quiet_period() {
        let mut debounce = Debounce::new(Duration::from_millis(300));
        let start = Instant::now();
        debounce.push(7);

        let early = tokio::time::timeout(Duration::from_millis(100), debounce.ready()).await;
        assert!(early.is_err());
        assert!(debounce.is_pending());

        assert_eq!(debounce.ready().await, 7);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
