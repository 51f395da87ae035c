//! Waiting for the UI to settle
//!
//! After every state-changing action the page needs time to re-render. Two
//! strategies are supported: blind fixed pauses (what a hand-written Selenium
//! script does) and polling the expected post-condition with exponential
//! backoff under a bounded timeout.

use crate::error::Result;
use crate::page::PageDriver;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff schedule bounded by a total timeout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// Same schedule with a different total budget
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Delays to sleep between reads; they never add up to more than `timeout`
    pub fn intervals(&self) -> Vec<Duration> {
        let mut intervals = Vec::new();
        let mut elapsed = Duration::ZERO;
        let mut next = self.initial.min(self.max_interval);

        if next.is_zero() {
            return intervals;
        }

        while elapsed < self.timeout {
            let step = next.min(self.timeout - elapsed);
            intervals.push(step);
            elapsed += step;
            next = self.grow(next);
        }

        intervals
    }

    /// Next delay after `current`, saturating at `max_interval`
    fn grow(&self, current: Duration) -> Duration {
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else if self.multiplier > 0.0 {
            return self.max_interval;
        } else {
            1.0
        };

        Duration::try_from_secs_f64(current.as_secs_f64() * multiplier)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Which kind of action just happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// A control was clicked (difficulty button, first card)
    Action,
    /// The document was reloaded
    Reload,
    /// One card was flipped during the game-over sweep
    CardFlip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncStrategy {
    /// Sleep a fixed time, then look once
    Fixed {
        action: Duration,
        reload: Duration,
        card_flip: Duration,
    },
    /// Look repeatedly until the condition holds or the budget runs out
    Poll {
        backoff: Backoff,
        card_flip_timeout: Duration,
    },
}

impl Default for SyncStrategy {
    fn default() -> Self {
        SyncStrategy::Poll {
            backoff: Backoff::default(),
            card_flip_timeout: Duration::from_millis(800),
        }
    }
}

impl SyncStrategy {
    /// 1s after a click, 0.5s after a reload, 0.8s per card flip
    pub fn fixed() -> Self {
        SyncStrategy::Fixed {
            action: Duration::from_millis(1000),
            reload: Duration::from_millis(500),
            card_flip: Duration::from_millis(800),
        }
    }

    fn fixed_delay(
        action: Duration,
        reload: Duration,
        card_flip: Duration,
        settle: Settle,
    ) -> Duration {
        match settle {
            Settle::Action => action,
            Settle::Reload => reload,
            Settle::CardFlip => card_flip,
        }
    }

    /// Wait for an action to take effect when there is nothing specific to read
    pub async fn settle<P: PageDriver + ?Sized>(&self, page: &P, settle: Settle) {
        if let SyncStrategy::Fixed {
            action,
            reload,
            card_flip,
        } = *self
        {
            page.pause(Self::fixed_delay(action, reload, card_flip, settle))
                .await;
        }
    }
}

/// Last observed value and whether the condition was met
#[derive(Debug, Clone, PartialEq)]
pub struct Waited<T> {
    pub value: T,
    pub met: bool,
}

/// Read the page until `done` holds for the observed value.
///
/// Under `Fixed` the read runs once, after the fixed pause. Under `Poll`
/// read errors count as "not yet"; the last error is returned only if the
/// budget runs out without a successful read.
pub async fn wait_for<P, T, F, Fut, C>(
    page: &P,
    strategy: &SyncStrategy,
    settle: Settle,
    mut observe: F,
    done: C,
) -> Result<Waited<T>>
where
    P: PageDriver + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Fn(&T) -> bool,
{
    let backoff = match *strategy {
        SyncStrategy::Fixed { .. } => {
            strategy.settle(page, settle).await;
            let value = observe().await?;
            let met = done(&value);
            return Ok(Waited { value, met });
        }
        SyncStrategy::Poll {
            backoff,
            card_flip_timeout,
        } => match settle {
            Settle::CardFlip => backoff.with_timeout(card_flip_timeout),
            Settle::Action | Settle::Reload => backoff,
        },
    };

    let mut last = observe().await;
    if matches!(&last, Ok(value) if done(value)) {
        return last.map(|value| Waited { value, met: true });
    }

    for delay in backoff.intervals() {
        page.pause(delay).await;
        last = observe().await;
        if matches!(&last, Ok(value) if done(value)) {
            return last.map(|value| Waited { value, met: true });
        }
    }

    last.map(|value| Waited { value, met: false })
}
