//! # Countdown Ticker
//!
//! Refreshes the "time left" display of one active rental.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Countdown Lifecycle                               │
//! │                                                                         │
//! │  Countdown::start(expires_at, now, 1s)                                 │
//! │       │                                                                 │
//! │       ├── already expired? ──► Expired, no task spawned                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  spawn ticker ─── interval.tick() ──► watch: Remaining("01:59:58")     │
//! │       │                  ▲                   │                          │
//! │       │                  └───────────────────┘ every period            │
//! │       │                                                                 │
//! │       ├── remaining ≤ 0 ──────────► watch: Expired, task ends          │
//! │       └── cancel() / drop handle ──► task ends                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The ticker is cosmetic: rental state is always re-derived from the stored
//! expiration on read. Elapsed time is measured on the tokio clock from the
//! `now` passed to [`Countdown::start`].

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use parknow_core::format_remaining;

/// What the countdown currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "display", rename_all = "snake_case")]
pub enum CountdownTick {
    /// `HH:MM:SS` left.
    Remaining(String),
    Expired,
}

impl CountdownTick {
    fn at(expires_at: i64, now: i64) -> Self {
        let ms = expires_at - now;
        if ms > 0 {
            CountdownTick::Remaining(format_remaining(ms))
        } else {
            CountdownTick::Expired
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, CountdownTick::Expired)
    }
}

impl std::fmt::Display for CountdownTick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountdownTick::Remaining(display) => f.write_str(display),
            CountdownTick::Expired => f.write_str(parknow_core::NOT_RENTED_MESSAGE),
        }
    }
}

pub struct Countdown;

impl Countdown {
    /// Starts a periodic ticker for a rental ending at `expires_at`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(expires_at: i64, now: i64, period: Duration) -> CountdownHandle {
        let initial = CountdownTick::at(expires_at, now);
        let (tx, rx) = watch::channel(initial.clone());

        if initial.is_expired() {
            return CountdownHandle {
                ticks: rx,
                shutdown_tx: None,
                task: None,
            };
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_ticker(expires_at, now, period, tx, shutdown_rx));

        CountdownHandle {
            ticks: rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn run_ticker(
    expires_at: i64,
    started_at: i64,
    period: Duration,
    tx: watch::Sender<CountdownTick>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let anchor = Instant::now();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(expires_at, "Countdown cancelled");
                break;
            }
            _ = interval.tick() => {
                let elapsed = i64::try_from(anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
                let tick = CountdownTick::at(expires_at, started_at.saturating_add(elapsed));
                let expired = tick.is_expired();

                tx.send_if_modified(|current| {
                    if *current == tick {
                        false
                    } else {
                        *current = tick;
                        true
                    }
                });

                if expired {
                    debug!(expires_at, "Countdown reached expiration");
                    break;
                }
            }
        }
    }
}

/// Owner of a running countdown. Dropping it stops the ticker.
pub struct CountdownHandle {
    ticks: watch::Receiver<CountdownTick>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    pub fn current(&self) -> CountdownTick {
        self.ticks.borrow().clone()
    }

    /// Waits for the next displayed value. `None` once the ticker has stopped.
    pub async fn changed(&mut self) -> Option<CountdownTick> {
        self.ticks.changed().await.ok()?;
        Some(self.ticks.borrow_and_update().clone())
    }

    /// A separate receiver for the same ticks.
    pub fn subscribe(&self) -> watch::Receiver<CountdownTick> {
        self.ticks.clone()
    }

    /// Stops the ticker and waits for it to exit.
    pub async fn cancel(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_709_649_000_000;

    #[tokio::test]
    async fn test_already_expired_spawns_nothing() {
        let mut handle = Countdown::start(NOW - 1, NOW, Duration::from_secs(1));
        assert_eq!(handle.current(), CountdownTick::Expired);
        assert!(handle.task.is_none());
        assert_eq!(handle.changed().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_down_to_expired() {
        let mut handle = Countdown::start(NOW + 3_000, NOW, Duration::from_secs(1));
        assert_eq!(
            handle.current(),
            CountdownTick::Remaining("00:00:03".to_string())
        );

        let mut seen = Vec::new();
        while let Some(tick) = handle.changed().await {
            seen.push(tick);
        }

        assert_eq!(
            seen,
            vec![
                CountdownTick::Remaining("00:00:02".to_string()),
                CountdownTick::Remaining("00:00:01".to_string()),
                CountdownTick::Expired,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticker() {
        let handle = Countdown::start(NOW + 3_600_000, NOW, Duration::from_secs(1));
        let mut ticks = handle.subscribe();

        handle.cancel().await;

        assert!(ticks.changed().await.is_err());
        assert_eq!(
            *ticks.borrow(),
            CountdownTick::Remaining("01:00:00".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticker() {
        let handle = Countdown::start(NOW + 3_600_000, NOW, Duration::from_secs(1));
        let mut ticks = handle.subscribe();
        drop(handle);

        assert!(ticks.changed().await.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CountdownTick::Remaining("00:10:00".to_string()).to_string(),
            "00:10:00"
        );
        assert_eq!(
            CountdownTick::Expired.to_string(),
            parknow_core::NOT_RENTED_MESSAGE
        );
    }
}
