//! Background refresh for a [`Session`].
//!
//! Reloads on a fixed interval while the consumer is visible, and checks for
//! stale data whenever visibility is regained. Results go to the consumer
//! over an mpsc channel; the loop ends on [`SchedulerHandle::stop`] or when
//! the receiver is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{Result, Session, TrendError};
use crate::cache::CacheSnapshot;
use crate::store::Store;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between scheduled loads (default: 5 minutes)
    pub interval: Duration,
    /// Whether to load immediately on start
    pub load_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            load_on_start: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse interval string like "30s", "5m", "1h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let secs = if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 3600)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map(|m| m * 60)
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 86400)
                .map_err(|_| format!("Invalid days: {}", days))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '30s', '5m', '1h'", s))
        }?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// What the consumer receives after each trigger.
#[derive(Debug)]
pub enum RefreshEvent {
    Updated(CacheSnapshot),
    Failed(String),
}

/// Stops a running [`Scheduler`] from another task.
#[derive(Clone)]
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

pub struct Scheduler<S: Store> {
    session: Session<S>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl<S: Store + Send + Sync> Scheduler<S> {
    pub fn new(session: Session<S>, config: SchedulerConfig) -> Self {
        Self {
            session,
            config,
            running: Arc::new(AtomicBool::new(true)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            running: self.running.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Run until stopped. Returns the session so the caller keeps its state.
    pub async fn run(
        mut self,
        mut visibility: watch::Receiver<Visibility>,
        events: mpsc::Sender<RefreshEvent>,
    ) -> Session<S> {
        tracing::info!(
            "Refresh scheduler started for {} (interval: {})",
            self.session.category(),
            SchedulerConfig::format_interval(self.config.interval.as_secs())
        );

        if self.config.load_on_start {
            let result = self.session.load().await;
            if !dispatch(&events, result).await {
                return self.session;
            }
        }

        let period = if self.config.interval.is_zero() {
            SchedulerConfig::default().interval
        } else {
            self.config.interval
        };
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        let mut visibility_open = true;

        while self.running.load(Ordering::SeqCst) {
            let keep_going = tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = timer.tick() => {
                    if *visibility.borrow() == Visibility::Visible {
                        tracing::debug!("Running scheduled load");
                        let result = self.session.load().await;
                        dispatch(&events, result).await
                    } else {
                        true
                    }
                }
                changed = visibility.changed(), if visibility_open => {
                    if changed.is_err() {
                        // Sender dropped; keep running on the timer alone.
                        visibility_open = false;
                        true
                    } else if *visibility.borrow_and_update() == Visibility::Visible {
                        tracing::debug!("Visibility regained, checking staleness");
                        match self.session.on_visible().await {
                            Ok(Some(snapshot)) => dispatch(&events, Ok(snapshot)).await,
                            Ok(None) => true,
                            Err(e) => dispatch(&events, Err(e)).await,
                        }
                    } else {
                        true
                    }
                }
            };

            if !keep_going {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Refresh scheduler stopped");
        self.session
    }
}

/// Forward a load result. Returns false once the consumer has gone away.
async fn dispatch(events: &mpsc::Sender<RefreshEvent>, result: Result<CacheSnapshot>) -> bool {
    let event = match result {
        Ok(snapshot) => RefreshEvent::Updated(snapshot),
        Err(TrendError::LoadInProgress(key)) => {
            tracing::debug!("Skipping trigger, {} is already loading", key);
            return true;
        }
        Err(e) => {
            tracing::warn!("Refresh failed: {}", e);
            RefreshEvent::Failed(e.to_string())
        }
    };

    events.send(event).await.is_ok()
}
