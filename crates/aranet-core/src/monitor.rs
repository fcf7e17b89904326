//! Live monitoring session.
//!
//! A [`Monitor`] owns everything a session touches: the history store, the
//! reconciler, the current reading and the outputs. It is driven from a
//! single task, either by calling [`Monitor::on_advertisement`] and
//! [`Monitor::tick`] directly or by handing [`Monitor::run`] the
//! advertisement channel.
//!
//! # Example
//!
//! ```ignore
//! use aranet_core::monitor::{Monitor, MonitorConfig};
//! use aranet_core::passive::{AdvertisementListener, ListenerOptions};
//! use aranet_core::LogNotifier;
//! use std::sync::Arc;
//!
//! let (listener, events) = AdvertisementListener::new(ListenerOptions::default());
//! let listen = listener.start(cancel.clone());
//!
//! let config = MonitorConfig::new("AA:BB:CC:DD:EE:FF");
//! let mut monitor = Monitor::new(config, store, renderer, Arc::new(LogNotifier))?;
//! let summary = monitor.run(events, cancel).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use aranet_store::HistoryStore;
use aranet_types::{Field, Reading};

use crate::alerts::{AlertEvaluator, AlertThresholds};
use crate::error::Result;
use crate::notify::Notification;
use crate::passive::Advertisement;
use crate::reconcile::{Decision, GapPolicy, Reconciler, Reconciliation};
use crate::standing::Standings;
use crate::traits::{Notifier, Renderer};
use crate::util::same_device;

/// Settings for one monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Identifier of the device to follow (MAC address, or UUID on macOS).
    pub device: String,
    /// What to do with measurements that follow a missed one.
    pub gap_policy: GapPolicy,
    /// Alert limits.
    pub thresholds: AlertThresholds,
    /// How often the age line is refreshed.
    pub tick: Duration,
}

impl MonitorConfig {
    /// Follow `device` with default settings.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            gap_policy: GapPolicy::default(),
            thresholds: AlertThresholds::default(),
            tick: Duration::from_secs(1),
        }
    }

    /// Set the gap policy.
    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// Set the alert limits.
    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the refresh period of the age line.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(10));
        self
    }
}

/// Where the session is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// Nothing accepted since the session started.
    NoReadingYet,
    /// Following the given reading.
    Tracking(Reading),
}

impl SessionState {
    /// The reading being tracked, if any.
    pub fn current(&self) -> Option<&Reading> {
        match self {
            SessionState::NoReadingYet => None,
            SessionState::Tracking(reading) => Some(reading),
        }
    }
}

/// Everything needed to draw an accepted reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveFrame {
    /// The reading just accepted.
    pub current: Reading,
    /// The reading it replaced within this session.
    pub previous: Option<Reading>,
    /// Standing of `current` against history before it was stored.
    pub standings: Standings,
    /// Age of `current` when it was received, in seconds.
    pub age_secs: u64,
    /// Whether `current` was written to history.
    pub persisted: bool,
}

impl LiveFrame {
    /// Change of `field` since the previous reading, 0 on the first one.
    pub fn change(&self, field: Field) -> f64 {
        let previous = self.previous.as_ref().unwrap_or(&self.current);
        self.current.value(field) - previous.value(field)
    }
}

/// Age of the tracked reading, refreshed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeLine {
    /// Seconds since the reading was measured.
    pub age_secs: u64,
    /// Sampling interval of the device, if known.
    pub interval: Option<u16>,
}

/// Counters for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Advertisements received from any device.
    pub events_seen: u64,
    /// Readings that became the current reading.
    pub accepted: u64,
    /// Readings written to history.
    pub persisted: u64,
    /// Notifications dispatched.
    pub alerts_sent: u64,
}

/// What happened to one advertisement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Sent by a device other than the one being followed.
    OtherDevice,
    /// Carried no measurement.
    NoData,
    /// Carried a measurement that could not be converted.
    Invalid,
    /// Went through the reconciler.
    Reconciled {
        /// What the reconciler did.
        result: Reconciliation,
        /// The notification dispatched for it, if any.
        notification: Option<Notification>,
    },
}

impl Outcome {
    /// Whether the reading became the current reading.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Reconciled { result, .. } if result.is_accepted())
    }
}

/// A live monitoring session for one device.
pub struct Monitor<S, R> {
    config: MonitorConfig,
    store: S,
    renderer: R,
    notifier: Arc<dyn Notifier>,
    reconciler: Reconciler,
    evaluator: AlertEvaluator,
    state: SessionState,
    summary: SessionSummary,
}

impl<S: HistoryStore, R: Renderer> Monitor<S, R> {
    /// Start a session that continues from the latest record in `store`.
    pub fn new(
        config: MonitorConfig,
        store: S,
        renderer: R,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let reconciler = Reconciler::resume(&store, config.gap_policy)?;
        let evaluator = AlertEvaluator::new(config.thresholds);

        Ok(Self {
            config,
            store,
            renderer,
            notifier,
            reconciler,
            evaluator,
            state: SessionState::NoReadingYet,
            summary: SessionSummary::default(),
        })
    }

    /// Session settings.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Where the session is.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Counters so far.
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// The history store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The last accepted reading, which may predate the session.
    pub fn last_known(&self) -> Option<&Reading> {
        self.reconciler.last_known()
    }

    /// Give back the store and renderer.
    pub fn into_parts(self) -> (S, R) {
        (self.store, self.renderer)
    }

    /// Handle one advertisement.
    ///
    /// # Errors
    ///
    /// Only history store failures are returned; everything else about a bad
    /// advertisement is logged and reported through [`Outcome`].
    pub fn on_advertisement(&mut self, advertisement: &Advertisement) -> Result<Outcome> {
        self.summary.events_seen += 1;

        if !same_device(&advertisement.device_id, &self.config.device) {
            trace!("Ignoring advertisement from {}", advertisement.device_id);
            return Ok(Outcome::OtherDevice);
        }

        let candidate = match advertisement.reading() {
            None => {
                trace!("Advertisement without readings; is Smart Home integration enabled?");
                return Ok(Outcome::NoData);
            }
            Some(Err(e)) => {
                debug!("Dropping advertisement: {}", e);
                return Ok(Outcome::Invalid);
            }
            Some(Ok(reading)) => reading,
        };

        let decision = self.reconciler.classify(&candidate);
        if decision == Decision::Duplicate {
            return Ok(Outcome::Reconciled {
                result: Reconciliation::Unchanged,
                notification: None,
            });
        }

        let standings = Standings::compute(&self.store, &candidate)?;
        let result = self
            .reconciler
            .commit(&mut self.store, &candidate, decision)?;
        if !result.is_accepted() {
            return Ok(Outcome::Reconciled {
                result,
                notification: None,
            });
        }

        let previous = self.state.current().copied();
        self.state = SessionState::Tracking(candidate);
        self.summary.accepted += 1;
        if result == Reconciliation::AcceptedAndPersisted {
            self.summary.persisted += 1;
        }

        let age = candidate.age(advertisement.received_at);
        let frame = LiveFrame {
            current: candidate,
            previous,
            standings,
            age_secs: age.as_secs(),
            persisted: result == Reconciliation::AcceptedAndPersisted,
        };
        self.renderer.show_reading(&frame);

        let alerts = self
            .evaluator
            .evaluate(previous.as_ref(), &candidate, &|field| standings.rank(field));
        let notification = if alerts.is_empty() {
            None
        } else {
            let notification = Notification {
                title: alerts.title(),
                body: self.renderer.notification_body(&frame),
                ttl: alerts.ttl(candidate.interval(), age),
            };
            self.dispatch(notification.clone());
            Some(notification)
        };

        Ok(Outcome::Reconciled {
            result,
            notification,
        })
    }

    /// Refresh the age line. Does nothing until a reading is tracked.
    pub fn tick(&mut self, now: OffsetDateTime) -> Option<AgeLine> {
        let reading = self.state.current()?;
        let line = AgeLine {
            age_secs: reading.age_secs(now),
            interval: reading.interval(),
        };
        self.renderer.show_age(&line);
        Some(line)
    }

    /// Process advertisements and refresh the age line until cancelled or
    /// the channel closes.
    ///
    /// # Errors
    ///
    /// Returns the first history store failure; the session cannot continue
    /// without a working store.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<Advertisement>,
        cancel_token: CancellationToken,
    ) -> Result<SessionSummary> {
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        info!("Monitoring {}", self.config.device);

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Monitor cancelled");
                    break;
                }
                event = events.recv() => {
                    let Some(advertisement) = event else {
                        info!("Advertisement stream closed");
                        break;
                    };
                    self.on_advertisement(&advertisement)?;
                }
                _ = ticker.tick() => {
                    self.tick(OffsetDateTime::now_utc());
                }
            }
        }

        Ok(self.summary)
    }

    /// Hand a notification to the notifier without waiting for it.
    fn dispatch(&mut self, notification: Notification) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to send \"{}\" on", notification.title);
            return;
        };

        self.summary.alerts_sent += 1;
        let notifier = Arc::clone(&self.notifier);
        handle.spawn(async move {
            if let Err(e) = notifier.send(&notification).await {
                warn!("Failed to send notification \"{}\": {}", notification.title, e);
            }
        });
    }
}
