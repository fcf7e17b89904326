//! Alert evaluation.
//!
//! Turns a newly accepted reading into the list of conditions worth a push
//! notification. Evaluation is pure; dispatching is the notifier's job.
//!
//! # Example
//!
//! ```
//! use aranet_core::alerts::{AlertEvaluator, AlertThresholds};
//! use aranet_types::{Field, Reading};
//! use time::macros::datetime;
//!
//! let ts = datetime!(2024-05-01 08:00:00 UTC);
//! let previous = Reading::builder(ts).co2(1200).fahrenheit(70.0).build();
//! let current = Reading::builder(ts).co2(1450).fahrenheit(70.0).build();
//!
//! let evaluator = AlertEvaluator::new(AlertThresholds::default());
//! let batch = evaluator.evaluate(Some(&previous), &current, &|field| {
//!     (field == Field::Co2).then_some(1)
//! });
//!
//! assert_eq!(batch.title(), "rising co2; new co2 high score");
//! assert!(batch.suppress_expiry());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use aranet_types::{Field, Reading};

/// Shortest expiry given to a notification.
pub const MIN_TTL: Duration = Duration::from_secs(60);

/// Limits that trigger alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Alert on rising CO2 above this level (ppm).
    pub co2_rising_above: u16,
    /// Alert below this temperature (°F).
    pub low_temperature: f32,
    /// Alert above this temperature (°F).
    pub high_temperature: f32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            co2_rising_above: 1400,
            low_temperature: 50.0,
            high_temperature: 90.0,
        }
    }
}

impl AlertThresholds {
    /// Check that the limits make sense together.
    pub fn validate(&self) -> Result<(), String> {
        if !self.low_temperature.is_finite() || !self.high_temperature.is_finite() {
            return Err("temperature thresholds must be finite".to_string());
        }
        if self.low_temperature >= self.high_temperature {
            return Err(format!(
                "low temperature ({}) must be below high temperature ({})",
                self.low_temperature, self.high_temperature
            ));
        }
        Ok(())
    }
}

/// The alerts raised by one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertBatch {
    alerts: Vec<String>,
    suppress_expiry: bool,
}

impl AlertBatch {
    /// Alert messages in evaluation order.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Whether nothing was raised.
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Whether the notification should stay until dismissed.
    pub fn suppress_expiry(&self) -> bool {
        self.suppress_expiry
    }

    /// Notification title.
    pub fn title(&self) -> String {
        self.alerts.join("; ")
    }

    /// How long the notification should live.
    ///
    /// Until the next measurement is due, but at least [`MIN_TTL`].
    /// `None` means no expiry.
    pub fn ttl(&self, interval: Option<u16>, age: Duration) -> Option<Duration> {
        if self.suppress_expiry {
            return None;
        }

        let remaining = interval
            .map(|i| Duration::from_secs(u64::from(i)).saturating_sub(age))
            .unwrap_or(MIN_TTL);
        Some(remaining.max(MIN_TTL))
    }

    fn push(&mut self, alert: impl Into<String>) {
        self.alerts.push(alert.into());
    }
}

/// Evaluates alert rules against accepted readings.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    /// Create an evaluator with the given limits.
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// The configured limits.
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate `current` against the previously accepted reading.
    ///
    /// `ranks` gives the rank of each field of `current` against history
    /// as it stood before `current` was stored, or `None` when unknown.
    /// Rules are checked in order and every match is kept.
    pub fn evaluate(
        &self,
        previous: Option<&Reading>,
        current: &Reading,
        ranks: &dyn Fn(Field) -> Option<u64>,
    ) -> AlertBatch {
        let mut batch = AlertBatch::default();
        let limits = &self.thresholds;

        let co2_delta = i32::from(current.co2()) - i32::from(previous.unwrap_or(current).co2());
        if co2_delta > 0 && current.co2() > limits.co2_rising_above {
            batch.push("rising co2");
        }
        if current.temperature() < limits.low_temperature {
            batch.push("low temperature");
        }
        if current.temperature() > limits.high_temperature {
            batch.push("high temperature");
        }

        for field in Field::ALL {
            if ranks(field) == Some(1) {
                batch.push(format!("new {} high score", field.name()));
                batch.suppress_expiry = true;
            }
        }

        batch
    }
}
