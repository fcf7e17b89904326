//! Reconciling live readings against stored history.
//!
//! A sensor repeats the same measurement in every advertisement until its
//! next sampling tick, and the computed measurement time drifts by a second
//! or so between repeats. The [`Reconciler`] decides whether an incoming
//! reading is one of those repeats, the next measurement, or a measurement
//! that arrived after one or more were missed.
//!
//! The decision is split in two so ranks can be computed against history
//! before the candidate is added to it:
//!
//! ```
//! use aranet_core::reconcile::{Decision, GapPolicy, Reconciler, Reconciliation};
//! use aranet_store::MemoryStore;
//! use aranet_types::Reading;
//! use time::macros::datetime;
//!
//! let mut store = MemoryStore::new();
//! let mut reconciler = Reconciler::new(GapPolicy::default());
//!
//! let reading = Reading::builder(datetime!(2024-05-01 08:00:00 UTC)).co2(640).build();
//! let decision = reconciler.classify(&reading);
//! assert_eq!(decision, Decision::New);
//!
//! // ... rank queries against `store` go here ...
//!
//! let result = reconciler.commit(&mut store, &reading, decision)?;
//! assert_eq!(result, Reconciliation::AcceptedAndPersisted);
//! # Ok::<(), aranet_core::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use aranet_store::{HistoryStore, SAME_MEASUREMENT_SECS};
use aranet_types::Reading;

use crate::error::Result;

/// What to do with a new measurement that follows a missed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapPolicy {
    /// Track the reading in memory but leave it out of history, so history
    /// never holds a record with an unobserved hole right before it.
    #[default]
    SkipPersist,
    /// Append the reading anyway and accept the hole in history.
    PersistThroughGap,
}

impl GapPolicy {
    /// Configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            GapPolicy::SkipPersist => "skip-persist",
            GapPolicy::PersistThroughGap => "persist-through-gap",
        }
    }
}

impl fmt::Display for GapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GapPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip-persist" | "skip" => Ok(GapPolicy::SkipPersist),
            "persist-through-gap" | "persist" => Ok(GapPolicy::PersistThroughGap),
            other => Err(format!(
                "unknown gap policy '{}' (expected skip-persist or persist-through-gap)",
                other
            )),
        }
    }
}

/// How a candidate relates to the last known reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Within a minute of the last known reading: the same measurement.
    Duplicate,
    /// A new measurement directly following the last known one.
    New,
    /// A new measurement, but at least one sample in between was missed.
    Gap,
}

/// Outcome of reconciling one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing changed.
    Unchanged,
    /// The candidate is the new last known reading but was not stored.
    AcceptedInMemoryOnly,
    /// The candidate is the new last known reading and is in history.
    AcceptedAndPersisted,
}

impl Reconciliation {
    /// Whether the candidate became the new last known reading.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Reconciliation::Unchanged)
    }
}

/// Decides, reading by reading, what enters history.
#[derive(Debug, Clone)]
pub struct Reconciler {
    last_known: Option<Reading>,
    policy: GapPolicy,
}

impl Reconciler {
    /// Create a reconciler that has seen nothing yet.
    pub fn new(policy: GapPolicy) -> Self {
        Self {
            last_known: None,
            policy,
        }
    }

    /// Create a reconciler that continues from the latest stored record.
    pub fn resume<S: HistoryStore + ?Sized>(store: &S, policy: GapPolicy) -> Result<Self> {
        let last_known = store.latest()?;
        if let Some(last) = &last_known {
            debug!("Resuming after record at {}", last.timestamp());
        }
        Ok(Self { last_known, policy })
    }

    /// The last accepted reading. May be newer than anything stored.
    pub fn last_known(&self) -> Option<&Reading> {
        self.last_known.as_ref()
    }

    /// The configured gap policy.
    pub fn policy(&self) -> GapPolicy {
        self.policy
    }

    /// Classify a candidate without touching any state.
    pub fn classify(&self, candidate: &Reading) -> Decision {
        let Some(last) = &self.last_known else {
            // Nothing seen yet: always a new measurement
            return Decision::New;
        };

        let delta = (candidate.timestamp() - last.timestamp()).whole_seconds();
        if delta <= SAME_MEASUREMENT_SECS {
            return Decision::Duplicate;
        }

        match candidate.interval() {
            Some(interval) if delta >= i64::from(interval) + SAME_MEASUREMENT_SECS => Decision::Gap,
            _ => Decision::New,
        }
    }

    /// Apply a decision made by [`classify`](Self::classify).
    ///
    /// A duplicate timestamp rejected by the store is absorbed and reported
    /// as [`Reconciliation::Unchanged`]. Any other store error is returned.
    pub fn commit<S: HistoryStore + ?Sized>(
        &mut self,
        store: &mut S,
        candidate: &Reading,
        decision: Decision,
    ) -> Result<Reconciliation> {
        match decision {
            Decision::Duplicate => Ok(Reconciliation::Unchanged),
            Decision::Gap if self.policy == GapPolicy::SkipPersist => {
                info!(
                    "Missed a measurement before {}; not recording this one",
                    candidate.timestamp()
                );
                self.last_known = Some(*candidate);
                Ok(Reconciliation::AcceptedInMemoryOnly)
            }
            Decision::Gap | Decision::New => match store.append(candidate) {
                Ok(()) => {
                    self.last_known = Some(*candidate);
                    Ok(Reconciliation::AcceptedAndPersisted)
                }
                Err(e) if e.is_duplicate() => {
                    debug!("Record at {} already stored", candidate.timestamp());
                    Ok(Reconciliation::Unchanged)
                }
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Classify and commit in one step.
    pub fn reconcile<S: HistoryStore + ?Sized>(
        &mut self,
        store: &mut S,
        candidate: &Reading,
    ) -> Result<Reconciliation> {
        let decision = self.classify(candidate);
        self.commit(store, candidate, decision)
    }
}
