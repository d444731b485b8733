//! Alert severity policy.
//!
//! One shared, versioned danger table drives both the pipeline's snapshot
//! classification and any downstream stats consumers. Keeping a single
//! table is what guarantees that two call sites agree on the severity of
//! identical species lists.

use serde::{Deserialize, Serialize};

use crate::report::SnapshotRecord;

/// Severity of a sighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
        }
    }
}

/// Dangerous-species policy table.
///
/// Species names are matched case-insensitively by substring, so
/// "african elephant" matches the "elephant" entry. High-tier species
/// dominate: a frame holding both an elephant and a zebra is `high`.
#[derive(Clone, Debug)]
pub struct DangerPolicy {
    /// Policy revision, logged with each run so stored reports can be
    /// traced back to the table that classified them.
    pub version: &'static str,
    high: &'static [&'static str],
    medium: &'static [&'static str],
}

impl Default for DangerPolicy {
    fn default() -> Self {
        Self {
            version: "danger:v1",
            // High: property damage + human danger.
            high: &["elephant", "lion"],
            // Medium: crop raids and crop damage.
            medium: &["baboon", "warthog"],
        }
    }
}

impl DangerPolicy {
    /// Classify the species present on one snapshot frame.
    ///
    /// Precondition: the set is non-empty. A snapshot candidate always has
    /// at least one surviving detection, so an empty input is a caller bug.
    pub fn classify<'a, I>(&self, species: I) -> AlertLevel
    where
        I: IntoIterator<Item = &'a str>,
    {
        let species: Vec<&str> = species.into_iter().collect();
        debug_assert!(
            !species.is_empty(),
            "classify must not be called for an empty species set"
        );

        if species.iter().any(|name| matches_tier(name, self.high)) {
            AlertLevel::High
        } else if species.iter().any(|name| matches_tier(name, self.medium)) {
            AlertLevel::Medium
        } else {
            AlertLevel::Low
        }
    }

    /// True when the species matches any tier of the table. Used by stat
    /// consumers that only need a binary dangerous/not signal.
    pub fn is_dangerous(&self, species: &str) -> bool {
        matches_tier(species, self.high) || matches_tier(species, self.medium)
    }
}

fn matches_tier(species: &str, tier: &[&str]) -> bool {
    let species = species.to_lowercase();
    tier.iter().any(|entry| species.contains(entry))
}

/// Alert record derived 1:1 from a snapshot.
///
/// The pipeline itself does not emit alerts; this helper exists so that
/// in-process callers construct them from the report without re-deriving
/// any detection logic.
#[derive(Clone, Debug, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub priority: AlertLevel,
    /// Comma-joined species detected in the snapshot.
    pub species: String,
    pub timestamp: f64,
    pub frame: u64,
    pub image: String,
}

impl Alert {
    pub fn from_snapshot(snapshot: &SnapshotRecord) -> Self {
        let species: Vec<&str> = snapshot
            .detections
            .iter()
            .map(|det| det.species.as_str())
            .collect();
        Self {
            kind: "wildlife_detected",
            priority: snapshot.alert_level,
            species: species.join(", "),
            timestamp: snapshot.timestamp,
            frame: snapshot.frame,
            image: snapshot.path.clone(),
        }
    }
}
