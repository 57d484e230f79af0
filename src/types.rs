//! Shared types for the Privacy Gradient Engine.
//!
//! These types form the data model used across all modules. The scorer,
//! selector, registry, and orchestrator all depend on them, and the API
//! layer serializes them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Privacy modes
// ---------------------------------------------------------------------------

/// Discrete privacy mode. Variant order is strictness order, so the derived
/// `Ord` gives `Normal < Stealth < MaxGhost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyMode {
    /// Basic unlinkability: single burner, minimal jitter.
    Normal,
    /// Timing unpredictability: several burners, moderate jitter, MEV protection.
    Stealth,
    /// Full camouflage: many burners, heavy jitter and fragmentation.
    MaxGhost,
}

impl PrivacyMode {
    /// All modes in strictness order.
    pub const ALL: &'static [PrivacyMode] = &[
        PrivacyMode::Normal,
        PrivacyMode::Stealth,
        PrivacyMode::MaxGhost,
    ];

    /// Wire name (`normal`, `stealth`, `max_ghost`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyMode::Normal => "normal",
            PrivacyMode::Stealth => "stealth",
            PrivacyMode::MaxGhost => "max_ghost",
        }
    }

    /// Human-readable summary served by the modes endpoint.
    pub fn description(&self) -> &'static str {
        match self {
            PrivacyMode::Normal => "Basic unlinkability - single burner, minimal jitter",
            PrivacyMode::Stealth => "Timing unpredictability - multiple burners, moderate jitter",
            PrivacyMode::MaxGhost => "Full camouflage - many burners, maximum jitter and slicing",
        }
    }
}

impl fmt::Display for PrivacyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a mode name (case-insensitive).
impl FromStr for PrivacyMode {
    type Err = PgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(PrivacyMode::Normal),
            "stealth" => Ok(PrivacyMode::Stealth),
            "max_ghost" => Ok(PrivacyMode::MaxGhost),
            _ => Err(PgeError::UnknownMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Privacy level configuration
// ---------------------------------------------------------------------------

/// Parameter bundle handed to the execution layer for one privacy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyLevelConfig {
    /// Number of burner wallets to spread the trade over (>= 1).
    pub burner_count: u32,
    /// Upper bound of the random delay applied between transactions.
    pub timing_jitter_ms: u64,
    /// Whether the order is split into slices.
    pub order_slicing: bool,
    /// Slice count / fragmentation intensity (1-10).
    pub fragmentation_level: u8,
    /// Route through MEV-protected submission (bundles, private relays).
    pub mev_protection: bool,
    /// Rotate burners every N transactions. Lower is stricter.
    pub rotation_frequency: u32,
}

impl PrivacyLevelConfig {
    /// Check the per-level field ranges.
    pub fn validate(&self) -> Result<(), PgeError> {
        if self.burner_count < 1 {
            return Err(PgeError::InvalidRegistry(
                "burner_count must be at least 1".into(),
            ));
        }
        if !(1..=10).contains(&self.fragmentation_level) {
            return Err(PgeError::InvalidRegistry(format!(
                "fragmentation_level must be between 1 and 10, got {}",
                self.fragmentation_level
            )));
        }
        if self.rotation_frequency < 1 {
            return Err(PgeError::InvalidRegistry(
                "rotation_frequency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for PrivacyLevelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "burners: {} | jitter: {}ms | slicing: {} | fragments: {} | mev: {} | rotate every {}",
            self.burner_count,
            self.timing_jitter_ms,
            self.order_slicing,
            self.fragmentation_level,
            self.mev_protection,
            self.rotation_frequency,
        )
    }
}

// ---------------------------------------------------------------------------
// User preference
// ---------------------------------------------------------------------------

/// Caller's stated privacy preference.
///
/// Serialized as a plain string and parsed through `FromStr`, so an unknown
/// token in a request body surfaces as `InvalidPreference`. JSON `null` is
/// read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "String")]
pub enum UserPreference {
    #[default]
    None,
    Normal,
    Stealth,
    MaxGhost,
}

impl UserPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserPreference::None => "none",
            UserPreference::Normal => "normal",
            UserPreference::Stealth => "stealth",
            UserPreference::MaxGhost => "max_ghost",
        }
    }
}

impl fmt::Display for UserPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserPreference {
    type Err = PgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(UserPreference::None),
            "normal" => Ok(UserPreference::Normal),
            "stealth" => Ok(UserPreference::Stealth),
            "max_ghost" => Ok(UserPreference::MaxGhost),
            _ => Err(PgeError::InvalidPreference(s.to_string())),
        }
    }
}

impl TryFrom<Option<String>> for UserPreference {
    type Error = PgeError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value {
            Some(s) => s.parse(),
            None => Ok(UserPreference::None),
        }
    }
}

impl From<UserPreference> for String {
    fn from(value: UserPreference) -> Self {
        value.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Risk signals
// ---------------------------------------------------------------------------

/// Raw risk inputs for one selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSignals {
    /// Observed sniper pressure on the curve (0.0-1.0).
    pub sniper_activity: f64,
    /// Trade size in SOL.
    pub tx_amount_sol: f64,
    /// Market volatility (0.0-1.0).
    pub volatility: f64,
    /// Hours since the token launched.
    pub hours_since_launch: f64,
    pub user_preference: UserPreference,
    /// Precomputed composite risk. Bypasses factor weighting when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_risk_level: Option<f64>,
}

impl Default for RiskSignals {
    fn default() -> Self {
        Self {
            sniper_activity: 0.0,
            tx_amount_sol: 0.0,
            volatility: 0.0,
            hours_since_launch: 24.0, // past the freshness window: no launch risk
            user_preference: UserPreference::None,
            direct_risk_level: None,
        }
    }
}

impl RiskSignals {
    /// Reject non-finite or out-of-range inputs.
    pub fn validate(&self) -> Result<(), PgeError> {
        check_unit("sniper_activity", self.sniper_activity)?;
        check_non_negative("tx_amount_sol", self.tx_amount_sol)?;
        check_unit("volatility", self.volatility)?;
        check_non_negative("hours_since_launch", self.hours_since_launch)?;
        if let Some(level) = self.direct_risk_level {
            check_unit("direct_risk_level", level)?;
        }
        Ok(())
    }

    /// Builder-style preference setter.
    pub fn with_preference(mut self, preference: UserPreference) -> Self {
        self.user_preference = preference;
        self
    }

    /// Builder-style direct risk override.
    pub fn with_direct_risk(mut self, level: f64) -> Self {
        self.direct_risk_level = Some(level);
        self
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), PgeError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(PgeError::InvalidSignal {
            field,
            reason: format!("must be within [0, 1], got {value}"),
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), PgeError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PgeError::InvalidSignal {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        });
    }
    Ok(())
}

/// Partial signal update: present fields replace the last-known values.
///
/// `direct_risk_level` has three states: absent (`None`), explicitly cleared
/// with JSON `null` (`Some(None)`), or set (`Some(Some(level))`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSignalsPatch {
    pub sniper_activity: Option<f64>,
    pub tx_amount_sol: Option<f64>,
    pub volatility: Option<f64>,
    pub hours_since_launch: Option<f64>,
    pub user_preference: Option<UserPreference>,
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub direct_risk_level: Option<Option<f64>>,
}

impl RiskSignalsPatch {
    /// True when the patch reports a fresh value for any weighted factor.
    pub fn observes_factors(&self) -> bool {
        self.sniper_activity.is_some()
            || self.tx_amount_sol.is_some()
            || self.volatility.is_some()
            || self.hours_since_launch.is_some()
    }

    /// Overlay this patch on `base`.
    ///
    /// A carried-over direct risk level is dropped when the patch reports
    /// fresh factor values without restating it, so new observations are
    /// always scored.
    pub fn apply_to(&self, base: &RiskSignals) -> RiskSignals {
        let direct_risk_level = match self.direct_risk_level {
            Some(level) => level,
            None if self.observes_factors() => None,
            None => base.direct_risk_level,
        };
        RiskSignals {
            sniper_activity: self.sniper_activity.unwrap_or(base.sniper_activity),
            tx_amount_sol: self.tx_amount_sol.unwrap_or(base.tx_amount_sol),
            volatility: self.volatility.unwrap_or(base.volatility),
            hours_since_launch: self.hours_since_launch.unwrap_or(base.hours_since_launch),
            user_preference: self.user_preference.unwrap_or(base.user_preference),
            direct_risk_level,
        }
    }
}

/// Keep an explicit `null` distinct from an absent field.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Which rule determined a decision's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rationale {
    /// Score band alone.
    Threshold,
    /// Preference floor raised the mode above the band.
    UserPreference,
    /// High-risk override raised the mode above band and preference.
    SafetyEscalation,
    /// Fresh computation was less strict; the session kept its mode.
    HeldAntiOscillation,
    /// Session default (construction or reset).
    Default,
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rationale::Threshold => "threshold",
            Rationale::UserPreference => "user-preference override",
            Rationale::SafetyEscalation => "safety-escalation",
            Rationale::HeldAntiOscillation => "held - anti-oscillation",
            Rationale::Default => "default",
        };
        f.write_str(s)
    }
}

/// Output of one selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub mode: PrivacyMode,
    pub config: PrivacyLevelConfig,
    pub risk_score: f64,
    pub rationale: Rationale,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (risk {:.3}, {}) [{}]",
            self.mode, self.risk_score, self.rationale, self.config
        )
    }
}

/// Orchestrator operation that produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Select,
    Adjust,
}

/// A decision as recorded in the session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub decision: Decision,
    pub operation: Operation,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PgeError {
    #[error("Invalid signal ({field}): {reason}")]
    InvalidSignal { field: &'static str, reason: String },

    #[error("Invalid preference: {0:?} (expected none, normal, stealth or max_ghost)")]
    InvalidPreference(String),

    #[error("Unknown privacy mode: {0:?}")]
    UnknownMode(String),

    #[error("Privacy engine has no current configuration")]
    NotConfigured,

    #[error("Invalid privacy level registry: {0}")]
    InvalidRegistry(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
