//! Risk scoring.
//!
//! Turns raw `RiskSignals` into a single risk score in [0, 1]. The default
//! model is a fixed-weight linear blend of normalised sub-factors; callers
//! that already hold a composite score can bypass it with
//! `direct_risk_level`.

use tracing::debug;

use crate::types::{PgeError, RiskSignals, UserPreference};

// ---------------------------------------------------------------------------
// Model trait
// ---------------------------------------------------------------------------

/// A risk model maps signals to a score in [0, 1].
///
/// Implementations must be deterministic: identical signals yield an
/// identical score.
#[cfg_attr(test, mockall::automock)]
pub trait RiskModel: Send + Sync {
    /// Score a signal record. Fails with `InvalidSignal` on malformed input.
    fn score(&self, signals: &RiskSignals) -> Result<f64, PgeError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Weights and normalisers for the weighted scorer.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub sniper_weight: f64,
    pub amount_weight: f64,
    pub volatility_weight: f64,
    pub freshness_weight: f64,
    /// Applied to the preference boost. The four factor weights sum to 0.95;
    /// with this one the budget is 1.0.
    pub preference_weight: f64,
    /// Trade size (SOL) at which the amount factor saturates.
    pub amount_saturation_sol: f64,
    /// Launch age (hours) after which freshness contributes nothing.
    pub freshness_window_hours: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            sniper_weight: 0.35,
            amount_weight: 0.25,
            volatility_weight: 0.20,
            freshness_weight: 0.15,
            preference_weight: 0.05,
            amount_saturation_sol: 100.0,
            freshness_window_hours: 24.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Weighted scorer
// ---------------------------------------------------------------------------

/// Per-factor contributions (already weighted) for one scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub sniper: f64,
    pub amount: f64,
    pub volatility: f64,
    pub freshness: f64,
    pub preference: f64,
}

impl ScoreBreakdown {
    /// Sum of contributions, clamped to [0, 1].
    pub fn total(&self) -> f64 {
        (self.sniper + self.amount + self.volatility + self.freshness + self.preference)
            .clamp(0.0, 1.0)
    }
}

/// Default linear risk model.
pub struct WeightedRiskScorer {
    config: ScorerConfig,
}

impl WeightedRiskScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Access the scorer configuration.
    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Weighted contribution of each factor. Ignores `direct_risk_level`.
    pub fn breakdown(&self, signals: &RiskSignals) -> ScoreBreakdown {
        let c = &self.config;

        let sniper = unit(signals.sniper_activity);
        let amount = unit(signals.tx_amount_sol / c.amount_saturation_sol);
        let volatility = unit(signals.volatility);
        let freshness = unit(1.0 - signals.hours_since_launch / c.freshness_window_hours);

        ScoreBreakdown {
            sniper: c.sniper_weight * sniper,
            amount: c.amount_weight * amount,
            volatility: c.volatility_weight * volatility,
            freshness: c.freshness_weight * freshness,
            preference: c.preference_weight * preference_boost(signals.user_preference),
        }
    }
}

impl Default for WeightedRiskScorer {
    fn default() -> Self {
        Self::new(ScorerConfig::default())
    }
}

impl RiskModel for WeightedRiskScorer {
    fn score(&self, signals: &RiskSignals) -> Result<f64, PgeError> {
        signals.validate()?;

        if let Some(direct) = signals.direct_risk_level {
            let score = unit(direct);
            debug!(score, "Direct risk level supplied, skipping factor weighting");
            return Ok(score);
        }

        let parts = self.breakdown(signals);
        let score = parts.total();
        debug!(
            sniper = format!("{:.4}", parts.sniper),
            amount = format!("{:.4}", parts.amount),
            volatility = format!("{:.4}", parts.volatility),
            freshness = format!("{:.4}", parts.freshness),
            preference = format!("{:.4}", parts.preference),
            score = format!("{:.4}", score),
            "Risk scored"
        );
        Ok(score)
    }
}

/// Extra risk implied by the caller asking for more privacy.
fn preference_boost(preference: UserPreference) -> f64 {
    match preference {
        UserPreference::MaxGhost => 0.2,
        UserPreference::Stealth => 0.1,
        UserPreference::Normal | UserPreference::None => 0.0,
    }
}

fn unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
