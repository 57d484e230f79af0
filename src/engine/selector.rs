//! Mode selection.
//!
//! Maps a risk score and the caller's preference to a privacy mode using
//! threshold bands, preference floors, and a high-risk safety override.
//! Precedence when attributing the outcome: safety escalation, then user
//! preference, then the threshold band. Preference can only raise the mode.

use tracing::debug;

use crate::types::{PgeError, PrivacyMode, Rationale, UserPreference};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Cut points for the selector. Bands are half-open: a score must be
/// strictly above a cut point to enter the band.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub max_ghost_above: f64,
    pub stealth_above: f64,
    /// Lower edge of the explicit Normal band. Scores at or below it are
    /// also Normal; kept so the band table is complete in logs.
    pub normal_above: f64,
    /// Above this score privacy is never left below Stealth.
    pub safety_override_above: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_ghost_above: 0.8,
            stealth_above: 0.5,
            normal_above: 0.3,
            safety_override_above: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct ModeSelector {
    config: SelectorConfig,
}

impl ModeSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Access the selector configuration.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Mode implied by the score alone.
    pub fn threshold_mode(&self, score: f64) -> PrivacyMode {
        let c = &self.config;
        if score > c.max_ghost_above {
            PrivacyMode::MaxGhost
        } else if score > c.stealth_above {
            PrivacyMode::Stealth
        } else {
            // (normal_above, stealth_above] and [0, normal_above] are both Normal
            PrivacyMode::Normal
        }
    }

    /// Choose a mode for `score` under `preference`.
    ///
    /// The rationale names the rule that raised the mode above the score
    /// band, checked in precedence order (safety escalation, then user
    /// preference). When the band alone already reaches the final mode the
    /// rationale is `Threshold`, even if a floor was active: a normal
    /// preference at 0.85 is `Threshold` because the band is MaxGhost.
    pub fn select(
        &self,
        score: f64,
        preference: UserPreference,
    ) -> Result<(PrivacyMode, Rationale), PgeError> {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(PgeError::InvalidSignal {
                field: "risk_score",
                reason: format!("must be within [0, 1], got {score}"),
            });
        }

        let high_risk = score > self.config.safety_override_above;
        let threshold = self.threshold_mode(score);

        let preference_floor = match preference {
            UserPreference::MaxGhost if high_risk => Some(PrivacyMode::MaxGhost),
            UserPreference::MaxGhost | UserPreference::Stealth => Some(PrivacyMode::Stealth),
            UserPreference::Normal | UserPreference::None => None,
        };

        let safety_floor = match (high_risk, preference) {
            (false, _) => None,
            // a stealth request under high risk is pushed one step further
            (true, UserPreference::Stealth) => Some(PrivacyMode::MaxGhost),
            (true, _) => Some(PrivacyMode::Stealth),
        };

        let mode = [Some(threshold), preference_floor, safety_floor]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(threshold);

        let rationale = if mode > threshold && safety_floor == Some(mode) {
            Rationale::SafetyEscalation
        } else if mode > threshold && preference_floor == Some(mode) {
            Rationale::UserPreference
        } else {
            Rationale::Threshold
        };

        debug!(
            score = format!("{:.4}", score),
            preference = %preference,
            threshold = %threshold,
            mode = %mode,
            rationale = %rationale,
            "Mode selected"
        );

        Ok((mode, rationale))
    }
}

impl Default for ModeSelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
