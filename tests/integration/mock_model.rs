//! Scripted risk model for integration testing.
//!
//! Provides a deterministic `RiskModel` that returns queued scores, records
//! every signal set it was asked to score, and can be forced to fail. All
//! state is shared behind `Arc<Mutex<_>>` so a test keeps a handle after
//! the model has been boxed into an engine.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pge::engine::scorer::RiskModel;
use pge::types::{PgeError, RiskSignals};

#[derive(Clone)]
pub struct ScriptedModel {
    scores: Arc<Mutex<VecDeque<f64>>>,
    /// Returned once the queue is empty.
    fallback: f64,
    calls: Arc<Mutex<Vec<RiskSignals>>>,
    /// If set, every call fails with this reason.
    force_error: Arc<Mutex<Option<String>>>,
}

impl ScriptedModel {
    pub fn new(scores: Vec<f64>, fallback: f64) -> Self {
        Self {
            scores: Arc::new(Mutex::new(scores.into())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Always return `score`.
    pub fn constant(score: f64) -> Self {
        Self::new(Vec::new(), score)
    }

    pub fn push_score(&self, score: f64) {
        self.scores.lock().unwrap().push_back(score);
    }

    pub fn set_error(&self, reason: &str) {
        *self.force_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Signals seen so far, in call order.
    pub fn calls(&self) -> Vec<RiskSignals> {
        self.calls.lock().unwrap().clone()
    }
}

impl RiskModel for ScriptedModel {
    fn score(&self, signals: &RiskSignals) -> Result<f64, PgeError> {
        if let Some(reason) = self.force_error.lock().unwrap().clone() {
            return Err(PgeError::InvalidSignal {
                field: "direct_risk_level",
                reason,
            });
        }
        self.calls.lock().unwrap().push(signals.clone());
        Ok(self
            .scores
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pge::engine::registry::PrivacyRegistry;
    use pge::engine::selector::ModeSelector;
    use pge::engine::PrivacyEngine;
    use pge::types::{PrivacyMode, Rationale, UserPreference};

    fn engine_with(model: &ScriptedModel) -> PrivacyEngine {
        PrivacyEngine::new(
            Arc::new(PrivacyRegistry::standard()),
            Box::new(model.clone()),
            ModeSelector::default(),
            PrivacyMode::Normal,
        )
    }

    #[test]
    fn test_scripted_scores_drive_modes() {
        let model = ScriptedModel::new(vec![0.2, 0.55, 0.95], 0.0);
        let mut engine = engine_with(&model);

        let modes: Vec<_> = (0..3)
            .map(|_| engine.select_mode(RiskSignals::default()).unwrap().mode)
            .collect();
        assert_eq!(
            modes,
            vec![PrivacyMode::Normal, PrivacyMode::Stealth, PrivacyMode::MaxGhost]
        );
        assert_eq!(model.calls().len(), 3);
    }

    #[test]
    fn test_model_sees_merged_patch() {
        let model = ScriptedModel::constant(0.1);
        let mut engine = engine_with(&model);

        engine
            .select_mode(RiskSignals {
                volatility: 0.4,
                hours_since_launch: 3.0,
                ..Default::default()
            })
            .unwrap();
        engine
            .adjust_with_patch(&pge::types::RiskSignalsPatch {
                user_preference: Some(UserPreference::Stealth),
                ..Default::default()
            })
            .unwrap();

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].volatility, 0.4);
        assert_eq!(calls[1].hours_since_launch, 3.0);
        assert_eq!(calls[1].user_preference, UserPreference::Stealth);
    }

    #[test]
    fn test_forced_error_leaves_engine_untouched() {
        let model = ScriptedModel::constant(0.6);
        let mut engine = engine_with(&model);
        engine.select_mode(RiskSignals::default()).unwrap();

        model.set_error("price feed offline");
        let err = engine.adjust_privacy_level(RiskSignals::default()).unwrap_err();
        assert!(err.to_string().contains("price feed offline"));
        assert_eq!(engine.current_mode(), Some(PrivacyMode::Stealth));
        assert_eq!(engine.history().len(), 1);

        model.clear_error();
        model.push_score(0.85);
        let d = engine.adjust_privacy_level(RiskSignals::default()).unwrap();
        assert_eq!(d.mode, PrivacyMode::MaxGhost);
        assert_eq!(d.rationale, Rationale::Threshold);
    }

    #[test]
    fn test_out_of_range_model_score_rejected() {
        let model = ScriptedModel::constant(1.4);
        let mut engine = engine_with(&model);
        let err = engine.select_mode(RiskSignals::default()).unwrap_err();
        assert!(matches!(err, PgeError::InvalidSignal { field: "risk_score", .. }));
        assert_eq!(engine.current_mode(), Some(PrivacyMode::Normal));
    }
}
