//! Privacy engine: registry, risk scoring, mode selection, and the
//! stateful orchestrator that ties them together.

pub mod registry;
pub mod scorer;
pub mod selector;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{
    Decision, HistoryEntry, Operation, PgeError, PrivacyLevelConfig, PrivacyMode, Rationale,
    RiskSignals, RiskSignalsPatch,
};
use registry::PrivacyRegistry;
use scorer::{RiskModel, WeightedRiskScorer};
use selector::ModeSelector;

/// Maximum number of decisions retained per session.
pub const HISTORY_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Per-caller mutable state. One engine owns one session; independent
/// callers get independent engines.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub default_mode: PrivacyMode,
    current: Option<Decision>,
    last_signals: Option<RiskSignals>,
    history: VecDeque<HistoryEntry>,
}

impl Session {
    /// An unconfigured session with the given default mode.
    pub fn new(default_mode: PrivacyMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            default_mode,
            current: None,
            last_signals: None,
            history: VecDeque::new(),
        }
    }

    /// True once a decision has been stored.
    pub fn is_configured(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Decision> {
        self.current.as_ref()
    }

    pub fn last_signals(&self) -> Option<&RiskSignals> {
        self.last_signals.as_ref()
    }

    /// Recorded decisions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn record(&mut self, decision: &Decision, operation: Operation) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            decision: decision.clone(),
            operation,
            recorded_at: Utc::now(),
        });
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PrivacyMode::Normal)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Scores signals, selects a mode, and keeps the session's current
/// configuration.
///
/// `adjust_privacy_level` never moves the session to a less strict mode;
/// only `reset` can lower it.
pub struct PrivacyEngine {
    registry: Arc<PrivacyRegistry>,
    model: Box<dyn RiskModel>,
    selector: ModeSelector,
    session: Session,
}

impl PrivacyEngine {
    /// Build an engine with a fresh session configured at `default_mode`.
    pub fn new(
        registry: Arc<PrivacyRegistry>,
        model: Box<dyn RiskModel>,
        selector: ModeSelector,
        default_mode: PrivacyMode,
    ) -> Self {
        let mut engine = Self::with_session(registry, model, selector, Session::new(default_mode));
        engine.session.current = Some(engine.default_decision());
        info!(
            session = %engine.session.id,
            default_mode = %default_mode,
            "Privacy engine initialised"
        );
        engine
    }

    /// Standard registry, weighted scorer, default selector.
    pub fn standard(default_mode: PrivacyMode) -> Self {
        Self::new(
            Arc::new(PrivacyRegistry::standard()),
            Box::new(WeightedRiskScorer::default()),
            ModeSelector::default(),
            default_mode,
        )
    }

    /// Adopt an existing session as-is (it may be unconfigured).
    pub fn with_session(
        registry: Arc<PrivacyRegistry>,
        model: Box<dyn RiskModel>,
        selector: ModeSelector,
        session: Session,
    ) -> Self {
        Self {
            registry,
            model,
            selector,
            session,
        }
    }

    // -- Operations ----------------------------------------------------------

    /// Score `signals`, select a mode, and make it the current configuration.
    pub fn select_mode(&mut self, signals: RiskSignals) -> Result<Decision, PgeError> {
        let decision = self.evaluate(&signals)?;

        let previous = self.current_mode();
        self.commit(decision.clone(), signals, Operation::Select);

        if previous != Some(decision.mode) {
            info!(
                session = %self.session.id,
                from = ?previous,
                to = %decision.mode,
                risk = format!("{:.3}", decision.risk_score),
                rationale = %decision.rationale,
                "Privacy mode selected"
            );
        } else {
            debug!(mode = %decision.mode, risk = decision.risk_score, "Privacy mode unchanged");
        }
        Ok(decision)
    }

    /// Re-evaluate with updated context. Holds the current mode when the
    /// fresh result would be less strict.
    pub fn adjust_privacy_level(&mut self, signals: RiskSignals) -> Result<Decision, PgeError> {
        let fresh = self.evaluate(&signals)?;

        let decision = match self.session.current.as_ref() {
            Some(current) if fresh.mode < current.mode => {
                warn!(
                    session = %self.session.id,
                    current = %current.mode,
                    computed = %fresh.mode,
                    risk = format!("{:.3}", fresh.risk_score),
                    "Downgrade suppressed, holding current mode"
                );
                Decision {
                    mode: current.mode,
                    config: current.config,
                    risk_score: fresh.risk_score,
                    rationale: Rationale::HeldAntiOscillation,
                }
            }
            Some(current) => {
                if fresh.mode > current.mode {
                    info!(
                        session = %self.session.id,
                        from = %current.mode,
                        to = %fresh.mode,
                        risk = format!("{:.3}", fresh.risk_score),
                        rationale = %fresh.rationale,
                        "Privacy mode escalated"
                    );
                }
                fresh
            }
            None => fresh,
        };

        self.commit(decision.clone(), signals, Operation::Adjust);
        Ok(decision)
    }

    /// Apply a partial update on top of the last signals, then adjust.
    pub fn adjust_with_patch(&mut self, patch: &RiskSignalsPatch) -> Result<Decision, PgeError> {
        let base = self.session.last_signals.clone().unwrap_or_default();
        self.adjust_privacy_level(patch.apply_to(&base))
    }

    /// Configuration of the current decision.
    pub fn get_privacy_config(&self) -> Result<&PrivacyLevelConfig, PgeError> {
        self.session
            .current
            .as_ref()
            .map(|d| &d.config)
            .ok_or(PgeError::NotConfigured)
    }

    /// Drop history and signals and return to the default mode. The reset
    /// itself is not recorded; the session history is empty afterwards.
    pub fn reset(&mut self) -> Decision {
        let decision = self.default_decision();

        self.session.history.clear();
        self.session.last_signals = None;
        self.session.current = Some(decision.clone());

        info!(
            session = %self.session.id,
            mode = %decision.mode,
            "Privacy engine reset to default"
        );
        decision
    }

    // -- Accessors -----------------------------------------------------------

    pub fn current_decision(&self) -> Option<&Decision> {
        self.session.current.as_ref()
    }

    pub fn current_mode(&self) -> Option<PrivacyMode> {
        self.session.current.as_ref().map(|d| d.mode)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &PrivacyRegistry {
        &self.registry
    }

    /// Recorded decisions, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.session.history().cloned().collect()
    }

    // -- Internals -----------------------------------------------------------

    fn evaluate(&self, signals: &RiskSignals) -> Result<Decision, PgeError> {
        let risk_score = self.model.score(signals)?;
        let (mode, rationale) = self.selector.select(risk_score, signals.user_preference)?;
        let config = *self.registry.get(mode)?;
        Ok(Decision {
            mode,
            config,
            risk_score,
            rationale,
        })
    }

    fn default_decision(&self) -> Decision {
        let mode = self.session.default_mode;
        Decision {
            mode,
            config: self.registry.level(mode),
            risk_score: 0.0,
            rationale: Rationale::Default,
        }
    }

    fn commit(&mut self, decision: Decision, signals: RiskSignals, operation: Operation) {
        self.session.record(&decision, operation);
        self.session.last_signals = Some(signals);
        self.session.current = Some(decision);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
