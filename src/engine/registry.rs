//! Privacy level registry.
//!
//! Static table mapping each `PrivacyMode` to its parameter bundle. Built
//! once at startup (optionally with overrides from `config.toml`) and
//! read-only afterwards. Construction rejects tables that are not
//! monotonically more protective as strictness increases.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{PgeError, PrivacyLevelConfig, PrivacyMode};

// ---------------------------------------------------------------------------
// Reference levels
// ---------------------------------------------------------------------------

pub const NORMAL_PRIVACY: PrivacyLevelConfig = PrivacyLevelConfig {
    burner_count: 1,
    timing_jitter_ms: 100,
    order_slicing: false,
    fragmentation_level: 1,
    mev_protection: false,
    rotation_frequency: 5,
};

pub const STEALTH_PRIVACY: PrivacyLevelConfig = PrivacyLevelConfig {
    burner_count: 3,
    timing_jitter_ms: 500,
    order_slicing: true,
    fragmentation_level: 3,
    mev_protection: true,
    rotation_frequency: 2,
};

pub const MAX_GHOST_PRIVACY: PrivacyLevelConfig = PrivacyLevelConfig {
    burner_count: 5,
    timing_jitter_ms: 2000,
    order_slicing: true,
    fragmentation_level: 8,
    mev_protection: true,
    rotation_frequency: 1,
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Validated mode → configuration table.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyRegistry {
    levels: BTreeMap<PrivacyMode, PrivacyLevelConfig>,
}

impl PrivacyRegistry {
    /// Build a registry from an explicit table.
    ///
    /// Every mode must be present, each level must pass its own range checks,
    /// and each level must be at least as protective as the one below it.
    pub fn new(levels: BTreeMap<PrivacyMode, PrivacyLevelConfig>) -> Result<Self, PgeError> {
        for mode in PrivacyMode::ALL {
            let level = levels.get(mode).ok_or_else(|| {
                PgeError::InvalidRegistry(format!("missing configuration for mode {mode}"))
            })?;
            level.validate().map_err(|e| match e {
                PgeError::InvalidRegistry(msg) => PgeError::InvalidRegistry(format!("{mode}: {msg}")),
                other => other,
            })?;
        }

        for pair in PrivacyMode::ALL.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            check_monotonic(lower, &levels[&lower], upper, &levels[&upper])?;
        }

        if !levels[&PrivacyMode::Stealth].mev_protection {
            return Err(PgeError::InvalidRegistry(
                "mev_protection must be enabled at stealth".into(),
            ));
        }

        debug!(modes = levels.len(), "Privacy registry validated");
        Ok(Self { levels })
    }

    /// The reference table.
    pub fn standard() -> Self {
        Self {
            levels: BTreeMap::from([
                (PrivacyMode::Normal, NORMAL_PRIVACY),
                (PrivacyMode::Stealth, STEALTH_PRIVACY),
                (PrivacyMode::MaxGhost, MAX_GHOST_PRIVACY),
            ]),
        }
    }

    /// Reference table with selected modes replaced, then validated.
    pub fn with_overrides(
        overrides: &BTreeMap<PrivacyMode, PrivacyLevelConfig>,
    ) -> Result<Self, PgeError> {
        let mut levels = Self::standard().levels;
        for (mode, level) in overrides {
            levels.insert(*mode, *level);
        }
        Self::new(levels)
    }

    /// Configuration for `mode`.
    pub fn get(&self, mode: PrivacyMode) -> Result<&PrivacyLevelConfig, PgeError> {
        self.levels
            .get(&mode)
            .ok_or_else(|| PgeError::UnknownMode(mode.to_string()))
    }

    /// Configuration for `mode`. Every mode is present after construction.
    pub fn level(&self, mode: PrivacyMode) -> PrivacyLevelConfig {
        self.levels[&mode]
    }

    /// Configuration for a mode given by name.
    pub fn get_by_name(&self, name: &str) -> Result<&PrivacyLevelConfig, PgeError> {
        self.get(name.parse()?)
    }

    /// Full table, ordered by strictness.
    pub fn all(&self) -> &BTreeMap<PrivacyMode, PrivacyLevelConfig> {
        &self.levels
    }
}

impl Default for PrivacyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_monotonic(
    lower_mode: PrivacyMode,
    lower: &PrivacyLevelConfig,
    upper_mode: PrivacyMode,
    upper: &PrivacyLevelConfig,
) -> Result<(), PgeError> {
    let violation = |field: &str| {
        Err(PgeError::InvalidRegistry(format!(
            "{upper_mode} is less protective than {lower_mode} on {field}"
        )))
    };

    if upper.burner_count < lower.burner_count {
        return violation("burner_count");
    }
    if upper.timing_jitter_ms < lower.timing_jitter_ms {
        return violation("timing_jitter_ms");
    }
    if upper.fragmentation_level < lower.fragmentation_level {
        return violation("fragmentation_level");
    }
    if lower.order_slicing && !upper.order_slicing {
        return violation("order_slicing");
    }
    if lower.mev_protection && !upper.mev_protection {
        return violation("mev_protection");
    }
    if upper.rotation_frequency > lower.rotation_frequency {
        return violation("rotation_frequency");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
