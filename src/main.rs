//! PGE: Privacy Gradient Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! validates the privacy registry, and serves the HTTP API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use pge::api;
use pge::api::routes::ApiState;
use pge::config;
use pge::engine::scorer::WeightedRiskScorer;
use pge::engine::selector::ModeSelector;
use pge::engine::PrivacyEngine;

const BANNER: &str = r#"
 ____   ____ _____
|  _ \ / ___| ____|
| |_) | |  _|  _|
|  __/| |_| | |___
|_|    \____|_____|

  Privacy Gradient Engine
  Risk-driven privacy mode orchestration
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML, then environment overrides
    let mut cfg = config::AppConfig::load_or_default("config.toml")?;
    cfg.apply_env_overrides()?;

    // Initialise structured logging
    init_logging(&cfg);

    // Print startup banner
    println!("{BANNER}");
    info!(
        version = env!("CARGO_PKG_VERSION"),
        default_mode = %cfg.engine.default_mode,
        bind = %cfg.bind_addr(),
        "PGE starting up"
    );

    // -- Initialise components -------------------------------------------

    // A registry that fails validation is fatal
    let registry = Arc::new(cfg.build_registry()?);
    for (mode, level) in registry.all() {
        info!(mode = %mode, config = %level, "Privacy level loaded");
    }

    let selector = ModeSelector::default();
    let bands = selector.config();
    info!(
        normal_above = bands.normal_above,
        stealth_above = bands.stealth_above,
        max_ghost_above = bands.max_ghost_above,
        safety_override_above = bands.safety_override_above,
        "Mode selector bands"
    );

    let engine = PrivacyEngine::new(
        registry,
        Box::new(WeightedRiskScorer::default()),
        selector,
        cfg.engine.default_mode,
    );

    // -- Serve -----------------------------------------------------------

    let state = Arc::new(ApiState::new(engine));
    api::serve(state, &cfg.bind_addr()).await?;

    info!("PGE stopped.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured filter; JSON output is enabled by
/// `PGE_LOG_JSON` or `[logging] json = true`.
fn init_logging(cfg: &config::AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter));

    let json_logging = cfg.logging.json || std::env::var("PGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
