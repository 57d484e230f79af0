//! HTTP API flows against a shared engine, including concurrent callers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pge::api::build_router;
use pge::api::routes::{ApiState, AppState};
use pge::engine::PrivacyEngine;
use pge::types::{Operation, PrivacyMode, Rationale, RiskSignalsPatch};

fn shared_state() -> AppState {
    Arc::new(ApiState::new(PrivacyEngine::standard(PrivacyMode::Normal)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let app = build_router(shared_state());

        let (status, json) = call(&app, "GET", "/privacy/current-config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "normal");

        // launch window: hot signals, explicit max_ghost preference
        let (_, json) = call(
            &app,
            "POST",
            "/privacy/select-mode",
            Some(json!({
                "sniper_activity": 0.9,
                "tx_amount_sol": 80.0,
                "volatility": 0.7,
                "hours_since_launch": 2.4,
                "user_preference": "max_ghost"
            })),
        )
        .await;
        assert_eq!(json["mode"], "max_ghost");
        assert!((json["risk_score"].as_f64().unwrap() - 0.80).abs() < 1e-9);

        // market calms; adjust must hold
        let (_, json) = call(
            &app,
            "POST",
            "/privacy/adjust",
            Some(json!({
                "sniper_activity": 0.0,
                "volatility": 0.1,
                "hours_since_launch": 30.0,
                "user_preference": "none"
            })),
        )
        .await;
        assert_eq!(json["mode"], "max_ghost");
        assert_eq!(json["rationale"], "held_anti_oscillation");
        assert!(json["risk_score"].as_f64().unwrap() < 0.3);

        let (_, json) = call(&app, "POST", "/privacy/reset", None).await;
        assert_eq!(json["mode"], "normal");

        let (_, json) = call(&app, "GET", "/privacy/history", None).await;
        assert!(json["entries"].as_array().unwrap().is_empty());
        assert_eq!(json["current_mode"], "normal");
    }

    #[tokio::test]
    async fn test_safety_escalation_over_api() {
        let app = build_router(shared_state());
        let (status, json) = call(
            &app,
            "POST",
            "/privacy/select-mode",
            Some(json!({"direct_risk_level": 0.75, "user_preference": "stealth"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["mode"], "max_ghost");
        assert_eq!(json["rationale"], "safety_escalation");
    }

    #[tokio::test]
    async fn test_errors_use_common_shape() {
        let app = build_router(shared_state());
        for body in [
            json!({"sniper_activity": 1.5}),
            json!({"volatility": -0.1}),
            json!({"hours_since_launch": -1.0}),
        ] {
            let (status, json) = call(&app, "POST", "/privacy/select-mode", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"]["code"], "INVALID_SIGNAL");
            assert!(json["error"]["message"].is_string());
        }

        let (status, json) = call(
            &app,
            "POST",
            "/privacy/adjust",
            Some(json!({"user_preference": "ghostest"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_PREFERENCE");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adjusts_never_downgrade() {
        let state = shared_state();

        let mut handles = Vec::new();
        for i in 0..32u32 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                let patch = RiskSignalsPatch {
                    direct_risk_level: Some(Some(f64::from(i % 10) / 10.0)),
                    ..Default::default()
                };
                let mut engine = state.engine.write().await;
                engine.adjust_with_patch(&patch).unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let engine = state.engine.read().await;
        let history = engine.history();
        assert_eq!(history.len(), 32);
        assert!(history.iter().all(|h| h.operation == Operation::Adjust));
        for pair in history.windows(2) {
            assert!(pair[1].decision.mode >= pair[0].decision.mode);
        }
        // 0.9 was submitted at least once
        assert_eq!(engine.current_mode(), Some(PrivacyMode::MaxGhost));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_http_adjusts() {
        let state = shared_state();
        let app = build_router(state.clone());

        let mut handles = Vec::new();
        for level in [0.95, 0.1, 0.6, 0.2, 0.85, 0.0, 0.4, 0.3] {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                call(
                    &app,
                    "POST",
                    "/privacy/adjust",
                    Some(json!({"direct_risk_level": level})),
                )
                .await
            }));
        }
        for handle in handles {
            let (status, _) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
        }

        let engine = state.engine.read().await;
        assert_eq!(engine.current_mode(), Some(PrivacyMode::MaxGhost));
        let history = engine.history();
        let first_max = history
            .iter()
            .position(|h| h.decision.mode == PrivacyMode::MaxGhost)
            .unwrap();
        // every entry after the first escalation to max_ghost stays there
        assert!(history[first_max..]
            .iter()
            .all(|h| h.decision.mode == PrivacyMode::MaxGhost));
        // anything submitted after that point was held or already max_ghost
        assert!(history[first_max + 1..].iter().all(|h| matches!(
            h.decision.rationale,
            Rationale::HeldAntiOscillation | Rationale::Threshold | Rationale::SafetyEscalation
        )));
    }
}
