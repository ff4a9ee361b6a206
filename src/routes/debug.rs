use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health - Check if services are working
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut status = json!({
        "status": "ok",
        "checks": {}
    });

    if state.hazards.health_check().await {
        status["checks"]["hazard_store"] = json!("ok");
    } else {
        status["checks"]["hazard_store"] = json!({"error": "unreachable"});
        status["status"] = json!("error");
    }

    let memo_ok = state.memo.health_check().await;
    let stats = state.memo.get_stats().await;
    status["checks"]["memo"] = json!({
        "backend": state.memo.backend_name(),
        "healthy": memo_ok,
        "stats": stats,
    });
    if !memo_ok && status["status"] == "ok" {
        status["status"] = json!("degraded");
    }

    let coordinator = state.planner.coordinator();
    let backoff = coordinator.backoff_state();
    status["checks"]["coordinator"] = json!({
        "cached_routes": coordinator.cache_len(),
        "in_flight": coordinator.is_in_flight(),
        "consecutive_rate_limits": backoff.failure_count,
    });

    status["checks"]["navigation"] = json!({
        "state": state.navigator.state(),
    });

    Json(status)
}
