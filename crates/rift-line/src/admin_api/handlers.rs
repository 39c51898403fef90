//! Admin API handlers.
//!
//! Lifecycle handlers take the raw request body so they can be driven
//! without an HTTP connection. Lifecycle calls touch the filesystem and the
//! resource store, so they run on the blocking pool.

use crate::admin_api::types::*;
use crate::engine::StubEngine;
use crate::error::LifecycleError;
use crate::metrics::collect_metrics;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{error, warn};

/// GET / - Links to the admin endpoints
pub fn handle_root(base_url: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "_links": {
            "status": {"href": format!("{}/status", base_url)},
            "health": {"href": format!("{}/health", base_url)},
            "metrics": {"href": format!("{}/metrics", base_url)},
            "scenario": {"href": format!("{}/scenario", base_url)},
            "testcase": {"href": format!("{}/testcase", base_url)}
        }
    });
    json_response(StatusCode::OK, &body)
}

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// GET /metrics - Prometheus metrics
pub fn handle_metrics() -> Response<Full<Bytes>> {
    build_response_with_headers(
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        collect_metrics(),
    )
}

/// GET /status - Current session state
pub fn handle_status(engine: &StubEngine) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &engine.status())
}

/// POST /scenario/start
pub async fn handle_start_scenario(engine: Arc<StubEngine>, body: Bytes) -> Response<Full<Bytes>> {
    let req: StartScenarioRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    run_lifecycle(engine, move |engine| {
        engine.start_scenario(&req.user_id, &req.group_id, &req.scenario_id)
    })
    .await
}

/// POST /scenario/cancel
pub async fn handle_cancel_scenario(engine: Arc<StubEngine>) -> Response<Full<Bytes>> {
    run_lifecycle(engine, |engine| engine.cancel_scenario()).await
}

/// POST /scenario/end
pub async fn handle_end_scenario(engine: Arc<StubEngine>) -> Response<Full<Bytes>> {
    run_lifecycle(engine, |engine| engine.end_scenario()).await
}

/// POST /testcase/start
pub async fn handle_start_testcase(engine: Arc<StubEngine>, body: Bytes) -> Response<Full<Bytes>> {
    let req: StartTestCaseRequest = match parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    run_lifecycle(engine, move |engine| engine.start_testcase(&req.testcase_id)).await
}

/// POST /testcase/end
pub async fn handle_end_testcase(engine: Arc<StubEngine>) -> Response<Full<Bytes>> {
    run_lifecycle(engine, |engine| engine.end_testcase()).await
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|e| {
        coded_error_response(
            StatusCode::BAD_REQUEST,
            "invalid JSON",
            &format!("Unable to parse body: {e}"),
        )
    })
}

async fn run_lifecycle<F>(engine: Arc<StubEngine>, op: F) -> Response<Full<Bytes>>
where
    F: FnOnce(&StubEngine) -> Result<(), LifecycleError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let result = op(&engine);
        (result, engine)
    })
    .await;

    match result {
        Ok((Ok(()), engine)) => handle_status(&engine),
        Ok((Err(e), _)) => {
            warn!("Lifecycle request rejected: {}", e);
            lifecycle_error_response(&e)
        }
        Err(e) => {
            error!("Lifecycle task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Lifecycle task failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::EngineSettings;
    use crate::store::NoOpResourceStore;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn engine(root: &TempDir) -> Arc<StubEngine> {
        let mut config = Config::default();
        config.resources.root = root.path().join("resources");
        config.resources.evidence_root = root.path().join("evidence");
        Arc::new(StubEngine::new(
            EngineSettings::from_config(&config),
            Arc::new(NoOpResourceStore),
            None,
        ))
    }

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_start_scenario_returns_status() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root);

        let body = Bytes::from(r#"{"userId":"alice","groupId":"grp","scenarioId":"scn"}"#);
        let resp = handle_start_scenario(Arc::clone(&engine), body).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["state"], "scenarioActive");
        assert_eq!(json["scenario"]["scenarioId"], "scn");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let root = TempDir::new().unwrap();
        let resp = handle_start_scenario(engine(&root), Bytes::from("{not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["errors"][0]["code"], "invalid JSON");
    }

    #[tokio::test]
    async fn test_precondition_violation_is_conflict() {
        let root = TempDir::new().unwrap();
        let resp = handle_end_scenario(engine(&root)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = handle_end_testcase(engine(&root)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_testcase_is_not_found() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root);
        let body = Bytes::from(r#"{"userId":"alice","groupId":"grp","scenarioId":"scn"}"#);
        handle_start_scenario(Arc::clone(&engine), body).await;

        let resp =
            handle_start_testcase(Arc::clone(&engine), Bytes::from(r#"{"testcaseId":"TC9"}"#)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_ok() {
        let root = TempDir::new().unwrap();
        let resp = handle_cancel_scenario(engine(&root)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["state"], "idle");
    }

    #[test]
    fn test_health() {
        assert_eq!(handle_health().status(), StatusCode::OK);
    }
}
