//! Route dispatch logic for the admin API.

use crate::admin_api::handlers;
use crate::admin_api::types::{collect_body, error_response, get_base_url, not_found};
use crate::engine::StubEngine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle endpoints, all POST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleRoute {
    StartScenario,
    CancelScenario,
    EndScenario,
    StartTestCase,
    EndTestCase,
}

impl LifecycleRoute {
    fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["scenario", "start"] => Some(LifecycleRoute::StartScenario),
            ["scenario", "cancel"] => Some(LifecycleRoute::CancelScenario),
            ["scenario", "end"] => Some(LifecycleRoute::EndScenario),
            ["testcase", "start"] => Some(LifecycleRoute::StartTestCase),
            ["testcase", "end"] => Some(LifecycleRoute::EndTestCase),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    engine: Arc<StubEngine>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Admin API: {} {}", method, path);

    match (&method, path.as_str()) {
        (&Method::GET, "/") => return Ok(handlers::handle_root(&get_base_url(&req))),
        (&Method::GET, "/health") => return Ok(handlers::handle_health()),
        (&Method::GET, "/status") => return Ok(handlers::handle_status(&engine)),
        (&Method::GET, "/metrics") => return Ok(handlers::handle_metrics()),
        _ => {}
    }

    let Some(route) = LifecycleRoute::parse(&path) else {
        return Ok(not_found());
    };
    if method != Method::POST {
        return Ok(error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Lifecycle endpoints only accept POST",
        ));
    }

    let response = match route {
        LifecycleRoute::StartScenario => match collect_body(req).await {
            Ok(body) => handlers::handle_start_scenario(engine, body).await,
            Err(e) => error_response(StatusCode::BAD_REQUEST, &e),
        },
        LifecycleRoute::StartTestCase => match collect_body(req).await {
            Ok(body) => handlers::handle_start_testcase(engine, body).await,
            Err(e) => error_response(StatusCode::BAD_REQUEST, &e),
        },
        LifecycleRoute::CancelScenario => handlers::handle_cancel_scenario(engine).await,
        LifecycleRoute::EndScenario => handlers::handle_end_scenario(engine).await,
        LifecycleRoute::EndTestCase => handlers::handle_end_testcase(engine).await,
    };
    Ok(response)
}
