//! Request/response bodies and response helpers for the admin API.

use crate::error::LifecycleError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// POST /scenario/start body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScenarioRequest {
    pub user_id: String,
    pub group_id: String,
    pub scenario_id: String,
}

/// POST /testcase/start body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTestCaseRequest {
    pub testcase_id: String,
}

/// Extract base URL from request headers for links
pub fn get_base_url(req: &Request<Incoming>) -> String {
    if let Some(host) = req.headers().get("host") {
        if let Ok(host_str) = host.to_str() {
            return format!("http://{}", host_str);
        }
    }
    "http://localhost:2626".to_string()
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with headers.
///
/// Falls back to a bare response if the builder rejects the headers.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Create an error response with an explicit error code
pub fn coded_error_response(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Create an error response coded by its status
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    coded_error_response(status, status.as_str(), message)
}

/// Map a lifecycle failure onto status and error code
pub fn lifecycle_error_response(error: &LifecycleError) -> Response<Full<Bytes>> {
    let (status, code) = match error {
        LifecycleError::ScenarioAlreadyActive { .. } => {
            (StatusCode::CONFLICT, "scenario already active")
        }
        LifecycleError::NoActiveScenario => (StatusCode::CONFLICT, "no active scenario"),
        LifecycleError::TestCaseAlreadyActive { .. } => {
            (StatusCode::CONFLICT, "test case already active")
        }
        LifecycleError::NoActiveTestCase { .. } => (StatusCode::CONFLICT, "no active test case"),
        LifecycleError::UnknownTestCase { .. } => (StatusCode::NOT_FOUND, "unknown test case"),
        LifecycleError::InvalidIdentifier { .. } => (StatusCode::BAD_REQUEST, "bad data"),
        LifecycleError::Index { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "invalid resources"),
        LifecycleError::Store { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "resource store failure"),
        LifecycleError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io failure"),
    };
    coded_error_response(status, code, &error.to_string())
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_json_response() {
        let body = serde_json::json!({"test": "value"});
        let resp = json_response(StatusCode::OK, &body);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_lifecycle_error_mapping() {
        let resp = lifecycle_error_response(&LifecycleError::NoActiveScenario);
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json = body_json(resp).await;
        assert_eq!(json["errors"][0]["code"], "no active scenario");
        assert_eq!(json["errors"][0]["message"], "No active scenario");

        let resp = lifecycle_error_response(&LifecycleError::UnknownTestCase {
            scenario: "g/s".to_string(),
            testcase: "TC9".to_string(),
        });
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = lifecycle_error_response(&LifecycleError::Store {
            scenario: "g/s".to_string(),
            source: anyhow::anyhow!("bucket unreachable"),
        });
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_start_scenario_request_is_camel_case() {
        let req: StartScenarioRequest =
            serde_json::from_str(r#"{"userId":"u","groupId":"g","scenarioId":"s"}"#).unwrap();
        assert_eq!(req.group_id, "g");
        assert!(serde_json::from_str::<StartTestCaseRequest>(r#"{"testcase":"x"}"#).is_err());
    }

    #[test]
    fn test_not_found_response() {
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
    }
}
