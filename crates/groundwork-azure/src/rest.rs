//! Shared HTTP plumbing: error classification and completion polling

use std::future::Future;
use std::time::Duration;

use serde_json::{json, Value};

use groundwork_core::{Error, Result};

/// How long to keep polling a long-running control-plane operation.
pub(crate) const PROVISIONING_TIMEOUT: Duration = Duration::from_secs(600);
/// Delay between provisioning-state probes.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) fn default_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("groundwork/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

/// Map transport-level failures. Timeouts and connection resets are
/// retryable; everything else is surfaced as-is.
pub(crate) fn transport_error(err: reqwest::Error, resource: &str) -> Error {
    if err.is_timeout() || err.is_connect() {
        Error::transient(format!("{resource}: {err}"))
    } else {
        Error::Api {
            status: 0,
            code: "transport".to_string(),
            message: format!("{resource}: {err}"),
        }
    }
}

/// Classify an HTTP status into the error taxonomy.
pub(crate) fn classify_status(status: u16, resource: &str, code: String, message: String) -> Error {
    match status {
        401 | 403 => Error::auth(format!("{resource}: {message}")),
        404 => Error::not_found(resource.to_string()),
        409 => Error::conflict(resource.to_string(), message),
        408 | 429 => Error::transient(format!("{resource}: HTTP {status}: {message}")),
        s if s >= 500 => Error::transient(format!("{resource}: HTTP {s} {code}: {message}")),
        s => Error::Api {
            status: s,
            code,
            message,
        },
    }
}

/// Extract `{"error": {"code", "message"}}` from a cloud error body.
pub(crate) fn parse_cloud_error(body: &str) -> (String, String) {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let code = value
            .pointer("/error/code")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let message = value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string();
        (code, message)
    } else {
        (String::new(), body.to_string())
    }
}

/// Turn a failed response into an [`Error`], consuming the body.
pub(crate) async fn error_from_response(resp: reqwest::Response, resource: &str) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let (code, message) = parse_cloud_error(&body);
    classify_status(status, resource, code, message)
}

pub(crate) async fn expect_success(
    resp: reqwest::Response,
    resource: &str,
) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(error_from_response(resp, resource).await)
    }
}

/// Read a response body as JSON, tolerating empty bodies (202 Accepted).
pub(crate) async fn json_body(resp: reqwest::Response, resource: &str) -> Result<Value> {
    let text = resp
        .text()
        .await
        .map_err(|e| transport_error(e, resource))?;
    if text.trim().is_empty() {
        Ok(Value::Null)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

/// Treat a missing resource as still provisioning.
///
/// The control plane may briefly 404 a resource between the accepted PUT
/// and read-visibility; that window must read as "Creating", not as a
/// fatal absence.
pub(crate) fn state_or_creating(body: Option<Value>) -> Value {
    body.unwrap_or_else(|| json!({"properties": {"provisioningState": "Creating"}}))
}

/// Poll `probe` until `properties.provisioningState` reports `Succeeded`.
///
/// The control plane accepts vault and storage-account writes before the
/// resource is usable; dependent steps must not start until the state
/// settles. A terminal `Failed`/`Canceled` state surfaces as an API error,
/// a timeout as `Transient` so a re-run can pick the operation back up.
pub(crate) async fn wait_for_provisioning<F, Fut>(
    resource: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let body = probe().await?;
        let state = body
            .pointer("/properties/provisioningState")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        match state {
            "Succeeded" => return Ok(body),
            "Failed" | "Canceled" => {
                return Err(Error::Api {
                    status: 0,
                    code: "ProvisioningFailed".to_string(),
                    message: format!("{resource} ended in state {state}"),
                })
            }
            _ => {
                if tokio::time::Instant::now() >= deadline {
                    return Err(Error::transient(format!(
                        "{resource} provisioning timed out after {timeout:?}"
                    )));
                }
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_classification_follows_the_taxonomy() {
        assert!(matches!(
            classify_status(401, "vault v", String::new(), "no".into()),
            Error::Auth { .. }
        ));
        assert!(matches!(
            classify_status(403, "vault v", String::new(), "no".into()),
            Error::Auth { .. }
        ));
        assert!(classify_status(404, "key pulumi", String::new(), String::new()).is_not_found());
        assert!(matches!(
            classify_status(409, "vault v", "VaultAlreadyExists".into(), "taken".into()),
            Error::Conflict { .. }
        ));
        assert!(classify_status(429, "rg", String::new(), "throttled".into()).is_transient());
        assert!(classify_status(503, "rg", String::new(), "busy".into()).is_transient());
        assert!(matches!(
            classify_status(400, "rg", "BadRequest".into(), "nope".into()),
            Error::Api { status: 400, .. }
        ));
    }

    #[test]
    fn cloud_error_bodies_are_unwrapped() {
        let (code, message) =
            parse_cloud_error(r#"{"error":{"code":"KeyNotFound","message":"key absent"}}"#);
        assert_eq!(code, "KeyNotFound");
        assert_eq!(message, "key absent");

        let (code, message) = parse_cloud_error("gateway exploded");
        assert!(code.is_empty());
        assert_eq!(message, "gateway exploded");
    }

    #[test]
    fn absent_resources_read_as_still_creating() {
        assert_eq!(
            state_or_creating(None)
                .pointer("/properties/provisioningState")
                .unwrap(),
            "Creating"
        );
        let settled = json!({"properties": {"provisioningState": "Succeeded"}});
        assert_eq!(state_or_creating(Some(settled.clone())), settled);
    }

    #[tokio::test]
    async fn polling_returns_once_succeeded() {
        let mut states = vec!["Succeeded", "Creating", "Creating"];
        let body = wait_for_provisioning(
            "storage account test",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || {
                let state = states.pop().unwrap();
                async move { Ok(json!({"properties": {"provisioningState": state}})) }
            },
        )
        .await
        .unwrap();
        assert_eq!(
            body.pointer("/properties/provisioningState").unwrap(),
            "Succeeded"
        );
    }

    #[tokio::test]
    async fn polling_surfaces_terminal_failure() {
        let err = wait_for_provisioning(
            "vault test",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async { Ok(json!({"properties": {"provisioningState": "Failed"}})) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
    }

    #[tokio::test]
    async fn polling_times_out_as_transient() {
        let err = wait_for_provisioning(
            "vault test",
            Duration::from_millis(5),
            Duration::from_millis(1),
            || async { Ok(json!({"properties": {"provisioningState": "Creating"}})) },
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
    }
}
