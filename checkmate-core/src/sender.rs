//! Upload of a [`DeviceReport`] to the checkmate backend.

use std::time::Duration;

use tracing::{error, info};

use crate::error::AgentError;
use crate::report::DeviceReport;

pub const USER_AGENT: &str = "LLM-Checkmate-Agent/1.0";
const REGISTER_PATH: &str = "/api/device/register";

/// The registration endpoint for a backend URL. A URL that already ends in
/// the registration path is used as is.
pub fn register_url(backend_url: &str) -> String {
    if backend_url.ends_with(REGISTER_PATH) {
        backend_url.to_string()
    } else {
        format!("{}{REGISTER_PATH}", backend_url.trim_end_matches('/'))
    }
}

/// Where the web dashboard shows this device's report.
pub fn dashboard_link(backend_url: &str, device_id: &str) -> String {
    let base = backend_url
        .split("/api")
        .next()
        .unwrap_or(backend_url)
        .trim_end_matches('/');
    format!("{base}/?deviceId={device_id}")
}

fn classify_error(err: ureq::Error) -> AgentError {
    match err {
        ureq::Error::Timeout(_) => AgentError::Timeout,
        ureq::Error::StatusCode(code) => AgentError::Status(code),
        e @ (ureq::Error::HostNotFound | ureq::Error::ConnectionFailed) => {
            AgentError::Connection(e.to_string())
        }
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => AgentError::Timeout,
        ureq::Error::Io(io) => AgentError::Connection(io.to_string()),
        other => AgentError::Response(other.to_string()),
    }
}

/// POST the report and return the backend's JSON reply.
pub fn send_report(
    report: &DeviceReport,
    backend_url: &str,
    timeout: Duration,
) -> Result<serde_json::Value, AgentError> {
    let url = register_url(backend_url);
    let response = ureq::post(&url)
        .header("User-Agent", USER_AGENT)
        .config()
        .timeout_global(Some(timeout))
        .build()
        .send_json(report)
        .map_err(|e| {
            let err = classify_error(e);
            error!(url = %url, error = %err, "report upload failed");
            err
        })?;

    info!(status = response.status().as_u16(), "hardware report sent");
    response
        .into_body()
        .read_json()
        .map_err(|e| AgentError::Response(e.to_string()))
}
