//! Unified error types for Junction.
//!
//! Defines [`JunctionError`] (startup and configuration failures),
//! [`ValidationError`] for config validation findings, and
//! [`ProxyError`] — the per-request error taxonomy mapped to
//! client-visible status codes with empty bodies. All use `thiserror`
//! for `Display` and `Error` derives.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub scope: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  {}: {} — {}",
            self.scope, self.field, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JunctionError {
    #[error("No config file found.\n\n  {hint}")]
    NoConfigFile { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Failed to resolve '{endpoint}': {reason}")]
    Resolve { endpoint: String, reason: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// What went wrong while servicing a single request.
///
/// Every variant maps to exactly one client-visible status code; the
/// body is always empty and no custom headers are attached. An upstream
/// that *responds* is never an error — its status is relayed verbatim,
/// including 5xx.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No listener rule matched the request path.
    #[error("no listener rule matched")]
    NoRule,

    /// The matched group has no eligible targets.
    #[error("no eligible targets in group '{0}'")]
    NoHealthyTargets(String),

    /// Connection refused, reset before a response, or DNS failure.
    #[error("upstream connect failed: {0}")]
    UpstreamConnect(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The configured connection timeout elapsed before the full
    /// response arrived.
    #[error("upstream timed out")]
    UpstreamTimeout,
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoRule => StatusCode::NOT_FOUND,
            Self::NoHealthyTargets(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamConnect(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // Empty body, no custom headers.
        self.status().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_error_status_mapping() {
        assert_eq!(ProxyError::NoRule.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ProxyError::NoHealthyTargets("api".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ProxyError::UpstreamConnect("refused".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::UpstreamTimeout.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
