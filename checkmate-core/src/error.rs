//! Error types for the checkmate core.
//!
//! Validation errors are raised before the compatibility engine runs; the
//! engine itself has no failure path.

use thiserror::Error;

/// A hardware number that failed validation, or was never supplied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("missing hardware field: {0}")]
    Missing(&'static str),

    #[error("hardware field {field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },

    #[error("hardware field {field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
}

/// A model descriptor or request parameter that cannot be classified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model id must not be empty")]
    EmptyId,

    #[error("model {id}: parameter count must be a positive finite number (got {value})")]
    InvalidParams { id: String, value: f64 },

    #[error("model {id}: max context must be at least 1 token")]
    InvalidMaxContext { id: String },

    #[error("context window must be at least 1 token")]
    InvalidContextWindow,
}

/// Failures talking to a remote model catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(String),

    #[error("catalog returned HTTP {0}")]
    Status(u16),

    #[error("could not decode catalog response: {0}")]
    Decode(String),

    #[error("catalog unavailable after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Failures of the hardware agent (device id persistence, report upload).
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("request timed out; is the backend server running?")]
    Timeout,

    #[error("connection failed; is the backend reachable? ({0})")]
    Connection(String),

    #[error("HTTP error: backend returned status {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Umbrella error for callers that drive several collaborators at once.
#[derive(Error, Debug)]
pub enum CheckmateError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_error_names_the_field() {
        let err = ProfileError::Negative {
            field: "vram_gb",
            value: -2.0,
        };
        assert_eq!(
            err.to_string(),
            "hardware field vram_gb must not be negative (got -2)"
        );
        assert_eq!(
            ProfileError::Missing("ram_gb").to_string(),
            "missing hardware field: ram_gb"
        );
    }

    #[test]
    fn test_umbrella_error_is_transparent() {
        let err: CheckmateError = ModelError::InvalidContextWindow.into();
        assert_eq!(err.to_string(), "context window must be at least 1 token");
    }
}
