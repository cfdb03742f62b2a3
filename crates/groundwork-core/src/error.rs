//! Error types for groundwork-core

use thiserror::Error;

/// Result type alias using groundwork-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every cloud collaborator.
///
/// Classification drives control flow in exactly two places: the key
/// get-or-create probe recovers `NotFound` locally, and the retry engine
/// re-issues `Transient` failures. Everything else propagates unmodified
/// to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential or token acquisition failure. Fatal, never retried.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Target resource absent. Recovered only inside get-or-create probes.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Name already claimed by another tenant or account. Fatal.
    #[error("name conflict for {resource}: {message}")]
    Conflict { resource: String, message: String },

    /// Timeout, throttling, or server-side failure. Retried with backoff
    /// for idempotent operations.
    #[error("transient cloud failure: {message}")]
    Transient { message: String },

    /// Any other cloud API error, with the service's own code and message.
    #[error("cloud API error (HTTP {status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Malformed ciphertext or key mismatch. Fatal.
    #[error("crypto failure: {message}")]
    Crypto { message: String },

    /// Database connection or statement failure in the identity binder.
    #[error("database error: {message}")]
    Database { message: String },

    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration contents
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a not-found error for a named resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a name-conflict error
    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a config-not-found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid-config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the retry engine may re-issue the failed operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether this failure means the target resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_the_only_retryable_class() {
        assert!(Error::transient("throttled").is_transient());
        for err in [
            Error::auth("expired"),
            Error::not_found("key pulumi"),
            Error::conflict("vault", "taken"),
            Error::crypto("bad padding"),
            Error::database("login failed"),
        ] {
            assert!(!err.is_transient(), "{err} must not be retried");
        }
    }

    #[test]
    fn not_found_is_detectable_for_the_probe() {
        assert!(Error::not_found("key pulumi").is_not_found());
        assert!(!Error::transient("timeout").is_not_found());
    }
}
