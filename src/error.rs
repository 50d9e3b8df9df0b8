//! Crate error type.
//!
//! Every handler returns [`Result`]; HTTP failures keep their status code so
//! callers can treat `404`/`409`/`400` specially, and [`Error::context`] wraps
//! an error with the operation that failed (`"creating Subnet: (...)"`).

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Non-success response from ARM or a Key Vault data-plane endpoint.
    #[error("unexpected status {status} with error: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information.")]
    ImportAsExists { resource_type: String, id: String },

    #[error("parsing {input:?}: {reason}")]
    InvalidId { input: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("timeout while waiting for state to become '{expected}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        last_state: String,
        expected: String,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState { state: String, expected: String },

    #[error("couldn't find resource ({retries} retries)")]
    NotFoundAfterRetries { retries: u32 },

    #[error("context deadline exceeded (timeout: {0:?})")]
    DeadlineExceeded(Duration),

    #[error("{0}")]
    Config(String),

    #[error("obtaining access token: {0}")]
    Auth(String),

    #[error("az cli: {0}")]
    Cli(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("decoding JSON at path {path:?}: {message}")]
    Json { path: String, message: String },

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with a description of the operation that failed.
    pub fn context(self, message: impl Into<String>) -> Self {
        Error::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// HTTP status of the underlying response, looking through context wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Context { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn was_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn was_bad_request(&self) -> bool {
        self.status() == Some(400)
    }

    pub fn was_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn was_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Transport level failures that are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Context { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::DeadlineExceeded(_) => true,
            Error::Context { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    pub fn import_as_exists(resource_type: &str, id: impl Into<String>) -> Self {
        Error::ImportAsExists {
            resource_type: resource_type.to_string(),
            id: id.into(),
        }
    }

    pub fn invalid_id(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidId {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json {
            path: String::new(),
            message: e.to_string(),
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
    fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Error::Json {
            path: e.path().to_string(),
            message: e.into_inner().to_string(),
        }
    }
}

/// `.context(..)` on results, mirroring `fmt.Errorf("creating %s: %+v", id, err)`.
pub trait ResultExt<T> {
    fn context(self, message: impl Into<String>) -> Result<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(message))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
