//! # Error Handling
//!
//! A single error type, [`SearchError`], covers every failure the search
//! subsystem can surface. Each variant belongs to one category of the error
//! taxonomy and knows the HTTP-equivalent status and the public error code an
//! outer surface should use when reporting it.
//!
//! Cache tiers have their own [`CacheError`](crate::caching::CacheError); those
//! errors never leave the read/write path and only become a `SearchError`
//! through an explicit administrative flush.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors produced by the search and synchronization subsystem
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Bad filter values or document input; user-correctable
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The index service is unreachable, erroring or returned an undecodable response
    #[error("Search backend error: {message}")]
    Backend { message: String },

    /// A write against the index (add/overwrite or delete) failed
    #[error("Index update failed: {message}")]
    Index { message: String },

    /// The catalog of record does not know the requested resource
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The catalog of record failed for any reason other than "not found"
    #[error("Catalog error: {message}")]
    Catalog { message: String },

    /// Broker connection or channel failure
    #[error("Broker error: {message}")]
    Broker { message: String },

    /// Cache failure surfaced by an explicit flush
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// The event router received an event type it has no route for
    #[error("Unsupported event type: {event_type}")]
    UnsupportedEvent { event_type: String },

    /// Invalid configuration detected at startup
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected failures
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a search backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create an index write error
    pub fn index<S: Into<String>>(message: S) -> Self {
        Self::Index {
            message: message.into(),
        }
    }

    /// Create a not found error for a resource
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Create a broker error
    pub fn broker<S: Into<String>>(message: S) -> Self {
        Self::Broker {
            message: message.into(),
        }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an unsupported event error
    pub fn unsupported_event<S: Into<String>>(event_type: S) -> Self {
        Self::UnsupportedEvent {
            event_type: event_type.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP-equivalent status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Backend { .. } | Self::Catalog { .. } => StatusCode::BAD_GATEWAY,
            Self::Broker { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Index { .. }
            | Self::Cache { .. }
            | Self::UnsupportedEvent { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error category
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Backend { .. } => "SEARCH_BACKEND_ERROR",
            Self::Index { .. } => "INDEX_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Catalog { .. } => "CATALOG_ERROR",
            Self::Broker { .. } => "BROKER_ERROR",
            Self::Cache { .. } => "CACHE_ERROR",
            Self::UnsupportedEvent { .. } => "UNSUPPORTED_EVENT",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to a caller.
    ///
    /// User-correctable errors keep their detail; infrastructure failures get a
    /// generic message and their detail is expected to be logged instead.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::NotFound { .. } => self.to_string(),
            Self::Backend { .. } => "The search index could not be queried".to_string(),
            Self::Cache { .. } => "Could not flush caches".to_string(),
            _ => "Could not complete the request".to_string(),
        }
    }

    /// Whether the failure is transient and the operation may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. } | Self::Catalog { .. } | Self::Broker { .. }
        )
    }

    /// Whether this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<lapin::Error> for SearchError {
    fn from(err: lapin::Error) -> Self {
        Self::broker(err.to_string())
    }
}
