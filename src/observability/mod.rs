// Logging configuration
pub mod config;

// Structured logging
pub mod logging;

// Re-export commonly used types for convenience
pub use config::{LogConfig, LogFormat};
pub use logging::{init_logging, redact_url};
