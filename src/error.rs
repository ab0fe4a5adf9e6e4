// src/error.rs

use thiserror::Error;

/// Core error types for devsetup
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration document does not exist
    #[error("Configuration not found at path: {0}")]
    ConfigNotFound(String),

    /// Configuration document could not be parsed or failed validation
    #[error("Malformed configuration: {0}")]
    ConfigMalformed(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A package exhausted its retries
    #[error("Package {identifier} failed: {message}")]
    PackageFailed { identifier: String, message: String },
}

/// Result type alias using devsetup's Error type
pub type Result<T> = std::result::Result<T, Error>;
