use thiserror::Error;

/// Failures while assembling the explorer's runtime
#[derive(Error, Debug)]
pub enum Error {
    /// A setting failed validation, or logging could not be installed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not supplied to the builder
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
