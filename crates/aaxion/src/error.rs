use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AaxionError {
    // Validation errors
    #[error("{path}: not a valid AAX container (brand tag: {brand:?})")]
    InvalidContainer { path: PathBuf, brand: String },

    #[error("License file is missing the `{0}` field")]
    MissingLicenseField(&'static str),

    #[error("Invalid activation bytes: {0}")]
    InvalidActivationBytes(String),

    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    // Resolution errors
    #[error(
        "No activation bytes available. Pass them with --activation-bytes, \
         select a registered device with --device, or crack them with --crack"
    )]
    NoActivationBytes,

    #[error("Device {0} not found in the activation table")]
    DeviceNotFound(u32),

    // Crack errors
    #[error("rcrack failed: {0}")]
    CrackFailed(String),

    #[error("Activation bytes not found for checksum {0}")]
    ActivationBytesNotFound(String),

    // Transfer errors
    #[error("Download error: HTTP {0}")]
    HttpError(reqwest::StatusCode),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    // Subprocess errors
    #[error("{program} exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Unexpected {program} output: {reason}")]
    UnexpectedOutput { program: String, reason: String },

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
}

impl AaxionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type AaxionResult<T> = Result<T, AaxionError>;
