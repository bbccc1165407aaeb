//! Unified error types for the acceptance controller.
//!
//! Business rejections and motor faults are *values* (see
//! [`ReasonCode`](crate::verification::ReasonCode) and
//! [`JamEvent`](crate::jam::JamEvent)), never errors.  The types here
//! cover infrastructure failures at the port boundary; each one converts
//! into the crate-wide [`Error`].

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible infrastructure operation funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The product catalog could not be parsed.
    Catalog(CatalogError),
    /// Motor drive telemetry could not be read.
    Telemetry(TelemetryError),
    /// The image classifier failed.
    Classifier(ClassifierError),
    /// A bench scenario file was malformed.
    Scenario(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Catalog(e) => write!(f, "catalog: {e}"),
            Self::Telemetry(e) => write!(f, "telemetry: {e}"),
            Self::Classifier(e) => write!(f, "classifier: {e}"),
            Self::Scenario(msg) => write!(f, "scenario: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Errors from [`ConfigPort`](crate::app::ports::ConfigPort) operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first start).
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from [`StoragePort`](crate::app::ports::StoragePort) operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Key or namespace contains characters the backend cannot store.
    InvalidKey,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::InvalidKey => write!(f, "invalid key"),
        }
    }
}

impl std::error::Error for StorageError {}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog document is not valid JSON or has the wrong shape.
    Malformed(String),
    /// An entry has a min bound above its max bound.
    InvertedRange(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed catalog: {msg}"),
            Self::InvertedRange(barcode) => {
                write!(f, "entry {barcode} has min bound above max bound")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<CatalogError> for Error {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The drive did not answer within the bus timeout.
    Timeout,
    /// The drive answered with an exception or a malformed frame.
    BadResponse,
    /// The bus / serial port is not connected.
    Disconnected,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "drive read timed out"),
            Self::BadResponse => write!(f, "bad drive response"),
            Self::Disconnected => write!(f, "drive bus disconnected"),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<TelemetryError> for Error {
    fn from(e: TelemetryError) -> Self {
        Self::Telemetry(e)
    }
}

// ---------------------------------------------------------------------------
// Classifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierError {
    /// The camera could not capture a frame.
    CaptureFailed,
    /// The model found no container in the frame.
    NoDetection,
    /// The classifier backend is unavailable.
    Unavailable,
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureFailed => write!(f, "image capture failed"),
            Self::NoDetection => write!(f, "no container detected"),
            Self::Unavailable => write!(f, "classifier unavailable"),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<ClassifierError> for Error {
    fn from(e: ClassifierError) -> Self {
        Self::Classifier(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
