//! Error types.
//!
//! Failures fall into three tiers. Contract violations (mismatched sizes,
//! use of heterogeneous meshes in a combine, out-of-range uploads) abort via
//! assertions at the call site and never reach this type. Recoverable
//! construction and IO failures are returned as [`GraphicsError`]. Device
//! errors polled at runtime are logged and advisory only.

use thiserror::Error;

/// Errors surfaced by resource construction and asset loading.
#[derive(Error, Debug)]
pub enum GraphicsError {
    /// The device returned a null identifier for a new object.
    #[error("failed to create {0}")]
    ResourceCreationFailed(String),
    /// The requested format/target combination is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// An argument is outside the accepted domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Filesystem failure while loading an asset.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The image decoder rejected a file.
    #[error("image decode failed: {0}")]
    ImageDecode(String),
    /// A mesh source file could not be parsed.
    #[error("mesh parse failed: {0}")]
    MeshParse(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphicsError>;
