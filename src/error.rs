//! Error handling for the atlas engine
//!
//! Every fallible atlas operation returns an [`AtlasResult`]. Packer-level
//! placement failures are not errors: the packer returns `None` and the
//! caller moves on to another page.

use crate::pixel_format::{PixelFormat, PixelType};

/// Main error type for the atlas engine
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    // Configuration Errors
    #[error("Invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported pixel format: {format:?}/{pixel_type:?}")]
    UnsupportedFormat {
        format: PixelFormat,
        pixel_type: PixelType,
    },

    #[error("Config IO error for {path}: {error}")]
    ConfigIo { path: String, error: String },

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    // Memory Errors
    #[error("Allocation failed for {what} ({requested} slots)")]
    AllocationFailed { what: String, requested: usize },

    #[error("Surface allocation failed for {width}x{height}: {reason}")]
    SurfaceAllocationFailed {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Transfer buffer creation failed: size={size}, {reason}")]
    BufferCreationFailed { size: u64, reason: String },

    // Placement Errors
    #[error("Frame {width}x{height} (padded) does not fit a {page_width}x{page_height} page")]
    FrameTooLarge {
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    #[error("Atlas is frozen, cannot {operation}")]
    AtlasFrozen { operation: String },

    #[error("Atlas entry not found: index {index}")]
    EntryNotFound { index: usize },

    #[error("Frame index {frame} out of range (entry has {frame_count} frames)")]
    FrameOutOfRange { frame: usize, frame_count: usize },

    #[error("Frame {frame} of entry {entry} has not been placed")]
    FrameNotPlaced { entry: usize, frame: usize },

    // Transfer Errors
    #[error("Invalid pixel data: expected at least {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    #[error("Pixel data mismatch: expected {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    #[error("Failed to map transfer range offset={offset} size={size}: {reason}")]
    MapFailed {
        offset: u64,
        size: u64,
        reason: String,
    },

    #[error("Backend error: {0}")]
    Backend(String),

    // Generic fallback for unexpected errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results in the atlas engine
pub type AtlasResult<T> = Result<T, AtlasError>;

impl From<toml::de::Error> for AtlasError {
    fn from(error: toml::de::Error) -> Self {
        AtlasError::ConfigParse(error.to_string())
    }
}

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_atlas<F>(self, f: F) -> AtlasResult<T>
    where
        F: FnOnce() -> AtlasError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_atlas<F>(self, f: F) -> AtlasResult<T>
    where
        F: FnOnce() -> AtlasError,
    {
        self.ok_or_else(f)
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> AtlasResult<T>;
    fn with_context<F>(self, f: F) -> AtlasResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> AtlasResult<T> {
        self.map_err(|e| AtlasError::Internal {
            message: format!("{}: {}", msg, e),
        })
    }

    fn with_context<F>(self, f: F) -> AtlasResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AtlasError::Internal {
            message: format!("{}: {}", f(), e),
        })
    }
}
