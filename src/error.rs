//! Error types for watermarking operations

use thiserror::Error;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, WatermarkError>;

/// Errors raised while configuring or applying a watermark.
///
/// The placement calculator itself never fails; everything here comes from
/// configuration checks or from the document pipeline around it.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// A configuration value is out of range or not finite
    #[error("Invalid watermark configuration: {0}")]
    InvalidConfig(String),

    /// Font name is not one of the supported standard fonts
    #[error("Unknown font: {0}")]
    UnknownFont(String),

    /// The input could not be parsed as a PDF
    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    /// The input uses a PDF feature this tool does not handle
    #[error("Unsupported PDF feature: {0}")]
    Unsupported(String),

    /// A requested page does not exist
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    /// The page tree resolved to zero pages
    #[error("No pages found in document")]
    NoPages,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WatermarkError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        WatermarkError::MalformedPdf(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        WatermarkError::InvalidConfig(reason.into())
    }
}
