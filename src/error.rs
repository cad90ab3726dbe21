//! Error types for the edgequake-exam2sheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SheetError`] — **Fatal**: the run cannot produce anything (bad input
//!   file, provider not configured, every attempt failed). Returned as
//!   `Err(SheetError)` from the top-level entry points.
//!
//! * [`QuestionError`] — **Non-fatal**: one question failed in per-question
//!   mode while the others were extracted. Stored in
//!   [`crate::output::ExtractionOutput::failed`] so partial success stays a
//!   first-class outcome.
//!
//! Sanitisation and annotation never fail; they degrade instead.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown to the user when every extraction attempt failed.
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Analysis failed. Please wait a moment and try again.";

/// All fatal errors returned by the edgequake-exam2sheet library.
#[derive(Debug, Error)]
pub enum SheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Content is neither a PDF nor a JPEG/PNG/WebP image.
    #[error("'{name}' is not a supported file type ({detected}). Upload a PDF or an image file.")]
    UnsupportedFileType { name: String, detected: String },

    /// File exceeds the configured size limit.
    #[error("'{name}' is {size} bytes; files may not exceed {limit_mb} MB. Upload a smaller file.")]
    FileTooLarge {
        name: String,
        size: u64,
        limit_mb: u64,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call itself failed (network, HTTP status, provider error).
    #[error("LLM call failed: {message}")]
    Transport { message: String },

    /// The model answered, but the text is not the JSON we asked for.
    #[error("Malformed model response: {detail}")]
    MalformedResponse { detail: String },

    /// The response parsed but yielded zero usable questions.
    #[error(
        "No valid question data could be extracted from the file. \
Check that the scan is legible and that the selected questions appear in it."
    )]
    NoDataExtracted,

    /// Every attempt failed; carries the last failure for diagnostics.
    #[error("{message}\n\nDetail: {source}")]
    ExtractionFailed {
        message: String,
        attempts: u32,
        #[source]
        source: Box<SheetError>,
    },

    /// Every question failed in per-question mode.
    #[error("All {total} questions failed.\nFirst error: {first_error}")]
    AllQuestionsFailed { total: usize, first_error: String },

    /// The run was cancelled before a result was committed.
    #[error("Extraction cancelled")]
    Cancelled,

    // ── Export errors ─────────────────────────────────────────────────────
    /// A font file handed to the typesetter could not be read.
    #[error("Failed to read font '{path}': {source}")]
    FontLoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Typst compilation or PDF serialisation failed.
    #[error("PDF generation failed: {0}")]
    ExportFailed(String),

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SheetError {
    /// Wrap the last attempt's error once the retry budget is spent.
    pub fn exhausted(attempts: u32, last: SheetError) -> Self {
        SheetError::ExtractionFailed {
            message: EXTRACTION_FAILED_MESSAGE.to_string(),
            attempts,
            source: Box::new(last),
        }
    }

    /// True for input problems reported before any network call.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SheetError::FileNotFound { .. }
                | SheetError::PermissionDenied { .. }
                | SheetError::InvalidInput { .. }
                | SheetError::UnsupportedFileType { .. }
                | SheetError::FileTooLarge { .. }
        )
    }

    /// The innermost cause, looking through [`SheetError::ExtractionFailed`].
    pub fn root_cause(&self) -> &SheetError {
        match self {
            SheetError::ExtractionFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A non-fatal error for a single question.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum QuestionError {
    /// Extraction for this question failed after all attempts.
    #[error("Question {question}: extraction failed after {attempts} attempts: {detail}")]
    ExtractionFailed {
        question: String,
        attempts: u32,
        detail: String,
    },

    /// The model answered, but not for the question that was asked.
    #[error("Question {question}: not present in the model response")]
    Missing { question: String },
}

impl QuestionError {
    pub fn question(&self) -> &str {
        match self {
            QuestionError::ExtractionFailed { question, .. } | QuestionError::Missing { question } => {
                question
            }
        }
    }
}
