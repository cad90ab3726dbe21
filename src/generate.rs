//! Top-level entry points: extraction, sheet generation and file output.
//!
//! [`extract`] stops at sanitized records; [`generate`] continues through
//! annotation, presentation and PDF export. Input validation (existence,
//! size, file type) happens before a provider is even resolved, so a bad
//! upload never costs a model call.

use crate::config::{ExtractionMode, SheetConfig};
use crate::error::SheetError;
use crate::output::{ExtractionOutput, SheetOutput};
use crate::pipeline::encode::{encode_input, normalize_logo};
use crate::pipeline::export::{SheetExporter, TypstExporter};
use crate::pipeline::input::{load_input, InputFile};
use crate::pipeline::present::{present, AnswerSheetDocument};
use crate::pipeline::transport::{
    extract_batch, extract_per_question, ExtractionTransport, LlmTransport,
};
use crate::session::CancelToken;
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Files that make up one run. Each entry is a local path or HTTP/HTTPS URL.
#[derive(Debug, Clone, Default)]
pub struct SheetInputs {
    pub exam: String,
    pub solution: Option<String>,
    pub logo: Option<String>,
}

impl SheetInputs {
    pub fn new(exam: impl Into<String>) -> Self {
        Self {
            exam: exam.into(),
            ..Default::default()
        }
    }

    pub fn solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    pub fn logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }
}

/// Validated inputs with their model attachments.
#[derive(Debug)]
pub struct PreparedInputs {
    pub exam: InputFile,
    pub exam_images: Vec<ImageData>,
    pub solution_images: Vec<ImageData>,
    /// Footer logo, already re-encoded as PNG.
    pub logo_png: Option<Vec<u8>>,
}

/// Load, validate and encode every input file.
pub async fn prepare_inputs(
    inputs: &SheetInputs,
    config: &SheetConfig,
) -> Result<PreparedInputs, SheetError> {
    let exam = load_input(&inputs.exam, config.max_file_bytes, config.download_timeout_secs).await?;
    let solution = match &inputs.solution {
        Some(s) => Some(load_input(s, config.max_file_bytes, config.download_timeout_secs).await?),
        None => None,
    };
    let logo_png = match &inputs.logo {
        Some(l) => {
            let file = load_input(l, config.max_file_bytes, config.download_timeout_secs).await?;
            if !file.kind.is_image() {
                return Err(SheetError::UnsupportedFileType {
                    name: file.name,
                    detected: "PDF".into(),
                });
            }
            Some(normalize_logo(&file.bytes)?)
        }
        None => None,
    };

    let exam_images = encode_input(&exam, config).await?;
    let solution_images = match &solution {
        Some(file) => encode_input(file, config).await?,
        None => Vec::new(),
    };
    debug!(
        "Prepared {} exam and {} solution attachments",
        exam_images.len(),
        solution_images.len()
    );

    Ok(PreparedInputs {
        exam,
        exam_images,
        solution_images,
        logo_png,
    })
}

/// Extract and sanitize the selected questions from an exam file.
pub async fn extract(
    inputs: &SheetInputs,
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<ExtractionOutput, SheetError> {
    let prepared = prepare_inputs(inputs, config).await?;
    let transport = LlmTransport::new(resolve_provider(config).await?, config);
    extract_with_transport(
        &transport,
        &prepared.exam_images,
        &prepared.solution_images,
        config,
        cancel,
    )
    .await
}

/// Run the configured extraction strategy over any transport.
pub async fn extract_with_transport<T: ExtractionTransport>(
    transport: &T,
    exam_images: &[ImageData],
    solution_images: &[ImageData],
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<ExtractionOutput, SheetError> {
    let numbers = config.questions.to_numbers();
    info!(
        "Extracting {} question(s) in {:?} mode",
        numbers.len(),
        config.mode
    );

    let output = match config.mode {
        ExtractionMode::Batch => {
            extract_batch(transport, &numbers, exam_images, solution_images, config, cancel).await?
        }
        ExtractionMode::PerQuestion => {
            extract_per_question(transport, &numbers, exam_images, solution_images, config, cancel)
                .await?
        }
    };

    // A result that arrives after cancellation is discarded.
    cancel.check()?;

    if let Some(warning) = output.partial_failure_warning() {
        warn!("{}", warning);
    }
    info!(
        "Extracted {}/{} questions in {} model call(s), {}ms",
        output.stats.extracted_questions,
        output.stats.requested_questions,
        output.stats.model_calls,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Extract questions and typeset the answer-sheet PDF.
pub async fn generate(
    inputs: &SheetInputs,
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<SheetOutput, SheetError> {
    let prepared = prepare_inputs(inputs, config).await?;
    let transport = LlmTransport::new(resolve_provider(config).await?, config);
    let extraction = extract_with_transport(
        &transport,
        &prepared.exam_images,
        &prepared.solution_images,
        config,
        cancel,
    )
    .await?;

    render_sheets(&prepared.exam.stem(), extraction, prepared.logo_png, config).await
}

/// Build the sheet document for already-extracted records.
pub fn build_document(
    exam_stem: &str,
    extraction: &ExtractionOutput,
    logo_png: Option<Vec<u8>>,
) -> AnswerSheetDocument {
    let doc = present(exam_stem, extraction.sorted(), logo_png);
    for warning in doc.warnings() {
        debug!("annotation: {}", warning);
    }
    doc
}

/// Present and export already-extracted records.
pub async fn render_sheets(
    exam_stem: &str,
    extraction: ExtractionOutput,
    logo_png: Option<Vec<u8>>,
    config: &SheetConfig,
) -> Result<SheetOutput, SheetError> {
    let start = Instant::now();
    let doc = build_document(exam_stem, &extraction, logo_png);
    let page_count = doc.sheets.len();
    let exporter = TypstExporter::with_font_files(&config.font_paths)?;

    // Typst compilation is CPU-bound.
    let pdf = tokio::task::spawn_blocking(move || exporter.export(&doc))
        .await
        .map_err(|e| SheetError::Internal(format!("Export task panicked: {}", e)))??;

    info!(
        "Typeset {} sheet(s) → {} bytes in {}ms",
        page_count,
        pdf.len(),
        start.elapsed().as_millis()
    );

    Ok(SheetOutput {
        pdf,
        page_count,
        extraction,
    })
}

/// Generate the PDF and write it to `output_path`.
///
/// The bytes go to a temp file in the destination directory first and are
/// renamed into place, so a failed run never leaves a truncated PDF.
pub async fn generate_to_file(
    inputs: &SheetInputs,
    output_path: impl AsRef<Path>,
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<SheetOutput, SheetError> {
    let output = generate(inputs, config, cancel).await?;
    write_pdf(output_path.as_ref(), &output.pdf).await?;
    Ok(output)
}

/// Atomically write PDF bytes to `path`.
pub async fn write_pdf(path: &Path, pdf: &[u8]) -> Result<(), SheetError> {
    let path = path.to_path_buf();
    let bytes = pdf.to_vec();
    tokio::task::spawn_blocking(move || write_pdf_blocking(&path, &bytes))
        .await
        .map_err(|e| SheetError::Internal(format!("Write task panicked: {}", e)))?
}

fn write_pdf_blocking(path: &Path, bytes: &[u8]) -> Result<(), SheetError> {
    use std::io::Write;

    let write_err = |source: std::io::Error| SheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(inputs: &SheetInputs, config: &SheetConfig) -> Result<SheetOutput, SheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SheetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(inputs, config, &CancelToken::new()))
}

// ── Provider resolution ──────────────────────────────────────────────────

const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SheetError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SheetError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` with `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. [`ProviderFactory::from_env`] auto-detection
pub async fn resolve_provider(config: &SheetConfig) -> Result<Arc<dyn LLMProvider>, SheetError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SheetError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, GEMINI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
