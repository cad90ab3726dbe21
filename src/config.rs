//! Configuration types for exam-sheet generation.
//!
//! All behaviour is controlled through [`SheetConfig`], built via its
//! [`SheetConfigBuilder`]. The model provider is part of the config rather
//! than read ad hoc from the environment, so tests can hand in a fake and
//! two runs can be diffed knob by knob.

use crate::error::SheetError;
use crate::model::{is_known_question, KNOWN_QUESTIONS};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one extraction run and the sheets it produces.
///
/// # Example
/// ```rust
/// use edgequake_exam2sheet::{ExtractionMode, QuestionSelection, SheetConfig};
///
/// let config = SheetConfig::builder()
///     .questions(QuestionSelection::List(vec!["18".into(), "32".into()]))
///     .mode(ExtractionMode::PerQuestion)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SheetConfig {
    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "anthropic").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 16384.
    ///
    /// A batch of twenty questions with translations and vocabulary lists
    /// easily exceeds 8 000 output tokens.
    pub max_tokens: usize,

    /// Total attempts per request, first call included. Default: 3.
    pub max_attempts: u32,

    /// Wait before the second attempt, in milliseconds. Doubles afterwards.
    /// Default: 2000 (2 s, then 4 s).
    pub retry_backoff_ms: u64,

    /// One request for everything, or one request per question.
    pub mode: ExtractionMode,

    /// Fixed pause between per-question requests. Default: 1500 ms.
    pub inter_call_delay_ms: u64,

    /// Which question numbers to extract. Default: all known numbers.
    pub questions: QuestionSelection,

    /// DPI used when rasterising PDF inputs. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Longest edge of a rasterised page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted inputs.
    pub password: Option<String>,

    /// Largest accepted input file in bytes. Default: 10 MiB.
    pub max_file_bytes: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom instruction text. If None, the built-in instruction is used.
    pub system_prompt: Option<String>,

    /// Font files made available to the typesetter.
    pub font_paths: Vec<PathBuf>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 16384,
            max_attempts: 3,
            retry_backoff_ms: 2000,
            mode: ExtractionMode::default(),
            inter_call_delay_ms: 1500,
            questions: QuestionSelection::default(),
            dpi: 150,
            max_rendered_pixels: 2000,
            password: None,
            max_file_bytes: 10 * 1024 * 1024,
            download_timeout_secs: 120,
            system_prompt: None,
            font_paths: Vec::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("mode", &self.mode)
            .field("inter_call_delay_ms", &self.inter_call_delay_ms)
            .field("questions", &self.questions)
            .field("dpi", &self.dpi)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("font_paths", &self.font_paths)
            .finish()
    }
}

impl SheetConfig {
    /// Create a new builder for `SheetConfig`.
    pub fn builder() -> SheetConfigBuilder {
        SheetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Backoff before the given 0-based attempt (none before the first).
    pub fn backoff_before(&self, attempt: u32) -> Option<u64> {
        if attempt == 0 {
            None
        } else {
            Some(self.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(20)))
        }
    }
}

/// Builder for [`SheetConfig`].
#[derive(Debug)]
pub struct SheetConfigBuilder {
    config: SheetConfig,
}

impl SheetConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn inter_call_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_call_delay_ms = ms;
        self
    }

    pub fn questions(mut self, selection: QuestionSelection) -> Self {
        self.config.questions = selection;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_paths.push(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SheetConfig, SheetError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(SheetError::InvalidConfig(
                "max_file_bytes must be > 0".into(),
            ));
        }
        if let QuestionSelection::List(list) = &c.questions {
            if list.is_empty() {
                return Err(SheetError::InvalidConfig(
                    "Select at least one question".into(),
                ));
            }
            if let Some(unknown) = list.iter().find(|q| !is_known_question(q)) {
                return Err(SheetError::InvalidConfig(format!(
                    "Unknown question number '{}'. Known: {}",
                    unknown,
                    KNOWN_QUESTIONS.join(", ")
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the selected questions are requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// One request returning an array with every selected question. (default)
    #[default]
    Batch,
    /// One request per question, sequential, with `inter_call_delay_ms`
    /// between calls. Failures are collected instead of aborting the run.
    PerQuestion,
}

/// Which question numbers to extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum QuestionSelection {
    /// Every known question number (default).
    #[default]
    All,
    /// An explicit list; order is irrelevant, duplicates are ignored.
    List(Vec<String>),
}

impl QuestionSelection {
    /// Expand into known question numbers in display order, deduplicated.
    pub fn to_numbers(&self) -> Vec<String> {
        match self {
            QuestionSelection::All => KNOWN_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            QuestionSelection::List(list) => KNOWN_QUESTIONS
                .iter()
                .filter(|known| list.iter().any(|q| q == *known))
                .map(|q| q.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = SheetConfig::default();
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_backoff_ms, 2000);
        assert_eq!(c.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(c.mode, ExtractionMode::Batch);
    }

    #[test]
    fn backoff_doubles_from_base() {
        let c = SheetConfig::default();
        assert_eq!(c.backoff_before(0), None);
        assert_eq!(c.backoff_before(1), Some(2000));
        assert_eq!(c.backoff_before(2), Some(4000));
    }

    #[test]
    fn unknown_question_rejected() {
        let err = SheetConfig::builder()
            .questions(QuestionSelection::List(vec!["25".into()]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'25'"));
    }

    #[test]
    fn empty_selection_rejected() {
        assert!(SheetConfig::builder()
            .questions(QuestionSelection::List(vec![]))
            .build()
            .is_err());
    }

    #[test]
    fn selection_sorted_and_deduplicated() {
        let sel = QuestionSelection::List(vec!["41-42".into(), "18".into(), "18".into()]);
        assert_eq!(sel.to_numbers(), vec!["18", "41-42"]);
        assert_eq!(QuestionSelection::All.to_numbers().len(), 20);
    }

    #[test]
    fn max_attempts_never_zero() {
        let c = SheetConfig::builder().max_attempts(0).build().unwrap();
        assert_eq!(c.max_attempts, 1);
    }
}
