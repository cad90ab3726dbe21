//! # edgequake-exam2sheet
//!
//! Turn scanned English exam papers into printable answer/explanation sheets
//! using Vision Language Models (VLMs).
//!
//! The model reads the exam (and, optionally, its solution sheet) and returns
//! structured question data: prompt, passage, options, answer, a Korean
//! translation and a vocabulary list. That loosely-typed JSON is sanitized
//! into [`QuestionRecord`]s, annotated with per-question layout rules
//! (underlines, filled blanks, ordering paragraphs, summary boxes) and
//! typeset into one A4 sheet per question.
//!
//! ## Pipeline Overview
//!
//! ```text
//! exam (+ solution, logo)
//!  │
//!  ├─ 1. Input      local file or URL, type sniffed, 10 MB limit
//!  ├─ 2. Encode     PDF pages rasterised via pdfium, images passed through
//!  ├─ 3. Transport  one batch request or one request per question, with retry
//!  ├─ 4. Sanitize   coerce and drop malformed fields, never fails
//!  ├─ 5. Annotate   question-number rules → styled blocks
//!  ├─ 6. Present    header, question column, analysis column, footer
//!  └─ 7. Export     Typst → PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_exam2sheet::{generate_to_file, CancelToken, SheetConfig, SheetInputs};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = SheetConfig::builder()
//!         .font_path("fonts/NotoSansKR-Regular.ttf")
//!         .build()?;
//!     let inputs = SheetInputs::new("2024 모의고사 문제지.pdf").solution("정답.pdf");
//!     let out = generate_to_file(&inputs, "2024 모의고사 해설지.pdf", &config, &CancelToken::new()).await?;
//!     eprintln!("{} sheets, {} model calls", out.page_count, out.extraction.stats.model_calls);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `exam2sheet` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionMode, QuestionSelection, SheetConfig, SheetConfigBuilder};
pub use error::{QuestionError, SheetError};
pub use generate::{
    extract, extract_with_transport, generate, generate_sync, generate_to_file, render_sheets,
    SheetInputs,
};
pub use model::{Choice, QuestionRecord, SubQuestionRecord, VocabularyItem};
pub use output::{ExtractionOutput, RunStats, SheetOutput};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{CancelToken, ExtractionSession, RunState};
