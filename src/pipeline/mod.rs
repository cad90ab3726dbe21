//! Pipeline stages for exam-to-answer-sheet generation.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Only [`transport`] touches the network, only [`render`] touches
//! pdfium, and only [`export`] touches the typesetter.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ transport ──▶ sanitize ──▶ annotate ──▶ present ──▶ export
//! (path/URL) (pages)    (VLM+retry)   (records)    (rules)      (sheets)    (PDF)
//! ```
//!
//! 1. [`input`]     — load and validate the exam/solution files
//! 2. [`render`]    — rasterise PDF pages in `spawn_blocking`
//! 3. [`encode`]    — base64 attachments for the multimodal request
//! 4. [`transport`] — model calls with retry, backoff and cancellation
//! 5. [`sanitize`]  — coerce loosely-typed JSON into [`crate::model::QuestionRecord`]s
//! 6. [`rules`] / [`annotate`] — per-question layout rules
//! 7. [`present`]   — one printable sheet per question
//! 8. [`export`]    — Typst markup compiled to PDF

pub mod annotate;
pub mod encode;
pub mod export;
pub mod input;
pub mod present;
pub mod render;
pub mod rules;
pub mod sanitize;
pub mod transport;
