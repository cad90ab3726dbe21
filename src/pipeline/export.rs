//! PDF export: answer sheets → Typst markup → PDF bytes.
//!
//! Every piece of extracted text enters the markup as a Typst string
//! literal (`#"..."`), never as raw markup, so characters like `*`, `_`,
//! `#` or `$` in a passage cannot change the formatting. Newlines become
//! explicit `#linebreak()` calls.
//!
//! Typst needs fonts with Hangul coverage to typeset the Korean parts;
//! supply them via [`TypstExporter::with_font_files`].

use super::annotate::{Block, ChoiceBlock, QuestionFragment, SequenceParagraph, Span};
use super::present::{
    AnswerSheetDocument, Sheet, STUDENT_NAME_LABEL, STUDENT_NUMBER_LABEL, TRANSLATION_HEADING,
    VOCABULARY_HEADING,
};
use super::rules::ChoiceLayout;
use crate::error::SheetError;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::debug;
use typst_as_lib::TypstEngine;

/// Virtual path the logo is served under.
const LOGO_PATH: &str = "logo.png";

/// Turns a finished document into PDF bytes.
pub trait SheetExporter: Send + Sync {
    fn export(&self, doc: &AnswerSheetDocument) -> Result<Vec<u8>, SheetError>;
}

/// [`SheetExporter`] backed by an embedded Typst compiler.
#[derive(Default, Clone)]
pub struct TypstExporter {
    fonts: Vec<Vec<u8>>,
}

impl std::fmt::Debug for TypstExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypstExporter")
            .field("fonts", &self.fonts.len())
            .finish()
    }
}

impl TypstExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load font files (TTF/OTF/TTC) into memory.
    pub fn with_font_files(paths: &[PathBuf]) -> Result<Self, SheetError> {
        let mut fonts = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = std::fs::read(path).map_err(|e| SheetError::FontLoadFailed {
                path: path.clone(),
                source: e,
            })?;
            debug!("Loaded font {} ({} bytes)", path.display(), bytes.len());
            fonts.push(bytes);
        }
        Ok(Self { fonts })
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }
}

impl SheetExporter for TypstExporter {
    fn export(&self, doc: &AnswerSheetDocument) -> Result<Vec<u8>, SheetError> {
        if doc.is_empty() {
            return Err(SheetError::ExportFailed("document has no sheets".into()));
        }

        let markup = to_markup(doc);
        debug!(
            "Typst markup: {} sheets, {} bytes, {} fonts",
            doc.sheets.len(),
            markup.len(),
            self.fonts.len()
        );

        let mut builder = TypstEngine::builder()
            .main_file(markup)
            .fonts(self.fonts.clone());
        if let Some(logo) = &doc.logo_png {
            builder = builder.with_static_file_resolver([(LOGO_PATH, logo.clone())]);
        }
        let engine = builder.build();

        let document = engine
            .compile()
            .output
            .map_err(|e| SheetError::ExportFailed(format!("typesetting failed: {e:?}")))?;

        let pdf = typst_pdf::pdf(&document, &typst_pdf::PdfOptions::default())
            .map_err(|e| SheetError::ExportFailed(format!("PDF generation failed: {e:?}")))?;

        Ok(pdf.into())
    }
}

// ── Markup generation ────────────────────────────────────────────────────

/// Full Typst source for the document.
pub fn to_markup(doc: &AnswerSheetDocument) -> String {
    let mut out = String::new();
    out.push_str("#set page(paper: \"a4\", margin: (x: 1.4cm, top: 1.4cm, bottom: 1.8cm)");
    if doc.logo_png.is_some() {
        let _ = write!(
            out,
            ", footer: align(right, image(\"{LOGO_PATH}\", height: 0.9cm))"
        );
    }
    out.push_str(")\n");
    out.push_str("#set text(size: 9.5pt, lang: \"ko\")\n");
    out.push_str("#set par(justify: true, leading: 0.6em)\n\n");

    for (i, sheet) in doc.sheets.iter().enumerate() {
        if i > 0 {
            out.push_str("\n#pagebreak()\n\n");
        }
        sheet_markup(&mut out, sheet);
    }
    out
}

fn sheet_markup(out: &mut String, sheet: &Sheet) {
    let blanks = "\u{00a0}".repeat(14);
    let _ = writeln!(
        out,
        "#grid(columns: (1fr, auto), align: (left + horizon, right + horizon), \
         text(size: 14pt, weight: \"bold\", {}), {})",
        lit(&sheet.title),
        lit(&format!(
            "{STUDENT_NUMBER_LABEL} ({blanks}) {STUDENT_NAME_LABEL} ({blanks})"
        )),
    );
    out.push_str("#line(length: 100%, stroke: 0.8pt)\n\n");

    out.push_str("#grid(columns: (3fr, 2fr), column-gutter: 0.7cm,\n[\n");
    question_column(out, &sheet.question);
    out.push_str("],\n[\n");
    analysis_column(out, &sheet.question);
    out.push_str("])\n");
}

fn question_column(out: &mut String, q: &QuestionFragment) {
    let _ = writeln!(out, "#text(size: 16pt, weight: \"bold\", {})\n", lit(&q.label));
    for block in &q.body {
        block_markup(out, block);
        out.push('\n');
    }
}

fn analysis_column(out: &mut String, q: &QuestionFragment) {
    let _ = writeln!(out, "#text(size: 11pt, weight: \"bold\", {})\n", lit(TRANSLATION_HEADING));
    let _ = writeln!(out, "#block(width: 100%)[{}]\n", inline(&q.translation));
    for answer in &q.answers {
        let _ = writeln!(out, "#strong({})\n", lit(answer));
    }
    let _ = writeln!(out, "#text(size: 10pt, weight: \"bold\", {})\n", lit(VOCABULARY_HEADING));
    out.push_str("#text(size: 8.5pt)[");
    for (i, item) in q.vocabulary.iter().enumerate() {
        if i > 0 {
            out.push_str("#linebreak()");
        }
        out.push_str(&text_lit(&format!("{} - {}", item.word, item.meaning)));
    }
    out.push_str("]\n");
}

fn block_markup(out: &mut String, block: &Block) {
    match block {
        Block::Prompt { spans } => {
            let _ = writeln!(out, "#text(weight: \"bold\")[{}]", inline(spans));
        }
        Block::Passage { spans } | Block::AfterBox { spans } => {
            let _ = writeln!(out, "#block(width: 100%)[{}]", inline(spans));
        }
        Block::Boxed { spans } | Block::SummaryBox { spans } => {
            let _ = writeln!(
                out,
                "#block(width: 100%, stroke: 0.6pt, inset: 7pt)[{}]",
                inline(spans)
            );
        }
        Block::StarredVocabulary { lines } => {
            let body: Vec<String> = lines.iter().map(|l| text_lit(l)).collect();
            let _ = writeln!(out, "#text(size: 8pt)[{}]", body.join("#linebreak()"));
        }
        Block::Sequence { paragraphs } => {
            for p in paragraphs {
                let _ = writeln!(out, "#pad(left: 1.2em)[{}]", sequence_paragraph(p));
            }
        }
        Block::SummaryArrow => {
            let _ = writeln!(out, "#align(center, text(size: 14pt, {}))", lit("↓"));
        }
        Block::Choices(choices) => choices_markup(out, choices),
        Block::SubQuestion {
            number,
            prompt,
            choices,
        } => {
            let _ = writeln!(out, "#strong({})\n", lit(&format!("{number}. {prompt}")));
            choices_markup(out, choices);
        }
    }
}

fn sequence_paragraph(p: &SequenceParagraph) -> String {
    match &p.marker {
        Some(m) => format!("{}{}", text_lit(&format!("{m} ")), text_lit(&p.text)),
        None => text_lit(&p.text),
    }
}

fn choices_markup(out: &mut String, block: &ChoiceBlock) {
    match block.layout {
        ChoiceLayout::List => {
            for item in &block.items {
                let _ = writeln!(out, "{}#linebreak()", text_lit(&choice_text(&item.marker, &item.text)));
            }
        }
        ChoiceLayout::Sequence | ChoiceLayout::Horizontal => {
            let columns = if block.layout == ChoiceLayout::Horizontal {
                block.items.len().max(1)
            } else {
                3
            };
            let cells: Vec<String> = block
                .items
                .iter()
                .map(|c| lit(&choice_text(&c.marker, &c.text)))
                .collect();
            let _ = writeln!(
                out,
                "#grid(columns: {columns}, column-gutter: 1.2em, row-gutter: 0.6em, {})",
                cells.join(", ")
            );
        }
        ChoiceLayout::TwoColumn => {
            let mut cells = Vec::new();
            if let Some((a, b)) = &block.header {
                cells.push("[]".to_string());
                cells.push(format!("strong({})", lit(a)));
                cells.push(format!("strong({})", lit(b)));
            }
            for item in &block.items {
                cells.push(lit(&item.marker));
                cells.push(lit(&item.text));
                cells.push(lit(item.second.as_deref().unwrap_or_default()));
            }
            let _ = writeln!(
                out,
                "#grid(columns: (auto, 1fr, 1fr), column-gutter: 1em, row-gutter: 0.5em, {})",
                cells.join(", ")
            );
        }
    }
}

fn choice_text(marker: &str, text: &str) -> String {
    format!("{marker} {text}")
}

/// Spans as markup-mode content.
fn inline(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Text(t) => out.push_str(&text_lit(t)),
            Span::Marker(m) => out.push_str(&text_lit(&format!("{m} "))),
            Span::Underline(t) => {
                let _ = write!(out, "#underline({})", lit(t));
            }
            Span::FilledBlank(t) => {
                let _ = write!(
                    out,
                    "#box(stroke: (bottom: 0.6pt), inset: (x: 3pt, bottom: 2pt), strong({}))",
                    lit(t)
                );
            }
            Span::SummaryBlank(t) => {
                let _ = write!(
                    out,
                    "#box(stroke: 0.6pt, inset: (x: 3pt, y: 2pt), {})",
                    lit(t)
                );
            }
        }
    }
    out
}

/// Markup-mode text: one `#"..."` per line, joined by `#linebreak()`.
fn text_lit(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("#{}", lit(line)))
        .collect::<Vec<_>>()
        .join("#linebreak()")
}

/// A Typst string literal (code mode). Newlines are escaped.
fn lit(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
