//! Presentation: annotated fragments become printable answer sheets.
//!
//! One [`Sheet`] per question. Each sheet has a header (title and blank
//! student fields), a question column built from the fragment's blocks, an
//! analysis column (translation, answer, vocabulary) and an optional logo
//! footer. The same tree feeds the PDF exporter and the plain-text preview.

use super::annotate::{annotate, Block, ChoiceBlock, QuestionFragment, Span};
use super::rules::ChoiceLayout;
use crate::model::QuestionRecord;
use std::fmt::Write as _;

pub const TRANSLATION_HEADING: &str = "해석";
pub const VOCABULARY_HEADING: &str = "어휘 및 어구";
pub const STUDENT_NUMBER_LABEL: &str = "학번";
pub const STUDENT_NAME_LABEL: &str = "이름";

/// Title printed on every sheet: the exam name with 문제지 → 해설지.
pub fn sheet_title(exam_stem: &str) -> String {
    exam_stem.replacen("문제지", "해설지", 1)
}

/// Default PDF file name for an exam file stem.
pub fn output_file_name(exam_stem: &str) -> String {
    format!("{exam_stem}_해설지.pdf")
}

/// One printed page.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub title: String,
    pub question: QuestionFragment,
    /// Whether the footer carries the document logo.
    pub logo: bool,
}

/// All sheets of one run, in display order.
#[derive(Debug, Clone)]
pub struct AnswerSheetDocument {
    pub title: String,
    pub sheets: Vec<Sheet>,
    /// PNG bytes of the footer logo.
    pub logo_png: Option<Vec<u8>>,
}

impl AnswerSheetDocument {
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Annotation warnings of every sheet; each names its question.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.sheets
            .iter()
            .flat_map(|s| s.question.warnings.iter().map(String::as_str))
    }
}

/// Build the document from records already in display order.
pub fn present<'a>(
    exam_stem: &str,
    records: impl IntoIterator<Item = &'a QuestionRecord>,
    logo_png: Option<Vec<u8>>,
) -> AnswerSheetDocument {
    let title = sheet_title(exam_stem);
    let has_logo = logo_png.is_some();
    let sheets = records
        .into_iter()
        .map(|record| Sheet {
            title: title.clone(),
            question: annotate(record),
            logo: has_logo,
        })
        .collect();

    AnswerSheetDocument {
        title,
        sheets,
        logo_png,
    }
}

// ── Text preview ─────────────────────────────────────────────────────────

/// Plain-text rendering of the document for a terminal.
///
/// Underlined runs are shown as `[text]`, filled blanks as `[[text]]`.
pub fn render_preview(doc: &AnswerSheetDocument) -> String {
    let mut out = String::new();
    for (i, sheet) in doc.sheets.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        preview_sheet(&mut out, sheet);
    }
    out
}

fn preview_sheet(out: &mut String, sheet: &Sheet) {
    let q = &sheet.question;
    let _ = writeln!(
        out,
        "==== {} ==== {} (      ) {} (      )",
        sheet.title, STUDENT_NUMBER_LABEL, STUDENT_NAME_LABEL
    );
    let _ = writeln!(out, "{}", q.label);

    for block in &q.body {
        preview_block(out, block);
    }

    let _ = writeln!(out, "\n-- {TRANSLATION_HEADING} --");
    let _ = writeln!(out, "{}", spans_text(&q.translation));
    for answer in &q.answers {
        let _ = writeln!(out, "{answer}");
    }

    let _ = writeln!(out, "-- {VOCABULARY_HEADING} --");
    for item in &q.vocabulary {
        let _ = writeln!(out, "{} - {}", item.word, item.meaning);
    }
    if sheet.logo {
        let _ = writeln!(out, "[logo]");
    }
}

fn preview_block(out: &mut String, block: &Block) {
    match block {
        Block::Prompt { spans } | Block::Passage { spans } | Block::AfterBox { spans } => {
            let _ = writeln!(out, "{}", spans_text(spans));
        }
        Block::Boxed { spans } | Block::SummaryBox { spans } => {
            let _ = writeln!(out, "┌\n{}\n└", spans_text(spans));
        }
        Block::StarredVocabulary { lines } => {
            for line in lines {
                let _ = writeln!(out, "{line}");
            }
        }
        Block::Sequence { paragraphs } => {
            for p in paragraphs {
                match &p.marker {
                    Some(m) => {
                        let _ = writeln!(out, "{m} {}", p.text);
                    }
                    None => {
                        let _ = writeln!(out, "{}", p.text);
                    }
                }
            }
        }
        Block::SummaryArrow => {
            let _ = writeln!(out, "↓");
        }
        Block::Choices(choices) => preview_choices(out, choices),
        Block::SubQuestion {
            number,
            prompt,
            choices,
        } => {
            let _ = writeln!(out, "{number}. {prompt}");
            preview_choices(out, choices);
        }
    }
}

fn preview_choices(out: &mut String, block: &ChoiceBlock) {
    if let Some((a, b)) = &block.header {
        let _ = writeln!(out, "    {a:<20}{b}");
    }
    match block.layout {
        ChoiceLayout::Horizontal => {
            let line: Vec<String> = block
                .items
                .iter()
                .map(|c| format!("{} {}", c.marker, c.text))
                .collect();
            let _ = writeln!(out, "{}", line.join("   "));
        }
        _ => {
            for item in &block.items {
                match &item.second {
                    Some(second) => {
                        let _ = writeln!(out, "{} {:<20}{}", item.marker, item.text, second);
                    }
                    None => {
                        let _ = writeln!(out, "{} {}", item.marker, item.text);
                    }
                }
            }
        }
    }
}

fn spans_text(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Text(t) | Span::SummaryBlank(t) => t.clone(),
            Span::Underline(t) => format!("[{t}]"),
            Span::Marker(m) => format!("{m} "),
            Span::FilledBlank(t) => format!("[[{t}]]"),
        })
        .collect()
}
