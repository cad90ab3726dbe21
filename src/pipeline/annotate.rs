//! Layout annotation: a sanitised record becomes a tree of tagged spans.
//!
//! The fragment is final: downstream stages only typeset it and never look
//! for `__U__`, `__ANSWER__` or underscore blanks again. The record itself
//! is only borrowed.

use super::rules::{self, AfterBoxRule, ChoiceLayout, PassageRule, QuestionRules};
use crate::model::{Choice, QuestionRecord, SubQuestionRecord, VocabularyItem, CHOICE_MARKERS};
use serde::Serialize;
use tracing::{debug, warn};

/// A run of text with one rendering tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Underline(String),
    /// A choice marker glyph kept in front of an underlined span.
    Marker(String),
    /// Answer text placed where the passage had an underscore blank.
    FilledBlank(String),
    /// `(A)` / `(B)` inside a summary sentence.
    SummaryBlank(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Text(s)
            | Span::Underline(s)
            | Span::Marker(s)
            | Span::FilledBlank(s)
            | Span::SummaryBlank(s) => s,
        }
    }
}

/// One `(A)`/`(B)`/`(C)` paragraph of an ordering question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceParagraph {
    pub marker: Option<String>,
    pub text: String,
}

/// One option line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceItem {
    pub marker: String,
    pub text: String,
    /// Right-hand column for two-column layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<String>,
}

/// A list of options plus how to lay them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceBlock {
    pub layout: ChoiceLayout,
    /// Column headings for two-column layouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<(String, String)>,
    pub items: Vec<ChoiceItem>,
}

/// One visual block of the question column, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Block {
    Prompt { spans: Vec<Span> },
    Boxed { spans: Vec<Span> },
    Passage { spans: Vec<Span> },
    StarredVocabulary { lines: Vec<String> },
    AfterBox { spans: Vec<Span> },
    Sequence { paragraphs: Vec<SequenceParagraph> },
    SummaryArrow,
    SummaryBox { spans: Vec<Span> },
    Choices(ChoiceBlock),
    SubQuestion {
        number: String,
        prompt: String,
        choices: ChoiceBlock,
    },
}

/// Everything needed to typeset one question's sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionFragment {
    pub number: String,
    /// Number as printed ("41~42").
    pub label: String,
    /// Question column.
    pub body: Vec<Block>,
    /// Translation with answer spans underlined; newlines are kept in the text.
    pub translation: Vec<Span>,
    /// "정답: ③", or one line per sub-question for composite groups.
    pub answers: Vec<String>,
    pub vocabulary: Vec<VocabularyItem>,
    /// Entries cut by the per-question vocabulary cap.
    pub vocabulary_omitted: usize,
    /// Rules that could not apply cleanly.
    pub warnings: Vec<String>,
}

/// Annotate one record using the rules for its question number.
pub fn annotate(record: &QuestionRecord) -> QuestionFragment {
    let number = record.question_number.as_str();
    let rules = rules::rules_for(number);
    let mut warnings = Vec::new();

    let body = if record.is_composite() {
        composite_body(record, &rules, &mut warnings)
    } else {
        question_body(record, &rules, &mut warnings)
    };

    let translation = record
        .translation
        .as_deref()
        .map(rules::answer_spans)
        .unwrap_or_default();

    let (vocabulary, vocabulary_omitted) =
        rules::truncate_vocabulary(&record.vocabulary, rules.vocabulary_limit);
    if vocabulary_omitted > 0 {
        debug!(
            "Question {}: showing {} of {} vocabulary entries",
            number,
            vocabulary.len(),
            record.vocabulary.len()
        );
    }

    QuestionFragment {
        number: number.to_string(),
        label: record.display_label(),
        body,
        translation,
        answers: answer_lines(record),
        vocabulary,
        vocabulary_omitted,
        warnings,
    }
}

fn question_body(
    record: &QuestionRecord,
    rules: &QuestionRules,
    warnings: &mut Vec<String>,
) -> Vec<Block> {
    let mut body = Vec::new();

    if let Some(prompt) = non_empty(&record.prompt) {
        let english = if rules.underline_prompt_english {
            non_empty(&record.prompt_english_part)
        } else {
            None
        };
        body.push(Block::Prompt {
            spans: rules::prompt_spans(prompt, english),
        });
    }

    if let Some(boxed) = non_empty(&record.boxed_text) {
        body.push(Block::Boxed {
            spans: rules::plain(boxed),
        });
    }

    if let Some(passage) = passage_block(record, rules, warnings) {
        body.push(passage);
    }

    let starred = starred_block(record);
    let after_box = after_box_block(record, rules);
    if rules.starred_after_main_text {
        body.extend(after_box);
        body.extend(starred);
    } else {
        body.extend(starred);
        body.extend(after_box);
    }

    if let Some(summary) = non_empty(&record.summary_box_text) {
        if rules.summary_arrow {
            body.push(Block::SummaryArrow);
        }
        body.push(Block::SummaryBox {
            spans: rules::summary_blanks(summary),
        });
    }

    if let Some(choices) = record.choices.as_deref().filter(|c| !c.is_empty()) {
        body.push(Block::Choices(choice_block(choices, rules.choices)));
    }

    body
}

/// Shared passage, its starred vocabulary, then each sub-question.
fn composite_body(
    record: &QuestionRecord,
    rules: &QuestionRules,
    warnings: &mut Vec<String>,
) -> Vec<Block> {
    let mut body = Vec::new();
    body.extend(passage_block(record, rules, warnings));
    body.extend(starred_block(record));

    for sub in record.sub_questions.iter().flatten() {
        body.push(sub_question_block(sub));
    }
    body
}

fn sub_question_block(sub: &SubQuestionRecord) -> Block {
    Block::SubQuestion {
        number: sub.question_number.clone(),
        prompt: sub.prompt.clone(),
        choices: choice_block(&sub.choices, rules::sub_question_layout(&sub.question_number)),
    }
}

fn passage_block(
    record: &QuestionRecord,
    rules: &QuestionRules,
    warnings: &mut Vec<String>,
) -> Option<Block> {
    let passage = non_empty(&record.passage)?;
    let number = record.question_number.as_str();

    let spans = match rules.passage {
        PassageRule::BlankFill => match answer_choice_text(record) {
            Some(answer) => rules::fill_blank(passage, answer).unwrap_or_else(|| {
                debug!("Question {}: no blank in passage", number);
                rules::plain(passage)
            }),
            None => {
                let msg = format!(
                    "Question {number}: answer does not select a choice, blank left as is"
                );
                warn!("{}", msg);
                warnings.push(msg);
                rules::plain(passage)
            }
        },
        PassageRule::MultiSpanUnderline => {
            let result = rules::multi_span_underline(passage);
            if !result.is_complete() {
                let msg = format!(
                    "Question {}: expected underlined spans ①–⑤ in order, found [{}]",
                    number,
                    result.markers.join(" ")
                );
                warn!("{}", msg);
                warnings.push(msg);
            }
            result.spans
        }
        PassageRule::LetteredUnderline => rules::lettered_underline(passage),
        PassageRule::MarkedSubstring => non_empty(&record.underlined_text)
            .and_then(|marked| {
                let spans = rules::underline_first(passage, marked, rules.strip_underline_label);
                if spans.is_none() {
                    let msg = format!("Question {number}: underlined text not found in passage");
                    warn!("{}", msg);
                    warnings.push(msg);
                }
                spans
            })
            .unwrap_or_else(|| rules::plain(passage)),
    };

    Some(Block::Passage { spans })
}

fn starred_block(record: &QuestionRecord) -> Option<Block> {
    let lines = rules::starred_lines(non_empty(&record.starred_vocabulary)?);
    if lines.is_empty() {
        None
    } else {
        Some(Block::StarredVocabulary { lines })
    }
}

fn after_box_block(record: &QuestionRecord, rules: &QuestionRules) -> Option<Block> {
    let text = non_empty(&record.main_text_after_box)?;
    match rules.after_box {
        AfterBoxRule::Hidden => None,
        AfterBoxRule::Plain => Some(Block::AfterBox {
            spans: rules::plain(text),
        }),
        AfterBoxRule::Sequence => {
            let cleaned = match non_empty(&record.starred_vocabulary) {
                Some(starred) => text.replacen(starred, "", 1),
                None => text.to_string(),
            };
            Some(Block::Sequence {
                paragraphs: rules::sequence_paragraphs(cleaned.trim()),
            })
        }
    }
}

fn choice_block(choices: &[Choice], layout: ChoiceLayout) -> ChoiceBlock {
    let items = choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let marker = choice_marker(i);
            if layout == ChoiceLayout::TwoColumn {
                let (left, right) = rules::two_columns(&choice.text);
                ChoiceItem {
                    marker,
                    text: left,
                    second: Some(right),
                }
            } else {
                ChoiceItem {
                    marker,
                    text: choice.text.clone(),
                    second: None,
                }
            }
        })
        .collect();

    let header = (layout == ChoiceLayout::TwoColumn).then(|| ("(A)".to_string(), "(B)".to_string()));

    ChoiceBlock {
        layout,
        header,
        items,
    }
}

fn choice_marker(index: usize) -> String {
    CHOICE_MARKERS
        .get(index)
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("({})", index + 1))
}

/// Text of the choice the answer glyph points at.
fn answer_choice_text(record: &QuestionRecord) -> Option<&str> {
    let index = record.answer_index()?;
    record
        .choices
        .as_ref()?
        .get(index)
        .map(|c| c.text.as_str())
}

fn answer_lines(record: &QuestionRecord) -> Vec<String> {
    match &record.sub_questions {
        Some(subs) if !subs.is_empty() => subs
            .iter()
            .map(|s| format!("{}번 정답: {}", s.question_number, s.answer))
            .collect(),
        _ => vec![format!(
            "정답: {}",
            record.answer.as_deref().unwrap_or_default()
        )],
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}
