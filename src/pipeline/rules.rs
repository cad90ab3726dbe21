//! Per-question formatting rules.
//!
//! [`rules_for`] is the single place that knows which question number gets
//! which treatment. Everything else in this module is a pure text function
//! that turns a string into [`Span`]s and falls back to the raw text when
//! its pattern is absent.
//!
//! | Number(s)         | Passage            | After box | Choices    | Vocab cap |
//! |-------------------|--------------------|-----------|------------|-----------|
//! | 18, 19, 20        | marked substring   | plain     | list       | 35        |
//! | 21                | marked substring * | plain     | list       | 25        |
//! | 22, 23, 24        | marked substring   | plain     | list       | 25        |
//! | 29, 30            | multi-span         | plain     | list       | 22        |
//! | 31                | marked substring   | hidden    | list       | 18        |
//! | 32, 33, 34        | blank fill         | hidden    | list       | 18        |
//! | 35, 39            | marked substring   | plain     | list       | 22        |
//! | 36, 37            | marked substring   | sequence  | sequence   | 18        |
//! | 38                | marked substring   | plain     | list       | 18        |
//! | 40                | marked substring   | plain     | two-column | 12        |
//! | 41-42             | lettered underline | plain     | list       | 12        |
//!
//! `*` question 21 also underlines `promptEnglishPart` in the prompt and
//! strips a stray `underlinedText:` label before the underlined span.

use super::annotate::{SequenceParagraph, Span};
use crate::model::{VocabularyItem, CHOICE_MARKERS};
use once_cell::sync::Lazy;
use regex::Regex;

/// Cue words underlined in every prompt.
pub const PROMPT_CUE_WORDS: [&str; 3] = ["틀린", "않는", "없는"];

/// Default vocabulary cap for numbers without a specific entry.
pub const DEFAULT_VOCABULARY_LIMIT: usize = 25;

// ── Dispatch table ───────────────────────────────────────────────────────

/// How the passage is annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassageRule {
    /// Underline the first occurrence of `underlinedText`, if any.
    MarkedSubstring,
    /// `①__U__word__U__` spans, one per choice marker.
    MultiSpanUnderline,
    /// Replace the underscore run with the answer choice's text.
    BlankFill,
    /// Underline the word after each `(a)`…`(e)`.
    LetteredUnderline,
}

/// What happens to `mainTextAfterBox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterBoxRule {
    Plain,
    Hidden,
    /// Split into `(A)`/`(B)`/`(C)` paragraphs.
    Sequence,
}

/// Layout of the multiple-choice list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceLayout {
    List,
    /// Ordering questions: "(A)-(C)-(B)" style options.
    Sequence,
    /// Summary question: `(A)` word and `(B)` word in two columns.
    TwoColumn,
    /// Short options laid out on one line.
    Horizontal,
}

/// Everything the annotator needs to know about one question number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionRules {
    pub passage: PassageRule,
    pub after_box: AfterBoxRule,
    pub choices: ChoiceLayout,
    pub vocabulary_limit: usize,
    /// Underline `promptEnglishPart` inside the prompt.
    pub underline_prompt_english: bool,
    /// Remove a trailing `underlinedText:` label before the underlined span.
    pub strip_underline_label: bool,
    /// Starred vocabulary goes after the text-after-box instead of before it.
    pub starred_after_main_text: bool,
    /// Draw an arrow before the summary box.
    pub summary_arrow: bool,
}

impl Default for QuestionRules {
    fn default() -> Self {
        Self {
            passage: PassageRule::MarkedSubstring,
            after_box: AfterBoxRule::Plain,
            choices: ChoiceLayout::List,
            vocabulary_limit: DEFAULT_VOCABULARY_LIMIT,
            underline_prompt_english: false,
            strip_underline_label: false,
            starred_after_main_text: false,
            summary_arrow: false,
        }
    }
}

/// Look up the rules for a question number. Unknown numbers get defaults.
pub fn rules_for(number: &str) -> QuestionRules {
    let base = QuestionRules {
        vocabulary_limit: vocabulary_limit(number),
        ..QuestionRules::default()
    };
    match number {
        "21" => QuestionRules {
            underline_prompt_english: true,
            strip_underline_label: true,
            ..base
        },
        "29" | "30" => QuestionRules {
            passage: PassageRule::MultiSpanUnderline,
            ..base
        },
        "31" => QuestionRules {
            after_box: AfterBoxRule::Hidden,
            ..base
        },
        "32" | "33" | "34" => QuestionRules {
            passage: PassageRule::BlankFill,
            after_box: AfterBoxRule::Hidden,
            ..base
        },
        "36" | "37" => QuestionRules {
            after_box: AfterBoxRule::Sequence,
            choices: ChoiceLayout::Sequence,
            starred_after_main_text: true,
            ..base
        },
        "40" => QuestionRules {
            choices: ChoiceLayout::TwoColumn,
            summary_arrow: true,
            ..base
        },
        "41-42" => QuestionRules {
            passage: PassageRule::LetteredUnderline,
            ..base
        },
        _ => base,
    }
}

/// Choice layout for a sub-question of a composite group.
pub fn sub_question_layout(number: &str) -> ChoiceLayout {
    if number.trim() == "42" {
        ChoiceLayout::Horizontal
    } else {
        ChoiceLayout::List
    }
}

/// Displayed vocabulary cap per question number.
pub fn vocabulary_limit(number: &str) -> usize {
    match number {
        "41-42" | "40" => 12,
        "31" | "32" | "33" | "34" | "36" | "37" | "38" => 18,
        "29" | "30" | "35" | "39" => 22,
        "18" | "19" | "20" => 35,
        _ => DEFAULT_VOCABULARY_LIMIT,
    }
}

// ── Patterns ─────────────────────────────────────────────────────────────

static RE_MARKED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(①|②|③|④|⑤)\s*__U__(.*?)__U__").unwrap());

static RE_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{5,}").unwrap());

static RE_LETTERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\([a-e]\)\s+)(\S+)").unwrap());

static RE_UNDERLINE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?u>").unwrap());

static RE_UNDERLINE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"underlinedText\s*:?\s*$").unwrap());

static RE_SEQUENCE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([A-C]\)").unwrap());

static RE_COLUMN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\.{2,}\s*|\s{2,}").unwrap());

static RE_SUMMARY_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(A\)|\(B\)").unwrap());

static RE_ANSWER_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"__ANSWER__(.*?)__ANSWER__").unwrap());

// ── Span helpers ─────────────────────────────────────────────────────────

fn push_text(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Span::Text(last)) = spans.last_mut() {
        last.push_str(text);
    } else {
        spans.push(Span::Text(text.to_string()));
    }
}

/// The whole text as a single plain span (or nothing for an empty string).
pub fn plain(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    push_text(&mut spans, text);
    spans
}

/// Underline every occurrence of `needle` inside the plain-text spans.
///
/// Spans that are already tagged are left alone, so rules can be chained.
pub fn underline_all(spans: Vec<Span>, needle: &str) -> Vec<Span> {
    if needle.is_empty() {
        return spans;
    }
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Text(text) if text.contains(needle) => {
                let mut parts = text.split(needle).peekable();
                while let Some(part) = parts.next() {
                    push_text(&mut out, part);
                    if parts.peek().is_some() {
                        out.push(Span::Underline(needle.to_string()));
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Prompt emphasis: optional English phrase, then the cue words.
pub fn prompt_spans(prompt: &str, english_part: Option<&str>) -> Vec<Span> {
    let mut spans = plain(prompt);
    if let Some(english) = english_part {
        spans = underline_all(spans, english.trim());
    }
    for cue in PROMPT_CUE_WORDS {
        spans = underline_all(spans, cue);
    }
    spans
}

/// Underline the first occurrence of `marked` (with `<u>` tags removed).
///
/// Returns `None` when the marked text does not occur in `text`.
pub fn underline_first(text: &str, marked: &str, strip_label: bool) -> Option<Vec<Span>> {
    let needle = RE_UNDERLINE_TAG.replace_all(marked, "");
    if needle.is_empty() {
        return None;
    }
    let (before, after) = text.split_once(&*needle)?;
    let before = if strip_label {
        RE_UNDERLINE_LABEL.replace(before, "")
    } else {
        before.into()
    };

    let mut spans = Vec::new();
    push_text(&mut spans, &before);
    spans.push(Span::Underline(needle.into_owned()));
    push_text(&mut spans, after);
    Some(spans)
}

/// Result of the multi-span rule: spans plus how many marked spans were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSpan {
    pub spans: Vec<Span>,
    pub markers: Vec<String>,
}

impl MultiSpan {
    /// True when exactly the five markers ①…⑤ appeared, in order.
    pub fn is_complete(&self) -> bool {
        self.markers.len() == CHOICE_MARKERS.len()
            && self.markers.iter().zip(CHOICE_MARKERS).all(|(m, g)| m == g)
    }
}

/// `"The ①__U__quick__U__ fox"` → Text, Marker(①), Underline(quick), Text.
pub fn multi_span_underline(text: &str) -> MultiSpan {
    let mut spans = Vec::new();
    let mut markers = Vec::new();
    let mut last = 0;

    for caps in RE_MARKED_SPAN.captures_iter(text) {
        let (Some(whole), Some(marker), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        push_text(&mut spans, &text[last..whole.start()]);
        spans.push(Span::Marker(marker.as_str().to_string()));
        spans.push(Span::Underline(inner.as_str().to_string()));
        markers.push(marker.as_str().to_string());
        last = whole.end();
    }
    push_text(&mut spans, &text[last..]);

    MultiSpan { spans, markers }
}

/// Replace every run of five or more underscores with `answer_text`.
///
/// Returns `None` when the passage has no blank.
pub fn fill_blank(passage: &str, answer_text: &str) -> Option<Vec<Span>> {
    if !RE_BLANK.is_match(passage) {
        return None;
    }
    let mut spans = Vec::new();
    let mut last = 0;
    for m in RE_BLANK.find_iter(passage) {
        push_text(&mut spans, &passage[last..m.start()]);
        spans.push(Span::FilledBlank(answer_text.to_string()));
        last = m.end();
    }
    push_text(&mut spans, &passage[last..]);
    Some(spans)
}

/// Underline the word following each `(a)`…`(e)` marker.
pub fn lettered_underline(passage: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in RE_LETTERED.captures_iter(passage) {
        let (Some(whole), Some(prefix), Some(word)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        push_text(&mut spans, &passage[last..whole.start()]);
        push_text(&mut spans, prefix.as_str());
        spans.push(Span::Underline(word.as_str().to_string()));
        last = whole.end();
    }
    push_text(&mut spans, &passage[last..]);
    spans
}

/// Split ordering text into one paragraph per `(A)`/`(B)`/`(C)` marker.
///
/// Text before the first marker becomes an unmarked paragraph; a marker
/// followed directly by another marker (or the end) gets an empty body.
pub fn sequence_paragraphs(text: &str) -> Vec<SequenceParagraph> {
    let mut paragraphs = Vec::new();
    let mut pending: Option<String> = None;
    let mut last = 0;

    fn flush(marker: Option<String>, body: &str, out: &mut Vec<SequenceParagraph>) {
        let body = body.trim();
        if marker.is_some() || !body.is_empty() {
            out.push(SequenceParagraph {
                marker,
                text: body.to_string(),
            });
        }
    }

    for m in RE_SEQUENCE_MARKER.find_iter(text) {
        flush(pending.take(), &text[last..m.start()], &mut paragraphs);
        pending = Some(m.as_str().to_string());
        last = m.end();
    }
    flush(pending, &text[last..], &mut paragraphs);

    paragraphs
}

/// Split a summary choice like `"increase ..... decline"` into two columns.
pub fn two_columns(text: &str) -> (String, String) {
    let mut parts = RE_COLUMN_SPLIT.split(text.trim());
    let left = parts.next().unwrap_or_default().to_string();
    let right = parts.next().unwrap_or_default().to_string();
    (left, right)
}

/// Tag `(A)` and `(B)` inside the summary sentence as blanks.
pub fn summary_blanks(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for m in RE_SUMMARY_BLANK.find_iter(text) {
        push_text(&mut spans, &text[last..m.start()]);
        spans.push(Span::SummaryBlank(m.as_str().to_string()));
        last = m.end();
    }
    push_text(&mut spans, &text[last..]);
    spans
}

/// Underline every `__ANSWER__…__ANSWER__` span of a translation.
pub fn answer_spans(translation: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;
    for caps in RE_ANSWER_SPAN.captures_iter(translation) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_text(&mut spans, &translation[last..whole.start()]);
        spans.push(Span::Underline(inner.as_str().to_string()));
        last = whole.end();
    }
    push_text(&mut spans, &translation[last..]);
    spans
}

/// Non-empty lines, trimmed and prefixed with `* `.
pub fn starred_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("* {l}"))
        .collect()
}

/// Keep the first `limit` entries, in order. Returns how many were cut.
pub fn truncate_vocabulary(items: &[VocabularyItem], limit: usize) -> (Vec<VocabularyItem>, usize) {
    let kept = items.iter().take(limit).cloned().collect();
    (kept, items.len().saturating_sub(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Span {
        Span::Text(s.into())
    }

    fn u(s: &str) -> Span {
        Span::Underline(s.into())
    }

    #[test]
    fn dispatch_table_entries() {
        assert_eq!(rules_for("18"), QuestionRules { vocabulary_limit: 35, ..Default::default() });
        assert_eq!(rules_for("29").passage, PassageRule::MultiSpanUnderline);
        assert_eq!(rules_for("33").passage, PassageRule::BlankFill);
        assert_eq!(rules_for("33").after_box, AfterBoxRule::Hidden);
        assert_eq!(rules_for("31").after_box, AfterBoxRule::Hidden);
        assert_eq!(rules_for("31").passage, PassageRule::MarkedSubstring);
        assert_eq!(rules_for("36").choices, ChoiceLayout::Sequence);
        assert!(rules_for("37").starred_after_main_text);
        assert!(rules_for("40").summary_arrow);
        assert!(rules_for("21").underline_prompt_english);
        assert_eq!(rules_for("41-42").passage, PassageRule::LetteredUnderline);
        assert_eq!(rules_for("99"), QuestionRules::default());
    }

    #[test]
    fn vocabulary_buckets() {
        assert_eq!(vocabulary_limit("19"), 35);
        assert_eq!(vocabulary_limit("40"), 12);
        assert_eq!(vocabulary_limit("41-42"), 12);
        assert_eq!(vocabulary_limit("38"), 18);
        assert_eq!(vocabulary_limit("35"), 22);
        assert_eq!(vocabulary_limit("23"), 25);
    }

    #[test]
    fn prompt_cue_words_underlined() {
        let spans = prompt_spans("밑줄 친 부분 중, 어법상 틀린 것은?", None);
        assert_eq!(spans, vec![t("밑줄 친 부분 중, 어법상 "), u("틀린"), t(" 것은?")]);
    }

    #[test]
    fn prompt_english_part_and_cue_word() {
        let spans = prompt_spans(
            "밑줄 친 a blessing in disguise가 의미하는 바로 적절하지 않는 것은?",
            Some("a blessing in disguise"),
        );
        assert_eq!(
            spans,
            vec![
                t("밑줄 친 "),
                u("a blessing in disguise"),
                t("가 의미하는 바로 적절하지 "),
                u("않는"),
                t(" 것은?"),
            ]
        );
    }

    #[test]
    fn underline_first_only_first_occurrence() {
        let spans = underline_first("go and go", "<u>go</u>", false).unwrap();
        assert_eq!(spans, vec![u("go"), t(" and go")]);
        assert!(underline_first("nothing here", "absent", false).is_none());
    }

    #[test]
    fn underline_label_artifact_stripped() {
        let spans = underline_first("He said underlinedText: hello there", "hello", true).unwrap();
        assert_eq!(spans, vec![t("He said "), u("hello"), t(" there")]);
    }

    #[test]
    fn multi_span_keeps_marker_before_underline() {
        let result = multi_span_underline("The ①__U__quick__U__ fox");
        assert_eq!(
            result.spans,
            vec![t("The "), Span::Marker("①".into()), u("quick"), t(" fox")]
        );
        assert!(!result.is_complete());
    }

    #[test]
    fn multi_span_complete_when_all_five_in_order() {
        let text = "a ① __U__b__U__ c ②__U__d__U__ ③__U__e__U__ ④__U__f__U__ ⑤__U__g__U__.";
        let result = multi_span_underline(text);
        assert!(result.is_complete());
        assert_eq!(result.markers.len(), 5);
    }

    #[test]
    fn multi_span_without_markers_is_raw_text() {
        let result = multi_span_underline("plain passage");
        assert_eq!(result.spans, vec![t("plain passage")]);
    }

    #[test]
    fn blank_filled_with_answer_text() {
        let spans = fill_blank("It was ________ to see.", "blue").unwrap();
        assert_eq!(
            spans,
            vec![t("It was "), Span::FilledBlank("blue".into()), t(" to see.")]
        );
        assert!(fill_blank("It was __ to see.", "blue").is_none());
    }

    #[test]
    fn lettered_words_underlined() {
        let spans = lettered_underline("It (a) rose and (b)  fell.");
        assert_eq!(
            spans,
            vec![t("It (a) "), u("rose"), t(" and (b)  "), u("fell."),]
        );
    }

    #[test]
    fn sequence_pairs_markers_with_text() {
        let paras = sequence_paragraphs("(A) First part. (B) Second part.(C)");
        let got: Vec<(Option<&str>, &str)> = paras
            .iter()
            .map(|p| (p.marker.as_deref(), p.text.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (Some("(A)"), "First part."),
                (Some("(B)"), "Second part."),
                (Some("(C)"), ""),
            ]
        );
    }

    #[test]
    fn sequence_without_markers_is_single_paragraph() {
        let paras = sequence_paragraphs("no markers here");
        assert_eq!(paras.len(), 1);
        assert_eq!(paras[0].marker, None);
    }

    #[test]
    fn two_column_split() {
        assert_eq!(two_columns("increase ..... decline"), ("increase".into(), "decline".into()));
        assert_eq!(two_columns("rise    fall"), ("rise".into(), "fall".into()));
        assert_eq!(two_columns("single"), ("single".into(), String::new()));
    }

    #[test]
    fn summary_blanks_tagged() {
        let spans = summary_blanks("People (A) when they (B).");
        assert_eq!(
            spans,
            vec![
                t("People "),
                Span::SummaryBlank("(A)".into()),
                t(" when they "),
                Span::SummaryBlank("(B)".into()),
                t("."),
            ]
        );
    }

    #[test]
    fn translation_answer_spans() {
        let spans = answer_spans("이 __ANSWER__새로운 발견__ANSWER__은 중요하다.\n요약");
        assert_eq!(spans, vec![t("이 "), u("새로운 발견"), t("은 중요하다.\n요약")]);
        assert_eq!(answer_spans("plain"), vec![t("plain")]);
    }

    #[test]
    fn starred_lines_prefixed() {
        assert_eq!(
            starred_lines("  ubiquitous: 어디에나 있는\n\n  tacit: 암묵적인 "),
            vec!["* ubiquitous: 어디에나 있는", "* tacit: 암묵적인"]
        );
    }

    #[test]
    fn truncation_keeps_prefix() {
        let items: Vec<VocabularyItem> = (0..40)
            .map(|i| VocabularyItem {
                word: format!("w{i}"),
                meaning: format!("m{i}"),
            })
            .collect();
        let (kept, cut) = truncate_vocabulary(&items, vocabulary_limit("18"));
        assert_eq!(kept.len(), 35);
        assert_eq!(cut, 5);
        assert_eq!(kept[0].word, "w0");
        assert_eq!(kept[34].word, "w34");
        let (kept, _) = truncate_vocabulary(&items, vocabulary_limit("40"));
        assert_eq!(kept.len(), 12);
    }
}
