//! Data model for extracted exam questions.
//!
//! A [`QuestionRecord`] is what the sanitizer hands to the annotator: every
//! scalar field is either `None` or a `String`, and every list holds only
//! well-formed entries. Field names follow the camelCase JSON the model is
//! asked to emit, so the same types serialise back to the wire shape.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The five circled-number glyphs that mark multiple-choice options 1–5.
pub const CHOICE_MARKERS: [&str; 5] = ["①", "②", "③", "④", "⑤"];

/// Every question number the generator knows how to lay out, in display order.
pub const KNOWN_QUESTIONS: [&str; 20] = [
    "18", "19", "20", "21", "22", "23", "24", "29", "30", "31", "32", "33", "34", "35", "36",
    "37", "38", "39", "40", "41-42",
];

/// One multiple-choice option. The marker glyph is never part of `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
}

/// One vocabulary entry; list order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub word: String,
    pub meaning: String,
}

/// A nested question inside a composite group such as "41-42".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestionRecord {
    pub question_number: String,
    pub prompt: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub answer: String,
}

/// One exam question's extracted content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub question_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_english_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred_vocabulary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlined_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boxed_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_text_after_box: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_box_text: Option<String>,
    /// `None` for question types without options (29, 30, 35, 38, 39).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_questions: Option<Vec<SubQuestionRecord>>,
}

impl QuestionRecord {
    /// True when the record is a shared-passage group with nested questions.
    pub fn is_composite(&self) -> bool {
        self.sub_questions
            .as_ref()
            .is_some_and(|subs| !subs.is_empty())
    }

    /// The number as printed on the sheet: "41-42" becomes "41~42".
    pub fn display_label(&self) -> String {
        self.question_number.replace('-', "~")
    }

    /// 0-based index of `answer` among [`CHOICE_MARKERS`], if it is a glyph.
    pub fn answer_index(&self) -> Option<usize> {
        let answer = self.answer.as_deref()?.trim();
        CHOICE_MARKERS.iter().position(|m| *m == answer)
    }
}

/// Whether `number` is one of [`KNOWN_QUESTIONS`].
pub fn is_known_question(number: &str) -> bool {
    KNOWN_QUESTIONS.contains(&number)
}

/// Leading integer of a question number ("41-42" → 41).
pub fn leading_number(number: &str) -> Option<u32> {
    let digits: String = number
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Display order: ascending leading integer; unparsable numbers go last.
pub fn compare_question_numbers(a: &str, b: &str) -> Ordering {
    match (leading_number(a), leading_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_label_uses_tilde() {
        let rec = QuestionRecord {
            question_number: "41-42".into(),
            ..Default::default()
        };
        assert_eq!(rec.display_label(), "41~42");
    }

    #[test]
    fn answer_index_only_for_glyphs() {
        let mut rec = QuestionRecord {
            answer: Some("④".into()),
            ..Default::default()
        };
        assert_eq!(rec.answer_index(), Some(3));
        rec.answer = Some("sincere".into());
        assert_eq!(rec.answer_index(), None);
        rec.answer = None;
        assert_eq!(rec.answer_index(), None);
    }

    #[test]
    fn ordering_by_leading_integer() {
        let mut nums = vec!["41-42", "9", "18", "abc", "30"];
        nums.sort_by(|a, b| compare_question_numbers(a, b));
        assert_eq!(nums, vec!["9", "18", "30", "41-42", "abc"]);
    }

    #[test]
    fn camel_case_wire_names() {
        let json = serde_json::json!({
            "questionNumber": "21",
            "promptEnglishPart": "a blessing in disguise",
            "translation": "번역",
            "vocabulary": [{"word": "bless", "meaning": "축복하다"}]
        });
        let rec: QuestionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(rec.prompt_english_part.as_deref(), Some("a blessing in disguise"));
        assert_eq!(rec.vocabulary.len(), 1);
        assert!(rec.choices.is_none());
        assert!(!rec.is_composite());
    }
}
