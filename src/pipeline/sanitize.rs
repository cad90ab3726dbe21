//! Response sanitation: force arbitrary model JSON into [`QuestionRecord`] shape.
//!
//! The model is asked for a schema, but nothing guarantees it obeys. A
//! number where a string belongs, an object in place of a list, or a `null`
//! choice must not abort the run. Every rule here degrades instead of
//! failing:
//!
//! | Input                                    | Result                            |
//! |------------------------------------------|-----------------------------------|
//! | entry that is not an object              | dropped                           |
//! | scalar field that is number/bool/object  | pretty-printed JSON string        |
//! | scalar field that is `null`              | absent                            |
//! | `choices` that is not an array           | empty list                        |
//! | choice that is `null` or not an object   | dropped                           |
//! | choice with missing or `null` `text`     | `"null"`, keeping its position    |
//! | vocabulary entry missing word or meaning | dropped                           |
//! | `null` or non-string `word` / `meaning`  | compact JSON string               |
//!
//! Nothing is invented: a missing translation stays missing. The output is
//! a fixed point, i.e. sanitising an already-sanitised map changes nothing.

use crate::model::QuestionRecord;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Fields that must be a string or absent.
pub const SCALAR_FIELDS: [&str; 11] = [
    "prompt",
    "promptEnglishPart",
    "passage",
    "starredVocabulary",
    "underlinedText",
    "boxedText",
    "mainTextAfterBox",
    "summaryPrompt",
    "summaryBoxText",
    "answer",
    "translation",
];

/// Sanitise a keyed map of raw question values.
///
/// Never fails; worst case the result is empty. The returned map is keyed by
/// each record's own `question_number` (the raw key is used only when the
/// record carries no number at all).
pub fn sanitize(raw: &Map<String, Value>) -> BTreeMap<String, QuestionRecord> {
    let mut out = BTreeMap::new();

    for (key, value) in raw {
        let Some(clean) = sanitize_question(key, value) else {
            continue;
        };
        match serde_json::from_value::<QuestionRecord>(Value::Object(clean)) {
            Ok(record) => {
                if out.contains_key(&record.question_number) {
                    warn!(
                        "Question {}: duplicate entry, keeping the later one",
                        record.question_number
                    );
                }
                out.insert(record.question_number.clone(), record);
            }
            Err(e) => warn!("Question {}: dropped after sanitising: {}", key, e),
        }
    }

    out
}

/// Like [`sanitize`], for a value that may not even be an object.
pub fn sanitize_value(raw: &Value) -> BTreeMap<String, QuestionRecord> {
    match raw {
        Value::Object(map) => sanitize(map),
        other => {
            warn!("Response is {}, not an object; nothing to sanitise", kind(other));
            BTreeMap::new()
        }
    }
}

/// Normalise one raw question into an object that deserialises cleanly.
fn sanitize_question(key: &str, value: &Value) -> Option<Map<String, Value>> {
    let Value::Object(raw) = value else {
        warn!("Question {}: entry is {}, dropping", key, kind(value));
        return None;
    };

    let number = match raw.get("questionNumber") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => {
            warn!("Question {}: non-string questionNumber {}", key, v);
            v.to_string()
        }
        _ => key.trim().to_string(),
    };
    if number.is_empty() {
        warn!("Dropping entry without a question number");
        return None;
    }

    let mut clean = Map::new();
    clean.insert("questionNumber".into(), Value::String(number.clone()));

    for field in SCALAR_FIELDS {
        if let Some(text) = scalar(&number, field, raw.get(field)) {
            clean.insert(field.into(), Value::String(text));
        }
    }

    match raw.get("choices") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            clean.insert("choices".into(), Value::Array(choices(&number, items)));
        }
        Some(other) => {
            warn!("Question {}: 'choices' is {}, resetting to []", number, kind(other));
            clean.insert("choices".into(), Value::Array(Vec::new()));
        }
    }

    let vocabulary = match raw.get("vocabulary") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => vocabulary(&number, items),
        Some(other) => {
            warn!("Question {}: 'vocabulary' is {}, resetting to []", number, kind(other));
            Vec::new()
        }
    };
    clean.insert("vocabulary".into(), Value::Array(vocabulary));

    match raw.get("subQuestions") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let subs = items
                .iter()
                .filter_map(|item| sub_question(&number, item))
                .collect();
            clean.insert("subQuestions".into(), Value::Array(subs));
        }
        Some(other) => {
            warn!("Question {}: 'subQuestions' is {}, resetting to []", number, kind(other));
            clean.insert("subQuestions".into(), Value::Array(Vec::new()));
        }
    }

    Some(clean)
}

/// String or absent; anything else becomes its pretty-printed JSON.
fn scalar(number: &str, field: &str, value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            warn!(
                "Question {}: non-string value for '{}' ({}), coercing",
                number,
                field,
                kind(other)
            );
            Some(json_text(other, true))
        }
    }
}

fn choices(number: &str, items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let text = match item {
                Value::Object(obj) => match obj.get("text") {
                    Some(Value::String(s)) => s.clone(),
                    None => {
                        warn!("Question {}: choice {} has no text", number, i + 1);
                        json_text(&Value::Null, true)
                    }
                    Some(other) => {
                        warn!("Question {}: non-string text in choice {}, coercing", number, i + 1);
                        json_text(other, true)
                    }
                },
                other => {
                    warn!("Question {}: choice {} is {}, dropping", number, i + 1, kind(other));
                    return None;
                }
            };
            let mut obj = Map::new();
            obj.insert("text".into(), Value::String(text));
            Some(Value::Object(obj))
        })
        .collect()
}

fn vocabulary(number: &str, items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter_map(|item| {
            let Value::Object(obj) = item else {
                warn!("Question {}: vocabulary entry is {}, dropping", number, kind(item));
                return None;
            };
            let word = vocab_part(number, "word", obj.get("word"))?;
            let meaning = vocab_part(number, "meaning", obj.get("meaning"))?;
            let mut clean = Map::new();
            clean.insert("word".into(), Value::String(word));
            clean.insert("meaning".into(), Value::String(meaning));
            Some(Value::Object(clean))
        })
        .collect()
}

fn vocab_part(number: &str, name: &str, value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        None => {
            warn!("Question {}: vocabulary entry without {}, dropping", number, name);
            None
        }
        Some(other) => {
            warn!("Question {}: non-string vocabulary {}, coercing", number, name);
            Some(json_text(other, false))
        }
    }
}

fn sub_question(number: &str, item: &Value) -> Option<Value> {
    let Value::Object(obj) = item else {
        warn!("Question {}: sub-question is {}, dropping", number, kind(item));
        return None;
    };

    let mut clean = Map::new();
    for field in ["questionNumber", "prompt", "answer"] {
        let text = match obj.get(field) {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => {
                warn!("Question {}: sub-question without '{}'", number, field);
                String::new()
            }
            Some(other) => {
                warn!("Question {}: non-string sub-question '{}', coercing", number, field);
                json_text(other, false)
            }
        };
        clean.insert(field.into(), Value::String(text));
    }

    let sub_choices = match obj.get("choices") {
        Some(Value::Array(items)) => choices(number, items),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            warn!("Question {}: sub-question choices is {}, resetting", number, kind(other));
            Vec::new()
        }
    };
    clean.insert("choices".into(), Value::Array(sub_choices));

    Some(Value::Object(clean))
}

fn json_text(value: &Value, pretty: bool) -> String {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.unwrap_or_else(|_| value.to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("test input must be an object"),
        }
    }

    /// Serialise sanitised output back into the raw wire shape.
    fn to_raw(records: &BTreeMap<String, QuestionRecord>) -> Map<String, Value> {
        records
            .iter()
            .map(|(k, r)| (k.clone(), serde_json::to_value(r).unwrap()))
            .collect()
    }

    fn malformed_inputs() -> Vec<Value> {
        vec![
            json!({}),
            json!({"18": null, "19": 5, "20": "text", "21": [1, 2]}),
            json!({"18": {"questionNumber": 18, "prompt": 42, "passage": {"a": 1},
                          "answer": true, "translation": ["x"], "vocabulary": "oops",
                          "choices": "nope"}}),
            json!({"31": {"choices": [null, {"text": 3}, {"text": null}, "bare", {"text": "ok"}],
                          "vocabulary": [null, {"word": 1, "meaning": {"k": "v"}},
                                         {"word": "only"}, 7, {"word": "a", "meaning": "b"}]}}),
            json!({"41-42": {"questionNumber": "41-42", "subQuestions": [
                null, 3,
                {"questionNumber": 41, "prompt": null, "answer": ["①"], "choices": {"x": 1}},
                {"questionNumber": "42", "prompt": "p", "answer": "③",
                 "choices": [null, {"text": ["a"]}]}
            ]}}),
            json!({"32": {"subQuestions": "bad", "boxedText": null, "summaryBoxText": 1.5}}),
        ]
    }

    #[test]
    fn passes_well_formed_record_unchanged() {
        let raw = map(json!({"18": {
            "questionNumber": "18",
            "prompt": "다음 글의 목적으로 가장 적절한 것은?",
            "passage": "Dear residents, ...",
            "choices": [{"text": "a"}, {"text": "b"}, {"text": "c"}, {"text": "d"}, {"text": "e"}],
            "answer": "③",
            "translation": "주민 여러분께, ...",
            "vocabulary": [{"word": "resident", "meaning": "주민"}]
        }}));
        let out = sanitize(&raw);
        let rec = &out["18"];
        assert_eq!(rec.answer.as_deref(), Some("③"));
        assert_eq!(rec.choices.as_ref().map(Vec::len), Some(5));
        assert_eq!(rec.vocabulary[0].word, "resident");
        assert_eq!(to_raw(&out), raw);
    }

    #[test]
    fn non_object_entries_dropped() {
        let out = sanitize(&map(json!({"18": null, "19": "x", "20": [1]})));
        assert!(out.is_empty());
    }

    #[test]
    fn non_object_response_yields_empty_map() {
        assert!(sanitize_value(&json!([1, 2, 3])).is_empty());
        assert!(sanitize_value(&json!("text")).is_empty());
    }

    #[test]
    fn scalars_coerced_to_pretty_json() {
        let out = sanitize(&map(json!({"18": {
            "questionNumber": 18,
            "prompt": 42,
            "passage": {"a": 1},
            "answer": true,
            "boxedText": null
        }})));
        let rec = &out["18"];
        assert_eq!(rec.question_number, "18");
        assert_eq!(rec.prompt.as_deref(), Some("42"));
        assert_eq!(rec.passage.as_deref(), Some("{\n  \"a\": 1\n}"));
        assert_eq!(rec.answer.as_deref(), Some("true"));
        assert_eq!(rec.boxed_text, None);
    }

    #[test]
    fn missing_required_data_not_invented() {
        let out = sanitize(&map(json!({"20": {"questionNumber": "20"}})));
        let rec = &out["20"];
        assert_eq!(rec.translation, None);
        assert_eq!(rec.answer, None);
        assert!(rec.vocabulary.is_empty());
    }

    #[test]
    fn choices_filtered_and_coerced() {
        let out = sanitize(&map(json!({"31": {
            "choices": [null, {"text": 3}, {"text": null}, "bare", {"text": "ok", "extra": 1}]
        }})));
        let texts: Vec<&str> = out["31"]
            .choices
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, vec!["3", "null", "null", "ok"]);
    }

    #[test]
    fn null_text_choice_keeps_answer_position() {
        let out = sanitize(&map(json!({"32": {
            "choices": [{"text": "red"}, {"text": null}, {"text": "green"}, {}, {"text": "white"}],
            "answer": "③"
        }})));
        let rec = &out["32"];
        let texts: Vec<&str> = rec
            .choices
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, vec!["red", "null", "green", "null", "white"]);
        assert_eq!(rec.answer_index(), Some(2));
    }

    #[test]
    fn non_array_choices_reset_to_empty() {
        let out = sanitize(&map(json!({"18": {"choices": "① a ② b"}})));
        assert_eq!(out["18"].choices, Some(vec![]));
    }

    #[test]
    fn absent_choices_stay_absent() {
        let out = sanitize(&map(json!({"29": {"choices": null}})));
        assert_eq!(out["29"].choices, None);
    }

    #[test]
    fn vocabulary_coerced_per_part() {
        let out = sanitize(&map(json!({"22": {"vocabulary": [
            null,
            {"word": 1, "meaning": {"k": "v"}},
            {"word": "only"},
            {"word": null, "meaning": "b"},
            {"word": "a", "meaning": "b"}
        ]}})));
        let v = &out["22"].vocabulary;
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].word, "1");
        assert_eq!(v[0].meaning, "{\"k\":\"v\"}");
        assert_eq!(v[1].word, "null");
        assert_eq!(v[2].word, "a");
    }

    #[test]
    fn sub_questions_normalised() {
        let out = sanitize(&map(json!({"41-42": {
            "questionNumber": "41-42",
            "subQuestions": [
                null,
                {"questionNumber": 41, "prompt": "제목은?", "answer": "①",
                 "choices": [{"text": "t1"}, null]},
                {"questionNumber": "42", "prompt": "p", "answer": 3, "choices": "bad"}
            ]
        }})));
        let rec = &out["41-42"];
        let subs = rec.sub_questions.as_ref().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].question_number, "41");
        assert_eq!(subs[0].choices.len(), 1);
        assert_eq!(subs[1].answer, "3");
        assert!(subs[1].choices.is_empty());
        assert!(rec.is_composite());
    }

    #[test]
    fn key_follows_record_number() {
        let out = sanitize(&map(json!({
            "0": {"questionNumber": "19", "answer": "②"},
            "23": {"answer": "④"}
        })));
        assert!(out.contains_key("19"));
        assert_eq!(out["23"].question_number, "23");
        for (k, r) in &out {
            assert_eq!(k, &r.question_number);
        }
    }

    #[test]
    fn never_panics_and_yields_safe_shape() {
        for input in malformed_inputs() {
            let out = sanitize_value(&input);
            for (key, rec) in &out {
                assert_eq!(key, &rec.question_number);
                // Typed output already guarantees string-or-absent scalars; check
                // the list invariants on the serialised form too.
                let v = serde_json::to_value(rec).unwrap();
                for field in SCALAR_FIELDS {
                    assert!(matches!(v.get(field), None | Some(Value::String(_))), "{field}");
                }
                for item in v["vocabulary"].as_array().unwrap() {
                    assert!(item["word"].is_string() && item["meaning"].is_string());
                }
            }
        }
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in malformed_inputs() {
            let once = sanitize_value(&input);
            let twice = sanitize(&to_raw(&once));
            assert_eq!(once, twice, "input: {input}");
        }
    }
}
