//! Instruction text and response schema sent to the vision model.
//!
//! All prompt wording lives here so it can be tuned without touching the
//! retry or parsing code. Callers can replace the whole instruction via
//! [`crate::config::SheetConfig::system_prompt`]; the schema is always sent.
//!
//! The instruction is assembled from a fixed preamble, the general rules,
//! and only the question-specific sections that match the selected numbers,
//! which keeps per-question requests short.

use serde_json::{json, Value};

/// General rules that apply to every question.
pub const CORE_RULES: &str = r#"General rules:
1. Copy the exam text exactly as printed: prompts, passages, boxed text, starred vocabulary notes and options.
2. Use null for every field that does not apply to a question. Never leave 'passage' null for a question that has a body text.
3. Put each piece of text in exactly one field. Do not repeat the passage in other fields.
4. 'translation' is required for every question: a complete, natural Korean translation of the question body. Do not translate the instruction line or the options.
5. 'vocabulary' lists at least 20 useful words or phrases from the passage, each with a short Korean meaning, in order of appearance.
6. 'choices' holds all five options for questions that have them. Each 'text' is the option alone, WITHOUT its marker: write { "text": "The importance of teamwork" }, never { "text": "① The importance of teamwork" }.
7. 'answer' is the marker of the correct option (①, ②, ③, ④ or ⑤)."#;

/// Appended only when a solution sheet is attached.
pub const SOLUTION_NOTE: &str = "A solution sheet follows the exam images. Take answers from it.";

/// Format the preamble for the given question numbers.
fn preamble(numbers: &[String]) -> String {
    format!(
        "You read scanned English exam papers and rebuild questions as structured JSON.\n\
         Extract exactly these question numbers: {}.\n\
         Answer with a single JSON array containing one object per question.",
        numbers.join(", ")
    )
}

/// Question-specific rules, if the number has any.
pub fn question_rules(number: &str) -> Option<&'static str> {
    let text = match number {
        "18" | "19" | "20" | "22" | "23" | "24" => {
            r#"Questions 18-24: the instruction line goes into 'prompt', the body text into 'passage'."#
        }
        "21" => {
            r#"Question 21: the instruction line goes into 'prompt', the body into 'passage'. Copy the English phrase quoted in the prompt into 'promptEnglishPart' AND into 'underlinedText' (it is underlined in the passage)."#
        }
        "29" | "30" => {
            r#"Questions 29-30 (grammar / wording): in 'passage', put each option marker (① to ⑤) at its position and wrap ONLY the tested word or phrase in __U__ markers, e.g. "is a process ① __U__referred__U__ to as" or "the person ④ __U__for whom__U__ it was intended". All five markers must appear, in order. 'choices' is null."#
        }
        "31" | "32" | "33" | "34" => {
            r#"Questions 31-34 (blank filling): the instruction goes only into 'prompt'; the whole passage, with the blank written as a short run of underscores (________), goes only into 'passage'. 'mainTextAfterBox' is null. In 'translation', fill the blank with the correct answer and wrap that part in __ANSWER__ markers, e.g. "이 __ANSWER__새로운 발견__ANSWER__은 중요하다"."#
        }
        "35" => {
            r#"Question 35 (irrelevant sentence): put the whole text, including any boxed opening, into 'passage' with the markers ①-⑤ inline and without parentheses. 'boxedText' and 'choices' are null. The translation contains no markers."#
        }
        "36" | "37" => {
            r#"Questions 36-37 (ordering): the opening paragraph goes into 'boxedText'; the paragraphs (A), (B) and (C) go together into 'mainTextAfterBox'. Options look like "(A) - (C) - (B)". The translation covers the opening and then (A), (B), (C) in the correct order, keeping the (A)/(B)/(C) labels."#
        }
        "38" | "39" => {
            r#"Questions 38-39 (sentence insertion): the given sentence goes into 'boxedText'; the passage with its insertion points (①), (②), ... exactly as printed goes into 'passage'. 'choices' is null. The translation is one paragraph with the given sentence inserted in the right place and wrapped in __ANSWER__ markers, without any (①) markers."#
        }
        "40" => {
            r#"Question 40 (summary): the passage goes into 'passage', the summary instruction only into 'summaryPrompt', the summary sentence with blanks (A) and (B) into 'summaryBoxText'. Each option holds both words separated by ".....", e.g. "active ..... passive". 'translation' is the passage translation, a newline, then the completed summary sentence with the (A) and (B) words each wrapped in __ANSWER__ markers; do not translate 'summaryPrompt'."#
        }
        "41-42" => {
            r#"Questions 41-42 (shared long passage): 'questionNumber' is "41-42"; the shared passage goes into 'passage'; 'subQuestions' holds two objects, for "41" and "42", each with its own 'questionNumber', 'prompt', five 'choices' and 'answer'. The top-level 'prompt', 'choices' and 'answer' are null. 'translation' and 'vocabulary' cover the whole passage; in the translation wrap the Korean words matching the underlined (a)-(e) words in __ANSWER__ markers."#
        }
        _ => return None,
    };
    Some(text)
}

/// The full instruction for one request.
pub fn build_instruction(numbers: &[String], has_solution: bool) -> String {
    let mut sections = vec![preamble(numbers), CORE_RULES.to_string()];

    let mut seen: Vec<&'static str> = Vec::new();
    for number in numbers {
        if let Some(rules) = question_rules(number) {
            if !seen.contains(&rules) {
                seen.push(rules);
            }
        }
    }
    if !seen.is_empty() {
        sections.push(format!("Question-specific rules:\n- {}", seen.join("\n- ")));
    }

    if has_solution {
        sections.push(SOLUTION_NOTE.to_string());
    }

    sections.join("\n\n")
}

/// JSON schema of the canonical response: an array of question objects.
pub fn response_schema() -> Value {
    let nullable_string = json!({ "type": ["string", "null"] });
    let choices = json!({
        "type": ["array", "null"],
        "items": {
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        }
    });

    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "questionNumber": { "type": "string" },
                "prompt": nullable_string,
                "promptEnglishPart": nullable_string,
                "passage": nullable_string,
                "starredVocabulary": nullable_string,
                "underlinedText": nullable_string,
                "boxedText": nullable_string,
                "mainTextAfterBox": nullable_string,
                "summaryPrompt": nullable_string,
                "summaryBoxText": nullable_string,
                "choices": choices,
                "answer": nullable_string,
                "translation": { "type": "string" },
                "vocabulary": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "word": { "type": "string" },
                            "meaning": { "type": "string" }
                        },
                        "required": ["word", "meaning"]
                    }
                },
                "subQuestions": {
                    "type": ["array", "null"],
                    "items": {
                        "type": "object",
                        "properties": {
                            "questionNumber": { "type": "string" },
                            "prompt": { "type": "string" },
                            "choices": choices,
                            "answer": { "type": "string" }
                        },
                        "required": ["questionNumber", "prompt", "choices", "answer"]
                    }
                }
            },
            "required": ["questionNumber", "translation", "vocabulary"]
        }
    })
}
