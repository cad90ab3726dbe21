//! Result types returned by the extraction and generation entry points.

use crate::error::QuestionError;
use crate::model::{compare_question_numbers, QuestionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sanitized questions from one extraction run.
///
/// `questions` is keyed by question number and every key equals its
/// record's `question_number`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub questions: BTreeMap<String, QuestionRecord>,
    /// Questions that failed or were absent from the response.
    pub failed: Vec<QuestionError>,
    pub stats: RunStats,
}

impl ExtractionOutput {
    /// Records in display order ("9" < "18" < "41-42").
    pub fn sorted(&self) -> Vec<&QuestionRecord> {
        let mut records: Vec<&QuestionRecord> = self.questions.values().collect();
        records.sort_by(|a, b| compare_question_numbers(&a.question_number, &b.question_number));
        records
    }

    /// Question numbers that failed, in the order they were attempted.
    pub fn failed_numbers(&self) -> Vec<&str> {
        self.failed.iter().map(|e| e.question()).collect()
    }

    /// Human-readable warning listing failed numbers, if any.
    pub fn partial_failure_warning(&self) -> Option<String> {
        if self.failed.is_empty() {
            None
        } else {
            Some(format!(
                "{} question(s) could not be extracted: {}",
                self.failed.len(),
                self.failed_numbers().join(", ")
            ))
        }
    }
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub requested_questions: usize,
    pub extracted_questions: usize,
    pub failed_questions: usize,
    /// Model calls made, retries included.
    pub model_calls: u32,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// A finished answer-sheet PDF plus the data it was built from.
#[derive(Debug, Clone)]
pub struct SheetOutput {
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub extraction: ExtractionOutput,
}
