//! Transport: send the exam to the model and get sanitised records back.
//!
//! [`ExtractionTransport`] is the seam between the pipeline and the model
//! provider. [`LlmTransport`] is the real implementation; tests hand in a
//! scripted one. Everything on top of a single call lives here too:
//!
//! * [`extract_with_retry`]: up to `max_attempts` calls with exponential
//!   backoff (`retry_backoff_ms`, then doubling), cooperative cancellation,
//!   code-fence stripping, response-shape collapsing and sanitisation.
//! * [`extract_batch`]: one request for every selected question.
//! * [`extract_per_question`]: one request per question, sequential, with a
//!   fixed pause between calls. Failures are collected, not fatal.
//!
//! Cancellation is checked before each attempt, after each backoff, after
//! each call returns and once per per-question iteration. A call already in
//! flight is never interrupted; its result is discarded instead.

use super::sanitize::sanitize;
use crate::config::SheetConfig;
use crate::error::{QuestionError, SheetError};
use crate::model::QuestionRecord;
use crate::output::{ExtractionOutput, RunStats};
use crate::prompts;
use crate::session::CancelToken;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Text that introduces the solution images in the request.
pub const SOLUTION_CUE: &str = "Here is the solution sheet:";

/// Text that introduces the exam images in the request.
pub const EXAM_CUE: &str = "Here is the exam paper:";

/// One logical model request.
#[derive(Clone)]
pub struct ExtractionRequest {
    /// Question numbers joined by `,`; used for logs and progress events.
    pub label: String,
    pub instruction: String,
    pub schema: Value,
    pub exam: Vec<ImageData>,
    /// Empty when no solution sheet was supplied.
    pub solution: Vec<ImageData>,
}

impl std::fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("label", &self.label)
            .field("instruction_len", &self.instruction.len())
            .field("exam_images", &self.exam.len())
            .field("solution_images", &self.solution.len())
            .finish()
    }
}

impl ExtractionRequest {
    /// Build the request for `numbers`, honouring a custom instruction.
    pub fn for_questions(
        numbers: &[String],
        exam: &[ImageData],
        solution: &[ImageData],
        config: &SheetConfig,
    ) -> Self {
        let instruction = match &config.system_prompt {
            Some(custom) => custom.clone(),
            None => prompts::build_instruction(numbers, !solution.is_empty()),
        };
        Self {
            label: numbers.join(","),
            instruction,
            schema: prompts::response_schema(),
            exam: exam.to_vec(),
            solution: solution.to_vec(),
        }
    }
}

/// Raw model answer plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct TransportReply {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A single, unretried model call.
pub trait ExtractionTransport: Send + Sync {
    fn send(
        &self,
        request: &ExtractionRequest,
    ) -> impl Future<Output = Result<TransportReply, SheetError>> + Send;
}

// ── Provider-backed transport ────────────────────────────────────────────

/// [`ExtractionTransport`] backed by an `edgequake-llm` provider.
///
/// Message layout:
/// 1. system: instruction followed by the JSON schema
/// 2. user: exam images
/// 3. user: solution images, if any, after [`SOLUTION_CUE`]
pub struct LlmTransport {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmTransport {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &SheetConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

impl ExtractionTransport for LlmTransport {
    async fn send(&self, request: &ExtractionRequest) -> Result<TransportReply, SheetError> {
        let schema = serde_json::to_string_pretty(&request.schema)
            .map_err(|e| SheetError::Internal(format!("schema serialisation: {e}")))?;
        let system = format!(
            "{}\n\nRespond with JSON only, matching this schema:\n{}",
            request.instruction, schema
        );

        let mut messages = vec![
            ChatMessage::system(&system),
            ChatMessage::user_with_images(EXAM_CUE, request.exam.clone()),
        ];
        if !request.solution.is_empty() {
            messages.push(ChatMessage::user_with_images(
                SOLUTION_CUE,
                request.solution.clone(),
            ));
        }

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| SheetError::Transport {
                message: e.to_string(),
            })?;

        Ok(TransportReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Build `CompletionOptions` from the sheet config.
fn build_options(config: &SheetConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing one.
pub fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest.trim();
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim();
    }
    cleaned
}

/// Collapse any accepted response shape into the keyed-map shape.
///
/// * array of question objects (canonical); an empty array is
///   [`SheetError::NoDataExtracted`]
/// * a single question object (has `questionNumber`)
/// * an object keyed by question number (older shape)
pub fn collapse_response(value: Value) -> Result<Map<String, Value>, SheetError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(SheetError::NoDataExtracted);
            }
            let mut map = Map::new();
            for item in items {
                match item.get("questionNumber").and_then(number_key) {
                    Some(key) => {
                        map.insert(key, item);
                    }
                    None => warn!("Dropping array entry without a usable questionNumber"),
                }
            }
            Ok(map)
        }
        Value::Object(obj) => {
            if let Some(key) = obj.get("questionNumber").and_then(number_key) {
                let mut map = Map::new();
                map.insert(key, Value::Object(obj));
                Ok(map)
            } else {
                Ok(obj)
            }
        }
        other => Err(SheetError::MalformedResponse {
            detail: format!("expected a JSON array or object, got {other}"),
        }),
    }
}

fn number_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fence-strip, parse, collapse and sanitise one response.
pub fn parse_response(text: &str) -> Result<BTreeMap<String, QuestionRecord>, SheetError> {
    let json = strip_code_fences(text);
    let value: Value = serde_json::from_str(json).map_err(|e| SheetError::MalformedResponse {
        detail: format!("{e} (response starts with {:?})", preview(json)),
    })?;
    let records = sanitize(&collapse_response(value)?);
    if records.is_empty() {
        return Err(SheetError::NoDataExtracted);
    }
    Ok(records)
}

fn preview(text: &str) -> String {
    text.chars().take(60).collect()
}

// ── Retry loop ───────────────────────────────────────────────────────────

/// Call the transport until a response yields at least one record.
///
/// Any failure (transport, malformed JSON, empty extraction) consumes one
/// attempt. When all attempts are spent the last error is returned wrapped
/// in [`SheetError::ExtractionFailed`]. Cancellation returns
/// [`SheetError::Cancelled`] immediately and nothing is parsed.
pub async fn extract_with_retry<T: ExtractionTransport>(
    transport: &T,
    request: &ExtractionRequest,
    config: &SheetConfig,
    cancel: &CancelToken,
    stats: &mut RunStats,
) -> Result<BTreeMap<String, QuestionRecord>, SheetError> {
    let attempts = config.max_attempts.max(1);
    let mut last_err: Option<SheetError> = None;

    for attempt in 0..attempts {
        cancel.check()?;

        if let Some(backoff) = config.backoff_before(attempt) {
            let reason = last_err
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            warn!(
                "Request {}: retry {}/{} after {}ms",
                request.label,
                attempt + 1,
                attempts,
                backoff
            );
            if let Some(cb) = &config.progress_callback {
                cb.on_retry(&request.label, attempt + 1, backoff, &reason);
            }
            sleep(Duration::from_millis(backoff)).await;
            cancel.check()?;
        }

        let start = Instant::now();
        let reply = transport.send(request).await;
        stats.model_calls += 1;
        cancel.check()?;

        let outcome = reply.and_then(|reply| {
            stats.total_input_tokens += reply.input_tokens;
            stats.total_output_tokens += reply.output_tokens;
            debug!(
                "Request {}: {} input tokens, {} output tokens, {:?}",
                request.label,
                reply.input_tokens,
                reply.output_tokens,
                start.elapsed()
            );
            parse_response(&reply.text)
        });

        match outcome {
            Ok(records) => return Ok(records),
            Err(e) => {
                warn!(
                    "Request {}: attempt {} failed: {}",
                    request.label,
                    attempt + 1,
                    e
                );
                last_err = Some(e);
            }
        }
    }

    let last = last_err.unwrap_or_else(|| SheetError::Internal("no attempt was made".into()));
    Err(SheetError::exhausted(attempts, last))
}

// ── Run strategies ───────────────────────────────────────────────────────

/// One request for all `numbers`.
///
/// Selected numbers absent from the response are reported in `failed`;
/// numbers that were not asked for are dropped.
pub async fn extract_batch<T: ExtractionTransport>(
    transport: &T,
    numbers: &[String],
    exam: &[ImageData],
    solution: &[ImageData],
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<ExtractionOutput, SheetError> {
    let start = Instant::now();
    let request = ExtractionRequest::for_questions(numbers, exam, solution, config);
    let mut stats = RunStats {
        requested_questions: numbers.len(),
        ..Default::default()
    };
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_run_start(1);
        cb.on_request_start(&request.label, 1, 1);
    }
    info!("Extracting questions {} in one request", request.label);

    let records = match extract_with_retry(transport, &request, config, cancel, &mut stats).await
    {
        Ok(records) => records,
        Err(e) => {
            if let Some(cb) = cb {
                cb.on_request_error(&request.label, 1, 1, &e.to_string());
                cb.on_run_complete(0, numbers.len(), matches!(e, SheetError::Cancelled));
            }
            return Err(e);
        }
    };

    let mut questions = BTreeMap::new();
    for (key, record) in records {
        if numbers.contains(&key) {
            questions.insert(key, record);
        } else {
            warn!("Dropping question {} which was not requested", key);
        }
    }
    let failed: Vec<QuestionError> = numbers
        .iter()
        .filter(|n| !questions.contains_key(*n))
        .map(|n| QuestionError::Missing { question: n.clone() })
        .collect();

    if questions.is_empty() {
        if let Some(cb) = cb {
            cb.on_run_complete(0, numbers.len(), false);
        }
        return Err(SheetError::NoDataExtracted);
    }

    stats.extracted_questions = questions.len();
    stats.failed_questions = failed.len();
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    if let Some(cb) = cb {
        cb.on_request_complete(&request.label, 1, 1, questions.len());
        cb.on_run_complete(questions.len(), failed.len(), false);
    }

    Ok(ExtractionOutput {
        questions,
        failed,
        stats,
    })
}

/// One request per number, in order, pausing `inter_call_delay_ms` between
/// calls. A question that fails is recorded and the loop moves on.
pub async fn extract_per_question<T: ExtractionTransport>(
    transport: &T,
    numbers: &[String],
    exam: &[ImageData],
    solution: &[ImageData],
    config: &SheetConfig,
    cancel: &CancelToken,
) -> Result<ExtractionOutput, SheetError> {
    let start = Instant::now();
    let total = numbers.len();
    let cb = config.progress_callback.as_ref();
    let mut stats = RunStats {
        requested_questions: total,
        ..Default::default()
    };
    let mut questions = BTreeMap::new();
    let mut failed = Vec::new();

    if let Some(cb) = cb {
        cb.on_run_start(total);
    }

    for (i, number) in numbers.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Cancelled after {} of {} questions", i, total);
            if let Some(cb) = cb {
                cb.on_run_complete(questions.len(), failed.len(), true);
            }
            return Err(SheetError::Cancelled);
        }
        if i > 0 && config.inter_call_delay_ms > 0 {
            sleep(Duration::from_millis(config.inter_call_delay_ms)).await;
        }

        let request =
            ExtractionRequest::for_questions(std::slice::from_ref(number), exam, solution, config);
        if let Some(cb) = cb {
            cb.on_request_start(number, i + 1, total);
        }

        match extract_with_retry(transport, &request, config, cancel, &mut stats).await {
            Ok(mut records) => match records.remove(number) {
                Some(record) => {
                    if let Some(cb) = cb {
                        cb.on_request_complete(number, i + 1, total, 1);
                    }
                    questions.insert(number.clone(), record);
                }
                None => {
                    let err = QuestionError::Missing {
                        question: number.clone(),
                    };
                    warn!("{}", err);
                    if let Some(cb) = cb {
                        cb.on_request_error(number, i + 1, total, &err.to_string());
                    }
                    failed.push(err);
                }
            },
            Err(SheetError::Cancelled) => {
                if let Some(cb) = cb {
                    cb.on_run_complete(questions.len(), failed.len(), true);
                }
                return Err(SheetError::Cancelled);
            }
            Err(e) => {
                let err = QuestionError::ExtractionFailed {
                    question: number.clone(),
                    attempts: config.max_attempts,
                    detail: e.root_cause().to_string(),
                };
                warn!("{}", err);
                if let Some(cb) = cb {
                    cb.on_request_error(number, i + 1, total, &err.to_string());
                }
                failed.push(err);
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_run_complete(questions.len(), failed.len(), false);
    }

    if questions.is_empty() {
        let first_error = failed
            .first()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no questions requested".into());
        return Err(SheetError::AllQuestionsFailed { total, first_error });
    }

    stats.extracted_questions = questions.len();
    stats.failed_questions = failed.len();
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    Ok(ExtractionOutput {
        questions,
        failed,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies from a fixed script; the last entry repeats.
    struct ScriptedTransport {
        script: Vec<Result<String, String>>,
        calls: AtomicUsize,
        cancel_on_call: Option<(usize, CancelToken)>,
        labels: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<&str, &str>>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|r| r.map(String::from).map_err(String::from))
                    .collect(),
                calls: AtomicUsize::new(0),
                cancel_on_call: None,
                labels: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ExtractionTransport for ScriptedTransport {
        async fn send(&self, request: &ExtractionRequest) -> Result<TransportReply, SheetError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.labels.lock().unwrap().push(request.label.clone());
            if let Some((at, token)) = &self.cancel_on_call {
                if *at == n {
                    token.cancel();
                }
            }
            let step = &self.script[n.min(self.script.len() - 1)];
            match step {
                Ok(text) => Ok(TransportReply {
                    text: text.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                }),
                Err(msg) => Err(SheetError::Transport {
                    message: msg.clone(),
                }),
            }
        }
    }

    const Q18: &str = r#"[{"questionNumber":"18","prompt":"p","answer":"③","translation":"t","vocabulary":[]}]"#;

    fn fast_config() -> SheetConfig {
        SheetConfig::builder()
            .retry_backoff_ms(1)
            .inter_call_delay_ms(0)
            .build()
            .unwrap()
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest::for_questions(&["18".to_string()], &[], &[], &fast_config())
    }

    #[test]
    fn fences_stripped() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  [1] "), "[1]");
    }

    #[test]
    fn legacy_shapes_collapse_to_map() {
        let keyed = collapse_response(serde_json::json!({"18": {"answer": "①"}})).unwrap();
        assert!(keyed.contains_key("18"));

        let single =
            collapse_response(serde_json::json!({"questionNumber": 19, "answer": "②"})).unwrap();
        assert!(single.contains_key("19"));

        let array = collapse_response(serde_json::json!([
            {"questionNumber": "20"},
            {"prompt": "no number"}
        ]))
        .unwrap();
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn empty_array_is_no_data() {
        assert!(matches!(
            collapse_response(serde_json::json!([])),
            Err(SheetError::NoDataExtracted)
        ));
        assert!(matches!(parse_response("[]"), Err(SheetError::NoDataExtracted)));
    }

    #[test]
    fn unusable_entries_are_no_data() {
        assert!(matches!(
            parse_response(r#"{"18": null}"#),
            Err(SheetError::NoDataExtracted)
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_response("Sorry, I cannot help"),
            Err(SheetError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response("42"),
            Err(SheetError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn fenced_response_parses() {
        let text = format!("```json\n{Q18}\n```");
        let records = parse_response(&text).unwrap();
        assert_eq!(records["18"].answer.as_deref(), Some("③"));
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let t = ScriptedTransport::new(vec![Err("HTTP 503"), Err("HTTP 503"), Ok(Q18)]);
        let mut stats = RunStats::default();
        let records = extract_with_retry(&t, &request(), &fast_config(), &CancelToken::new(), &mut stats)
            .await
            .unwrap();
        assert_eq!(t.calls(), 3);
        assert_eq!(stats.model_calls, 3);
        assert!(records.contains_key("18"));
    }

    #[tokio::test]
    async fn always_failing_stops_after_three() {
        let t = ScriptedTransport::new(vec![Err("boom 1"), Err("boom 2"), Err("boom 3")]);
        let mut stats = RunStats::default();
        let err = extract_with_retry(&t, &request(), &fast_config(), &CancelToken::new(), &mut stats)
            .await
            .unwrap_err();
        assert_eq!(t.calls(), 3);
        match &err {
            SheetError::ExtractionFailed { attempts, source, .. } => {
                assert_eq!(*attempts, 3);
                assert!(source.to_string().contains("boom 3"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains(crate::error::EXTRACTION_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn empty_extraction_is_retried_and_reported() {
        let t = ScriptedTransport::new(vec![Ok("[]")]);
        let mut stats = RunStats::default();
        let err = extract_with_retry(&t, &request(), &fast_config(), &CancelToken::new(), &mut stats)
            .await
            .unwrap_err();
        assert_eq!(t.calls(), 3);
        assert!(matches!(err.root_cause(), SheetError::NoDataExtracted));
    }

    #[tokio::test]
    async fn cancelled_before_attempt_makes_no_call() {
        let t = ScriptedTransport::new(vec![Ok(Q18)]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut stats = RunStats::default();
        let err = extract_with_retry(&t, &request(), &fast_config(), &cancel, &mut stats)
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::Cancelled));
        assert_eq!(t.calls(), 0);
    }

    #[tokio::test]
    async fn cancel_during_call_discards_result() {
        let cancel = CancelToken::new();
        let mut t = ScriptedTransport::new(vec![Ok(Q18)]);
        t.cancel_on_call = Some((0, cancel.clone()));
        let mut stats = RunStats::default();
        let err = extract_with_retry(&t, &request(), &fast_config(), &cancel, &mut stats)
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::Cancelled));
        assert_eq!(t.calls(), 1);
    }

    #[tokio::test]
    async fn batch_reports_missing_and_drops_extras() {
        let reply = r#"[{"questionNumber":"18","answer":"①"},{"questionNumber":"22","answer":"②"}]"#;
        let t = ScriptedTransport::new(vec![Ok(reply)]);
        let numbers = vec!["18".to_string(), "19".to_string()];
        let out = extract_batch(&t, &numbers, &[], &[], &fast_config(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(out.questions.len(), 1);
        assert_eq!(out.failed_numbers(), vec!["19"]);
        assert_eq!(t.labels.lock().unwrap().as_slice(), ["18,19"]);
    }

    #[tokio::test]
    async fn per_question_collects_failures() {
        let config = SheetConfig::builder()
            .mode(ExtractionMode::PerQuestion)
            .max_attempts(1)
            .inter_call_delay_ms(0)
            .build()
            .unwrap();
        let t = ScriptedTransport::new(vec![
            Ok(Q18),
            Err("HTTP 500"),
            Ok(r#"[{"questionNumber":"21"}]"#),
        ]);
        let numbers = vec!["18".to_string(), "19".to_string(), "20".to_string()];
        let out = extract_per_question(&t, &numbers, &[], &[], &config, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(t.calls(), 3);
        assert_eq!(out.questions.keys().collect::<Vec<_>>(), vec!["18"]);
        assert_eq!(out.failed_numbers(), vec!["19", "20"]);
        assert!(matches!(out.failed[1], QuestionError::Missing { .. }));
        assert_eq!(
            t.labels.lock().unwrap().as_slice(),
            ["18", "19", "20"]
        );
        let warning = out.partial_failure_warning().unwrap();
        assert!(warning.contains("19, 20"));
    }

    #[tokio::test]
    async fn per_question_all_failed_is_fatal() {
        let config = SheetConfig::builder().max_attempts(1).inter_call_delay_ms(0).build().unwrap();
        let t = ScriptedTransport::new(vec![Err("down")]);
        let numbers = vec!["18".to_string(), "19".to_string()];
        let err = extract_per_question(&t, &numbers, &[], &[], &config, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::AllQuestionsFailed { total: 2, .. }));
    }

    #[tokio::test]
    async fn per_question_stops_when_cancelled() {
        let cancel = CancelToken::new();
        let mut t = ScriptedTransport::new(vec![Ok(Q18)]);
        t.cancel_on_call = Some((0, cancel.clone()));
        let numbers = vec!["18".to_string(), "19".to_string()];
        let err = extract_per_question(&t, &numbers, &[], &[], &fast_config(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SheetError::Cancelled));
        assert_eq!(t.calls(), 1);
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&SheetConfig::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(16384));
    }
}
