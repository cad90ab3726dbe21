//! CLI binary for edgequake-exam2sheet.
//!
//! A thin shim over the library crate that maps CLI flags to `SheetConfig`,
//! drives one extraction session and writes the answer-sheet PDF.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_exam2sheet::generate::{build_document, prepare_inputs, resolve_provider, write_pdf};
use edgequake_exam2sheet::pipeline::present::{output_file_name, render_preview};
use edgequake_exam2sheet::pipeline::transport::LlmTransport;
use edgequake_exam2sheet::{
    extract_with_transport, render_sheets, ExtractionMode, ExtractionProgressCallback,
    ExtractionSession, ProgressCallback, QuestionSelection, RunState, SheetConfig, SheetInputs,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over model requests: one in batch mode, one per question
/// otherwise. Retries are logged above the bar.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading exam…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, label: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(label))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_requests: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>2}/{len} requests  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_requests as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Analysing");
    }

    fn on_request_start(&self, label: &str, _index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(label.to_string(), Instant::now());
        }
        self.bar.set_message(format!("Q{label}"));
    }

    fn on_retry(&self, label: &str, attempt: u32, backoff_ms: u64, error: &str) {
        self.bar.println(format!(
            "  {} Q{}  attempt {} in {:.1}s  {}",
            yellow("↻"),
            label,
            attempt,
            backoff_ms as f64 / 1000.0,
            dim(&truncate(error, 80)),
        ));
    }

    fn on_request_complete(&self, label: &str, _index: usize, _total: usize, questions: usize) {
        let secs = self.elapsed_secs(label);
        self.bar.println(format!(
            "  {} Q{:<8} {}  {}",
            green("✓"),
            label,
            dim(&format!("{questions} question(s)")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_request_error(&self, label: &str, _index: usize, _total: usize, error: &str) {
        let secs = self.elapsed_secs(label);
        self.bar.println(format!(
            "  {} Q{:<8} {}  {}",
            red("✗"),
            label,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, extracted: usize, failed: usize, cancelled: bool) {
        self.bar.set_prefix("Typesetting");
        self.bar.set_message(String::new());
        if cancelled {
            self.bar.println(format!("{} cancelled", yellow("■")));
        } else if failed == 0 {
            self.bar.println(format!(
                "{} {} question(s) extracted",
                green("✔"),
                bold(&extracted.to_string())
            ));
        } else {
            self.bar.println(format!(
                "{} {} extracted, {} failed",
                yellow("⚠"),
                bold(&extracted.to_string()),
                red(&failed.to_string())
            ));
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Answer sheets for every supported question
  exam2sheet "2024 고3 모의고사 문제지.pdf" --font NotoSansKR-Regular.ttf

  # Use the official solution sheet for answers, add a footer logo
  exam2sheet exam.pdf --solution answers.pdf --logo academy.png

  # Only some questions, one request each (slower, but a failure costs one question)
  exam2sheet exam.pdf --questions 18,21,32,41-42 --mode per-question

  # Inspect the extracted data without typesetting
  exam2sheet exam.jpg --json > questions.json
  exam2sheet exam.jpg --preview

SUPPORTED QUESTIONS:
  18 19 20 21 22 23 24 29 30 31 32 33 34 35 36 37 38 39 40 41-42

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory) for PDF inputs
"#;

/// Turn scanned English exam papers into answer/explanation sheets.
#[derive(Parser, Debug)]
#[command(
    name = "exam2sheet",
    version,
    about = "Turn scanned English exam papers into printable answer/explanation sheets",
    long_about = "Reads an exam paper (PDF or image, local file or URL) with a Vision Language \
Model and typesets one answer/explanation sheet per question: the question as printed, a Korean \
translation with the answer highlighted, the correct answer and a vocabulary list.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Exam paper: local PDF/JPEG/PNG/WebP file or HTTP/HTTPS URL.
    exam: String,

    /// Solution sheet used as the source of correct answers.
    #[arg(long, env = "EXAM2SHEET_SOLUTION")]
    solution: Option<String>,

    /// Logo image printed in the footer of every sheet.
    #[arg(long, env = "EXAM2SHEET_LOGO")]
    logo: Option<String>,

    /// Write the PDF here. Default: "<exam name>_해설지.pdf".
    #[arg(short, long, env = "EXAM2SHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Question numbers: "all" or a comma list such as 18,21,41-42.
    #[arg(long, env = "EXAM2SHEET_QUESTIONS", default_value = "all")]
    questions: String,

    /// One request for everything, or one request per question.
    #[arg(long, env = "EXAM2SHEET_MODE", value_enum, default_value = "batch")]
    mode: ModeArg,

    /// Font file for the typesetter (repeatable). Korean text needs a CJK font.
    #[arg(long = "font", env = "EXAM2SHEET_FONTS", value_delimiter = ',')]
    fonts: Vec<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-mini, gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI for PDF inputs (72–400).
    #[arg(long, env = "EXAM2SHEET_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted inputs.
    #[arg(long, env = "EXAM2SHEET_PASSWORD")]
    password: Option<String>,

    /// Path to a text file replacing the built-in instruction.
    #[arg(long, env = "EXAM2SHEET_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per request.
    #[arg(long, env = "EXAM2SHEET_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "EXAM2SHEET_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Attempts per request, first call included.
    #[arg(long, env = "EXAM2SHEET_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Wait before the first retry in milliseconds (doubles afterwards).
    #[arg(long, env = "EXAM2SHEET_RETRY_BACKOFF_MS", default_value_t = 2000)]
    retry_backoff_ms: u64,

    /// Pause between per-question requests in milliseconds.
    #[arg(long, env = "EXAM2SHEET_CALL_DELAY_MS", default_value_t = 1500)]
    call_delay_ms: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "EXAM2SHEET_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the sanitized records as JSON instead of writing a PDF.
    #[arg(long, env = "EXAM2SHEET_JSON")]
    json: bool,

    /// Print a plain-text preview of the sheets instead of writing a PDF.
    #[arg(long, env = "EXAM2SHEET_PREVIEW")]
    preview: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXAM2SHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXAM2SHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EXAM2SHEET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ModeArg {
    Batch,
    PerQuestion,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Batch => ExtractionMode::Batch,
            ModeArg::PerQuestion => ExtractionMode::PerQuestion,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.preview;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ExtractionProgressCallback>),
    )
    .await?;

    let mut inputs = SheetInputs::new(&cli.exam);
    inputs.solution = cli.solution.clone();
    inputs.logo = cli.logo.clone();

    // ── Session + Ctrl-C ─────────────────────────────────────────────────
    let mut session = ExtractionSession::new();
    session.begin().context("Could not start extraction")?;
    let cancel = session.cancel_token();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // ── Extract ──────────────────────────────────────────────────────────
    let run = async {
        let prepared = prepare_inputs(&inputs, &config).await?;
        let transport = LlmTransport::new(resolve_provider(&config).await?, &config);
        let extraction = extract_with_transport(
            &transport,
            &prepared.exam_images,
            &prepared.solution_images,
            &config,
            &cancel,
        )
        .await?;
        Ok::<_, edgequake_exam2sheet::SheetError>((prepared, extraction))
    };

    // Nothing below reports through the bar, so clear it on every path.
    let outcome = run.await;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    let (prepared, extraction) = match outcome {
        Ok(v) => v,
        Err(e) => {
            session.fail(&e);
            if let RunState::Cancelled = session.state() {
                anyhow::bail!("Cancelled");
            }
            return Err(e).context("Answer sheet generation failed");
        }
    };

    if let RunState::Cancelled = session.succeed(extraction) {
        anyhow::bail!("Cancelled");
    }
    let extraction = session
        .take_output()
        .context("Extraction finished without a result")?;

    let stem = prepared.exam.stem();

    // ── Inspection outputs ───────────────────────────────────────────────
    if cli.json {
        let json =
            serde_json::to_string_pretty(&extraction).context("Failed to serialise output")?;
        println!("{json}");
    }
    if cli.preview {
        let doc = build_document(&stem, &extraction, None);
        println!("{}", render_preview(&doc));
    }
    if (cli.json || cli.preview) && cli.output.is_none() {
        return Ok(());
    }

    // ── Typeset + write ──────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output_file_name(&stem)));

    let warning = extraction.partial_failure_warning();
    let stats = extraction.stats.clone();
    let sheets = render_sheets(&stem, extraction, prepared.logo_png, &config)
        .await
        .context("PDF generation failed")?;
    write_pdf(&output_path, &sheets.pdf)
        .await
        .context("Failed to write PDF")?;

    if !cli.quiet {
        if let Some(w) = warning {
            eprintln!("{} {}", yellow("⚠"), w);
        }
        eprintln!(
            "{}  {} sheet(s)  {} call(s)  {}ms  →  {}",
            green("✔"),
            sheets.page_count,
            stats.model_calls,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `SheetConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SheetConfig> {
    let mut builder = SheetConfig::builder()
        .questions(parse_questions(&cli.questions))
        .mode(cli.mode.clone().into())
        .dpi(cli.dpi)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_attempts(cli.max_attempts)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .inter_call_delay_ms(cli.call_delay_ms)
        .download_timeout_secs(cli.download_timeout);

    for font in &cli.fonts {
        builder = builder.font_path(font);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--questions` into a selection; validation happens in `build()`.
fn parse_questions(s: &str) -> QuestionSelection {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        return QuestionSelection::All;
    }
    QuestionSelection::List(
        s.split(',')
            .map(|q| q.trim().replace('~', "-"))
            .filter(|q| !q.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_parsed_with_tilde_ranges() {
        assert!(matches!(parse_questions(" all "), QuestionSelection::All));
        match parse_questions("18, 41~42,,32") {
            QuestionSelection::List(list) => assert_eq!(list, vec!["18", "41-42", "32"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn finish_clears_bar_mid_run() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        cb.on_run_start(3);
        cb.on_request_start("18", 0, 3);
        cb.on_run_complete(1, 0, false);
        cb.finish();
        assert!(cb.bar.is_finished());
    }
}
