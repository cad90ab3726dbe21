//! End-to-end tests for edgequake-exam2sheet.
//!
//! These use real exam scans in `./test_cases/` and make live LLM API calls.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! PDF inputs additionally need pdfium (`PDFIUM_LIB_PATH`).

use edgequake_exam2sheet::{
    extract, generate_to_file, CancelToken, ExtractionMode, QuestionSelection, SheetConfig,
    SheetInputs,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("edgequake_exam2sheet=debug"))
        .with_test_writer()
        .try_init();
}

fn selection(numbers: &[&str]) -> QuestionSelection {
    QuestionSelection::List(numbers.iter().map(|s| s.to_string()).collect())
}

fn korean_fonts() -> Vec<PathBuf> {
    let dir = test_cases_dir().join("fonts");
    std::fs::read_dir(&dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .is_some_and(|ext| ext == "ttf" || ext == "otf")
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── Live tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_purpose_question() {
    let exam = e2e_skip_unless_ready!(test_cases_dir().join("mock_exam_p1.png"));
    init_tracing();

    let config = SheetConfig::builder()
        .questions(selection(&["18", "19", "20"]))
        .build()
        .unwrap();
    let out = extract(
        &SheetInputs::new(exam.to_str().unwrap()),
        &config,
        &CancelToken::new(),
    )
    .await
    .expect("extract() should succeed");

    for (number, record) in &out.questions {
        assert_eq!(number, &record.question_number);
        assert!(
            record.translation.as_deref().is_some_and(|t| !t.is_empty()),
            "question {number} has no translation"
        );
    }
    println!(
        "extracted {:?}, failed {:?}, {} tokens in / {} out",
        out.questions.keys().collect::<Vec<_>>(),
        out.failed_numbers(),
        out.stats.total_input_tokens,
        out.stats.total_output_tokens
    );
}

#[tokio::test]
async fn test_generate_full_sheet_per_question() {
    let exam = e2e_skip_unless_ready!(test_cases_dir().join("mock_exam.pdf"));
    init_tracing();

    let mut builder = SheetConfig::builder()
        .questions(selection(&["21", "32", "36", "40", "41-42"]))
        .mode(ExtractionMode::PerQuestion);
    for font in korean_fonts() {
        builder = builder.font_path(font);
    }
    let config = builder.build().unwrap();

    let mut inputs = SheetInputs::new(exam.to_str().unwrap());
    let solution = test_cases_dir().join("mock_exam_solution.pdf");
    if solution.exists() {
        inputs = inputs.solution(solution.to_str().unwrap());
    }

    let target = output_dir().join("mock_exam_해설지.pdf");
    let out = generate_to_file(&inputs, &target, &config, &CancelToken::new())
        .await
        .expect("generate_to_file() should succeed");

    assert!(out.pdf.starts_with(b"%PDF"));
    assert_eq!(out.page_count, out.extraction.questions.len());
    assert!(target.exists());
    println!("wrote {} sheets to {}", out.page_count, target.display());
}
