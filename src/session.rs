//! Run lifecycle: one explicit state machine instead of loose flags.
//!
//! ```text
//!            begin()
//!   Idle ──────────────▶ Running ──succeed()──▶ Succeeded
//!     ▲                    │  │
//!     │                    │  └──fail()──────▶ Failed
//!     │                    └────cancel()─────▶ Cancelled
//!     └──────── begin() is also allowed from any terminal state
//! ```
//!
//! A [`CancelToken`] is the only concurrency primitive. It is checked at
//! coarse suspension points (before each attempt, after each backoff, after
//! each model call returns), so a request already in flight always finishes
//! before cancellation is observed. Results produced after cancellation are
//! discarded by [`ExtractionSession::succeed`].

use crate::error::SheetError;
use crate::output::ExtractionOutput;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cooperative cancellation flag shared between the caller and the run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set, for use with `?`.
    pub fn check(&self) -> Result<(), SheetError> {
        if self.is_cancelled() {
            Err(SheetError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Where a run currently stands.
#[derive(Debug, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded(ExtractionOutput),
    Failed(String),
    Cancelled,
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Succeeded(_) => "succeeded",
            RunState::Failed(_) => "failed",
            RunState::Cancelled => "cancelled",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// Owns the state of the current run and its cancellation token.
///
/// Starting a new run discards the previous result; nothing is persisted.
#[derive(Debug, Default)]
pub struct ExtractionSession {
    state: RunState,
    cancel: CancelToken,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Token to hand to the running extraction (and to a Ctrl-C handler).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// `Idle | terminal → Running`. Clears any previous result.
    pub fn begin(&mut self) -> Result<(), SheetError> {
        if self.state.is_running() {
            return Err(SheetError::Internal(
                "an extraction run is already in progress".into(),
            ));
        }
        self.cancel.reset();
        self.state = RunState::Running;
        debug!("session: → running");
        Ok(())
    }

    /// `Running → Succeeded`, unless cancellation was requested meanwhile,
    /// in which case the output is dropped and the run ends `Cancelled`.
    pub fn succeed(&mut self, output: ExtractionOutput) -> &RunState {
        if !self.state.is_running() {
            debug!("session: ignoring result in state {}", self.state.name());
            return &self.state;
        }
        if self.cancel.is_cancelled() {
            info!("session: result discarded, run was cancelled");
            self.state = RunState::Cancelled;
        } else {
            self.state = RunState::Succeeded(output);
        }
        &self.state
    }

    /// `Running → Failed` (or `Cancelled` for a cancellation error).
    pub fn fail(&mut self, error: &SheetError) -> &RunState {
        if !self.state.is_running() {
            return &self.state;
        }
        self.state = if matches!(error, SheetError::Cancelled) || self.cancel.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Failed(error.to_string())
        };
        &self.state
    }

    /// Request cancellation; a running session ends `Cancelled` immediately.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.state.is_running() {
            info!("session: cancelled by user");
            self.state = RunState::Cancelled;
        }
    }

    /// Take the committed output, leaving the session idle.
    pub fn take_output(&mut self) -> Option<ExtractionOutput> {
        match std::mem::take(&mut self.state) {
            RunState::Succeeded(out) => Some(out),
            other => {
                self.state = other;
                None
            }
        }
    }
}
