// Builds the final grading result from scored report items or, when there
// are none, from the raw outcome of the graded command.
use crate::runner::CommandError;
use gradekit_common::types::{GradingResult, ScoredTestItem, TestStatus};
use tracing::info;

pub const TIMEOUT_MESSAGE: &str = "Command timed out";

/// How the graded command ended, already classified for scoring
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutcome {
    pub status: TestStatus,
    pub message: String,
    pub elapsed_millis: f64,
}

impl RawOutcome {
    pub fn succeeded(output: String, elapsed_millis: f64) -> Self {
        Self {
            status: TestStatus::Pass,
            message: output,
            elapsed_millis,
        }
    }

    pub fn failed(error: &CommandError, elapsed_millis: f64) -> Self {
        let (status, message) = classify_error(error);
        Self {
            status,
            message,
            elapsed_millis,
        }
    }
}

/// Map a command failure to a result status and message
pub fn classify_error(error: &CommandError) -> (TestStatus, String) {
    match error {
        CommandError::Timeout(_) => (TestStatus::Error, TIMEOUT_MESSAGE.to_string()),
        CommandError::ExecutableNotFound(name) => (
            TestStatus::Error,
            format!("Unable to locate executable file: {}", name),
        ),
        CommandError::NonZeroExit { code: Some(code), .. } => {
            (TestStatus::Fail, format!("failed with exit code {}", code))
        }
        CommandError::NonZeroExit { code: None, .. } => {
            (TestStatus::Fail, "failed: terminated by signal".to_string())
        }
        CommandError::Io(e) => (TestStatus::Error, e.to_string()),
    }
}

/// Identity of the graded command, used for the fallback item
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub test_name: &'a str,
    pub command: &'a str,
    pub max_score: f64,
}

/// Result from report items, or `None` when there are no items
pub fn from_reports(items: Vec<ScoredTestItem>, max_score: f64) -> Option<GradingResult> {
    if items.is_empty() {
        return None;
    }
    Some(GradingResult::from_items(items, max_score))
}

/// Single-item result synthesized from the command outcome
pub fn from_command(outcome: &RawOutcome, ctx: &CommandContext<'_>) -> GradingResult {
    let score = if outcome.status.is_pass() {
        ctx.max_score
    } else {
        0.0
    };

    info!(
        status = %outcome.status,
        score,
        max_score = ctx.max_score,
        "No usable reports, scoring the command outcome"
    );

    let item = ScoredTestItem {
        name: ctx.test_name.to_string(),
        status: outcome.status,
        score,
        message: outcome.message.clone(),
        detail: ctx.command.to_string(),
        filename: String::new(),
        line_no: 0,
        elapsed_millis: outcome.elapsed_millis,
    };

    GradingResult::from_items(vec![item], ctx.max_score)
}

/// Report items win; the command outcome is only used when there are none.
/// The two sources are never mixed.
pub fn assemble(
    items: Vec<ScoredTestItem>,
    outcome: &RawOutcome,
    ctx: &CommandContext<'_>,
) -> GradingResult {
    match from_reports(items, ctx.max_score) {
        Some(result) => result,
        None => from_command(outcome, ctx),
    }
}
