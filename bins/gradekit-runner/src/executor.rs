/// Grading Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Sequence setup command → graded command → report discovery and turn
/// whatever came out into one `GradingResult`.
///
/// **Architecture:**
/// 1. Use a `CommandRunner` to run commands (runner.rs)
/// 2. Use the scanner and parser to load reports (scanner.rs, report.rs)
/// 3. Use the allocator to score them (allocator.rs)
/// 4. Use the assembler to build the result or the fallback (assembler.rs)
///
/// This module is the glue layer - it knows nothing about:
/// - How commands execute (runner's job)
/// - How reports are decoded (parser's job)
/// - How scores are split (allocator's job)
use crate::allocator;
use crate::assembler::{self, CommandContext, RawOutcome};
use crate::config::{CommandEnv, GraderInputs};
use crate::report;
use crate::runner::{CommandRunner, RunOptions};
use crate::scanner;
use gradekit_common::config::ScoringMode;
use gradekit_common::types::{GradingResult, ScoredTestItem};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Everything one grading run needs
#[derive(Debug, Clone)]
pub struct GradingJob {
    pub test_name: String,
    pub setup_command: Option<String>,
    pub command: String,
    pub timeout: Duration,
    pub max_score: f64,
    pub scoring_mode: ScoringMode,
    pub reports_dir: PathBuf,
    pub env: CommandEnv,
    pub inherit_stdio: bool,
}

impl GradingJob {
    pub fn from_inputs(inputs: &GraderInputs, workspace: &Path, env: CommandEnv) -> anyhow::Result<Self> {
        Ok(Self {
            test_name: inputs.test_name.clone(),
            setup_command: inputs.setup_command().map(str::to_string),
            command: inputs.command.clone(),
            timeout: inputs.timeout()?,
            max_score: inputs.max_score,
            scoring_mode: inputs.scoring_mode,
            reports_dir: inputs.reports_dir_in(workspace),
            env,
            inherit_stdio: true,
        })
    }

    fn context(&self) -> CommandContext<'_> {
        CommandContext {
            test_name: &self.test_name,
            command: &self.command,
            max_score: self.max_score,
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            timeout: self.timeout,
            env: self.env.clone(),
            inherit_stdio: self.inherit_stdio,
        }
    }
}

/// Run a grading job to a result.
///
/// Never fails: command failures and unusable reports end up in the
/// returned result.
///
/// - Reports already in the directory (and usable) skip command execution
/// - A failing command still gets its reports scored; the classified
///   failure is only used when no report yields an item
#[tracing::instrument(skip_all, fields(test = %job.test_name))]
pub async fn execute(job: &GradingJob, runner: &dyn CommandRunner) -> GradingResult {
    let existing = list_reports(&job.reports_dir).await;
    if !existing.is_empty() {
        let items = score_reports(job, &existing).await;
        if let Some(result) = assembler::from_reports(items, job.max_score) {
            info!(
                reports = existing.len(),
                dir = %job.reports_dir.display(),
                "Reports already present, skipping command execution"
            );
            return result;
        }
        warn!(
            reports = existing.len(),
            "Existing reports produced no scores, running commands"
        );
    }

    let outcome = run_commands(job, runner).await;

    let files = list_reports(&job.reports_dir).await;
    let items = score_reports(job, &files).await;

    if !items.is_empty() && !outcome.status.is_pass() {
        info!(
            status = %outcome.status,
            items = items.len(),
            "Command failed but produced reports, scoring them"
        );
    }

    assembler::assemble(items, &outcome, &job.context())
}

async fn run_commands(job: &GradingJob, runner: &dyn CommandRunner) -> RawOutcome {
    let options = job.run_options();

    if let Some(setup) = &job.setup_command {
        info!(command = %setup, "Running setup command");
        if let Err(e) = runner.run(setup, &options).await {
            warn!(command = %setup, error = %e, "Setup command failed");
            // Graded command never started
            return RawOutcome::failed(&e, 0.0);
        }
    }

    info!(command = %job.command, timeout_secs = job.timeout.as_secs_f64(), "Running command");

    let start = Instant::now();
    let result = runner.run(&job.command, &options).await;
    let elapsed_millis = start.elapsed().as_millis() as f64;

    match result {
        Ok(stdout) => {
            info!(elapsed_ms = elapsed_millis, "Command succeeded");
            RawOutcome::succeeded(String::from_utf8_lossy(&stdout).into_owned(), elapsed_millis)
        }
        Err(e) => {
            warn!(error = %e, elapsed_ms = elapsed_millis, "Command failed");
            RawOutcome::failed(&e, elapsed_millis)
        }
    }
}

async fn list_reports(dir: &Path) -> Vec<String> {
    match scanner::scan_reports(dir).await {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to scan report directory");
            Vec::new()
        }
    }
}

async fn score_reports(job: &GradingJob, files: &[String]) -> Vec<ScoredTestItem> {
    if files.is_empty() {
        return Vec::new();
    }
    let suites = report::load_reports(&job.reports_dir, files).await;
    allocator::allocate(&suites, job.max_score, job.scoring_mode, &job.command)
}
