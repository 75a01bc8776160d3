// Action inputs and subprocess environment for the grading runner
use anyhow::{bail, Result};
use clap::Parser;
use gradekit_common::config::{
    ScoringMode, DEFAULT_MAX_SCORE, DEFAULT_REPORTS_DIR, DEFAULT_TIMEOUT_MINUTES,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inputs of one grading run.
///
/// Every value can be given as a flag or through the `INPUT_*` variables
/// the actions runner exports for `with:` parameters.
#[derive(Debug, Clone, Parser)]
#[command(name = "gradekit-runner")]
#[command(about = "Run a test command and publish a scored autograding result", long_about = None)]
pub struct GraderInputs {
    /// Name of the fallback test item
    #[arg(long, env = "INPUT_TEST-NAME")]
    pub test_name: String,

    /// Command run once before the graded command
    #[arg(long, env = "INPUT_SETUP-COMMAND")]
    pub setup_command: Option<String>,

    /// Graded command
    #[arg(long, env = "INPUT_COMMAND")]
    pub command: String,

    /// Timeout in minutes, applied to each command
    #[arg(long, env = "INPUT_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_MINUTES)]
    pub timeout: f64,

    /// Points available for this test
    #[arg(long, env = "INPUT_MAX-SCORE", default_value_t = DEFAULT_MAX_SCORE)]
    pub max_score: f64,

    /// How the score is split across reports (auto, suite, case)
    #[arg(long, env = "INPUT_SCORING-MODE", default_value_t = ScoringMode::Auto)]
    pub scoring_mode: ScoringMode,

    /// Directory scanned for JUnit XML reports
    #[arg(long, env = "INPUT_REPORTS-DIR", default_value = DEFAULT_REPORTS_DIR)]
    pub reports_dir: PathBuf,

    /// File the result line is appended to; printed to stdout when unset
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

impl GraderInputs {
    /// Reject inputs the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.test_name.trim().is_empty() {
            bail!("Input 'test-name' is required");
        }
        if self.command.trim().is_empty() {
            bail!("Input 'command' is required");
        }
        if !self.timeout.is_finite() || self.timeout <= 0.0 {
            bail!("Input 'timeout' must be a positive number of minutes, got {}", self.timeout);
        }
        self.timeout()?;
        if !self.max_score.is_finite() || self.max_score < 0.0 {
            bail!("Input 'max-score' must be a non-negative number, got {}", self.max_score);
        }
        Ok(())
    }

    /// Setup command, with blank input treated as unset
    pub fn setup_command(&self) -> Option<&str> {
        self.setup_command
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }

    /// Timeout as a `Duration`; fails when the minutes do not fit one
    pub fn timeout(&self) -> Result<Duration> {
        match Duration::try_from_secs_f64(self.timeout * 60.0) {
            Ok(timeout) => Ok(timeout),
            Err(e) => bail!("Input 'timeout' of {} minutes is out of range: {}", self.timeout, e),
        }
    }

    /// Report directory resolved against the workspace root
    pub fn reports_dir_in(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.reports_dir)
    }
}

/// Fixed environment handed to every child process.
///
/// The child's inherited environment is cleared and replaced by these
/// variables only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    vars: Vec<(String, String)>,
}

impl CommandEnv {
    /// Build the grading environment from the current process environment
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut env = Self::default();
        if let Some(path) = lookup("PATH") {
            env.set("PATH", path);
        }
        env.set("FORCE_COLOR", "true");
        env.set("DOTNET_CLI_HOME", "/tmp");
        env.set("DOTNET_NOLOGO", "true");
        if let Some(home) = lookup("HOME") {
            env.set("HOME", home);
        }
        env
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
