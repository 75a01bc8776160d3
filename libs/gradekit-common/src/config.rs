// Grading defaults shared by the runner and tooling
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TIMEOUT_MINUTES: f64 = 10.0;
pub const DEFAULT_MAX_SCORE: f64 = 0.0;

/// Where Maven Surefire drops its JUnit XML reports, relative to the workspace
pub const DEFAULT_REPORTS_DIR: &str = "target/surefire-reports";
pub const REPORT_EXTENSION: &str = "xml";

/// How the score budget is split across parsed reports.
///
/// - `Suite`: one item per report file, equal share per eligible test across the run
/// - `Case`: budget split evenly per file, then per eligible case within a file
/// - `Auto`: `Case` when any report carries case detail, `Suite` otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Auto,
    Suite,
    Case,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Auto => write!(f, "auto"),
            ScoringMode::Suite => write!(f, "suite"),
            ScoringMode::Case => write!(f, "case"),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(ScoringMode::Auto),
            "suite" => Ok(ScoringMode::Suite),
            "case" => Ok(ScoringMode::Case),
            other => Err(format!(
                "unknown scoring mode '{}' (expected auto, suite or case)",
                other
            )),
        }
    }
}
