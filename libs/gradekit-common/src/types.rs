use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version of the serialized result
pub const RESULT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "pass"),
            TestStatus::Fail => write!(f, "fail"),
            TestStatus::Error => write!(f, "error"),
        }
    }
}

/// One scored entry of a grading result.
///
/// Field names on the wire follow the autograding result format:
/// `detail` is published as `test_code`, `elapsed_millis` as `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTestItem {
    pub name: String,
    pub status: TestStatus,
    pub score: f64,
    pub message: String,
    #[serde(rename = "test_code")]
    pub detail: String,
    /// Report file the item was derived from, empty for command-level items
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub line_no: u32,
    #[serde(rename = "duration")]
    pub elapsed_millis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub version: u32,
    pub status: TestStatus,
    pub max_score: f64,
    pub tests: Vec<ScoredTestItem>,
}

impl GradingResult {
    /// Build a result from scored items.
    ///
    /// The overall status is `pass` only when every item passes. Otherwise it
    /// is `error` if any item errored, `fail` if not.
    pub fn from_items(tests: Vec<ScoredTestItem>, max_score: f64) -> Self {
        let status = if tests.iter().all(|t| t.status.is_pass()) {
            TestStatus::Pass
        } else if tests.iter().any(|t| t.status == TestStatus::Error) {
            TestStatus::Error
        } else {
            TestStatus::Fail
        };

        Self {
            version: RESULT_VERSION,
            status,
            max_score,
            tests,
        }
    }

    /// Sum of all item scores
    pub fn total_score(&self) -> f64 {
        self.tests.iter().map(|t| t.score).sum()
    }

    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }
}
