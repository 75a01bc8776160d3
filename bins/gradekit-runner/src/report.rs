/// JUnit XML Report Parsing
///
/// Decodes one `<testsuite>` report (the layout Maven Surefire and most
/// JUnit-compatible runners write) into a `SuiteReport`.
///
/// **Decoding Rules:**
/// - Root must be `<testsuite>`; any other root is "no suite", not an error
/// - Missing count attributes default to 0, missing/unreadable `time` to 0.0
/// - A `<testcase>` is failed iff it has at least one `<failure>` or
///   `<error>` child; details come from the first failure, else the first error
/// - A `<testcase>` with a `<skipped>` child is not eligible for scoring
/// - A report without `<testcase>` elements has empty `cases`
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const SUITE_ELEMENT: &str = "testsuite";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Test failed";

#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected report structure: {0}")]
    Decode(#[from] quick_xml::DeError),

    #[error("report has no root element")]
    MissingRoot,

    #[error("failed to read report: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregate counts and cases of one report file
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub file_name: String,
    pub total_cases: u32,
    pub skipped: u32,
    pub failures: u32,
    pub errors: u32,
    pub elapsed_seconds: f64,
    /// Empty when the report carries no case-level detail
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    /// Cases counted toward the scoring denominator
    pub fn eligible(&self) -> u32 {
        self.total_cases.saturating_sub(self.skipped)
    }

    pub fn passed(&self) -> u32 {
        self.eligible()
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
    }

    /// No failures and no errors
    pub fn is_clean(&self) -> bool {
        self.failures == 0 && self.errors == 0
    }

    pub fn has_case_detail(&self) -> bool {
        !self.cases.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Tests: {}, Passed: {}, Failures: {}, Errors: {}, Skipped: {}",
            self.total_cases,
            self.passed(),
            self.failures,
            self.errors,
            self.skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    /// `classname.name`, or whichever of the two is present
    pub qualified_name: String,
    pub failed: bool,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub elapsed_seconds: f64,
    pub failure_type: Option<String>,
    pub failure_message: Option<String>,
    pub failure_body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuiteElement {
    #[serde(rename = "@tests", default)]
    tests: u32,
    #[serde(rename = "@skipped", default)]
    skipped: u32,
    #[serde(rename = "@failures", default)]
    failures: u32,
    #[serde(rename = "@errors", default)]
    errors: u32,
    #[serde(rename = "@time", default)]
    time: Option<String>,
    #[serde(rename = "testcase", default)]
    cases: Vec<CaseElement>,
}

#[derive(Debug, Deserialize)]
struct CaseElement {
    #[serde(rename = "@classname", default)]
    classname: Option<String>,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@time", default)]
    time: Option<String>,
    #[serde(rename = "failure", default)]
    failures: Vec<FailureElement>,
    /// Unexpected exceptions, written by Surefire as `<error>`
    #[serde(rename = "error", default)]
    errors: Vec<FailureElement>,
    #[serde(rename = "skipped", default)]
    skipped: Vec<SkippedElement>,
}

#[derive(Debug, Deserialize)]
struct SkippedElement {
    #[serde(rename = "@message", default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FailureElement {
    #[serde(rename = "@message", default)]
    message: Option<String>,
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "$text", default)]
    body: Option<String>,
}

impl CaseElement {
    fn into_report(self) -> CaseReport {
        let qualified_name = qualified_name(self.classname.as_deref(), self.name.as_deref());
        let failed = !self.failures.is_empty() || !self.errors.is_empty();
        let skipped = !self.skipped.is_empty();
        let skip_reason = self.skipped.into_iter().find_map(|s| non_blank(s.message));
        let first_failure = self.failures.into_iter().chain(self.errors).next();

        let (failure_type, failure_message, failure_body) = match first_failure {
            Some(failure) => (
                non_blank(failure.kind),
                Some(non_blank(failure.message).unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())),
                non_blank(failure.body),
            ),
            None => (None, None, None),
        };

        CaseReport {
            qualified_name,
            failed,
            skipped,
            skip_reason,
            elapsed_seconds: parse_seconds(self.time.as_deref()),
            failure_type,
            failure_message,
            failure_body,
        }
    }
}

/// Decode one report file's content.
///
/// `Ok(None)` means the document is well formed but its root is not a
/// `<testsuite>`.
pub fn parse_report(file_name: &str, content: &str) -> Result<Option<SuiteReport>, ReportParseError> {
    let root = root_element(content)?.ok_or(ReportParseError::MissingRoot)?;
    if root != SUITE_ELEMENT {
        debug!(file = file_name, root = %root, "Report root is not a testsuite, ignoring");
        return Ok(None);
    }

    let suite: SuiteElement = quick_xml::de::from_str(content)?;

    let report = SuiteReport {
        file_name: file_name.to_string(),
        total_cases: suite.tests,
        skipped: suite.skipped,
        failures: suite.failures,
        errors: suite.errors,
        elapsed_seconds: parse_seconds(suite.time.as_deref()),
        cases: suite.cases.into_iter().map(CaseElement::into_report).collect(),
    };

    if report.skipped as u64 + report.failures as u64 + report.errors as u64 > report.total_cases as u64 {
        warn!(
            file = file_name,
            tests = report.total_cases,
            skipped = report.skipped,
            failures = report.failures,
            errors = report.errors,
            "Report counts exceed total test count"
        );
    }

    Ok(Some(report))
}

/// Read and decode every listed report in `dir`.
///
/// A report that cannot be read or decoded is logged and skipped; the
/// remaining reports are still returned, in the order given.
pub async fn load_reports(dir: &Path, files: &[String]) -> Vec<SuiteReport> {
    let mut suites = Vec::with_capacity(files.len());

    for file in files {
        let path = dir.join(file);
        let parsed = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_report(file, &content),
            Err(e) => Err(ReportParseError::Io(e)),
        };

        match parsed {
            Ok(Some(suite)) => {
                debug!(
                    file = %file,
                    tests = suite.total_cases,
                    failures = suite.failures,
                    errors = suite.errors,
                    skipped = suite.skipped,
                    cases = suite.cases.len(),
                    "Parsed report"
                );
                suites.push(suite);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(file = %file, error = %e, "Error parsing report, skipping it");
            }
        }
    }

    suites
}

fn root_element(content: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(content);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn qualified_name(classname: Option<&str>, name: Option<&str>) -> String {
    let classname = classname.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    match (classname, name) {
        (Some(class), Some(name)) => format!("{}.{}", class, name),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => "unnamed".to_string(),
    }
}

/// Seconds as written by JUnit reporters, tolerating thousands separators
fn parse_seconds(raw: Option<&str>) -> f64 {
    raw.map(|s| s.trim().replace(',', ""))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .unwrap_or(0.0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
