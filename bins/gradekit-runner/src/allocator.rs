/// Score Allocator - Report-Driven Scoring Logic
///
/// **Core Responsibility:**
/// Turn parsed suites into scored items that share a fixed score budget.
///
/// **Critical Properties:**
/// - Knows nothing about processes or timeouts
/// - Knows nothing about XML
/// - Pure function: (suites, budget, mode) → scored items
///
/// **Scoring Rules:**
/// - Suite mode: one item per report; every eligible (non-skipped) test in
///   the run is worth the same share, `max_score / total_eligible`
/// - Case mode: the budget is split evenly per report file, then evenly
///   across that file's eligible cases; failed and skipped cases score 0
/// - A zero eligible count scores 0, never divides
/// - Sum of item scores never exceeds `max_score`
use crate::report::{CaseReport, SuiteReport};
use gradekit_common::config::ScoringMode;
use gradekit_common::types::{ScoredTestItem, TestStatus};
use tracing::{debug, info};

pub const PASSED_MESSAGE: &str = "Test passed";
pub const SKIPPED_MESSAGE: &str = "Test skipped";

/// Pick the concrete granularity for this set of suites
pub fn resolve_mode(mode: ScoringMode, suites: &[SuiteReport]) -> ScoringMode {
    match mode {
        ScoringMode::Auto if suites.iter().any(SuiteReport::has_case_detail) => ScoringMode::Case,
        ScoringMode::Auto => ScoringMode::Suite,
        explicit => explicit,
    }
}

/// Score every suite under `mode`.
///
/// `command` is recorded as the detail of items that carry no diagnostic
/// text of their own.
pub fn allocate(
    suites: &[SuiteReport],
    max_score: f64,
    mode: ScoringMode,
    command: &str,
) -> Vec<ScoredTestItem> {
    let resolved = resolve_mode(mode, suites);

    let items = match resolved {
        ScoringMode::Case => allocate_by_case(suites, max_score, command),
        _ => allocate_by_suite(suites, max_score, command),
    };

    info!(
        mode = %resolved,
        suites = suites.len(),
        items = items.len(),
        score = items.iter().map(|i| i.score).sum::<f64>(),
        max_score,
        "Allocated scores"
    );

    items
}

/// `budget * part / whole`, or 0 when nothing is eligible
fn share(budget: f64, part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        budget * part as f64 / whole as f64
    }
}

fn allocate_by_suite(suites: &[SuiteReport], max_score: f64, command: &str) -> Vec<ScoredTestItem> {
    let total_eligible: u64 = suites.iter().map(|s| s.eligible() as u64).sum();

    suites
        .iter()
        .map(|suite| {
            let score = share(max_score, suite.passed() as u64, total_eligible);
            suite_item(suite, score, command)
        })
        .collect()
}

fn allocate_by_case(suites: &[SuiteReport], max_score: f64, command: &str) -> Vec<ScoredTestItem> {
    let per_file_budget = if suites.is_empty() {
        0.0
    } else {
        max_score / suites.len() as f64
    };

    let mut items = Vec::new();
    for suite in suites {
        if !suite.has_case_detail() {
            // No case detail in this file: score it whole, inside its own budget
            let score = share(per_file_budget, suite.passed() as u64, suite.eligible() as u64);
            items.push(suite_item(suite, score, command));
            continue;
        }

        let eligible = suite.cases.iter().filter(|c| !c.skipped).count() as u64;
        let per_case_score = share(per_file_budget, 1, eligible);

        debug!(
            file = %suite.file_name,
            eligible,
            per_file_budget,
            per_case_score,
            "Splitting file budget across cases"
        );

        items.extend(
            suite
                .cases
                .iter()
                .map(|case| case_item(suite, case, per_case_score, command)),
        );
    }

    items
}

fn suite_item(suite: &SuiteReport, score: f64, command: &str) -> ScoredTestItem {
    let status = if suite.is_clean() {
        TestStatus::Pass
    } else {
        TestStatus::Fail
    };

    ScoredTestItem {
        name: suite.file_name.clone(),
        status,
        score,
        message: suite.summary(),
        detail: command.to_string(),
        filename: suite.file_name.clone(),
        line_no: 0,
        elapsed_millis: suite.elapsed_seconds * 1000.0,
    }
}

fn case_item(suite: &SuiteReport, case: &CaseReport, per_case_score: f64, command: &str) -> ScoredTestItem {
    let (status, score, message, detail) = if case.skipped {
        let message = match &case.skip_reason {
            Some(reason) => format!("{}: {}", SKIPPED_MESSAGE, reason),
            None => SKIPPED_MESSAGE.to_string(),
        };
        (TestStatus::Pass, 0.0, message, command.to_string())
    } else if case.failed {
        let detail = case
            .failure_body
            .clone()
            .or_else(|| case.failure_type.clone())
            .unwrap_or_else(|| command.to_string());
        let message = case
            .failure_message
            .clone()
            .unwrap_or_else(|| crate::report::DEFAULT_FAILURE_MESSAGE.to_string());
        (TestStatus::Fail, 0.0, message, detail)
    } else {
        (TestStatus::Pass, per_case_score, PASSED_MESSAGE.to_string(), command.to_string())
    };

    ScoredTestItem {
        name: case.qualified_name.clone(),
        status,
        score,
        message,
        detail,
        filename: suite.file_name.clone(),
        line_no: 0,
        elapsed_millis: case.elapsed_seconds * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    /// Helper to create a summary-only suite
    fn make_suite(file: &str, tests: u32, failures: u32, errors: u32, skipped: u32) -> SuiteReport {
        SuiteReport {
            file_name: file.to_string(),
            total_cases: tests,
            skipped,
            failures,
            errors,
            elapsed_seconds: 0.5,
            cases: Vec::new(),
        }
    }

    /// Helper to create a case
    fn make_case(name: &str, failed: bool, skipped: bool) -> CaseReport {
        CaseReport {
            qualified_name: name.to_string(),
            failed,
            skipped,
            skip_reason: None,
            elapsed_seconds: 0.25,
            failure_type: failed.then(|| "java.lang.AssertionError".to_string()),
            failure_message: failed.then(|| "expected true".to_string()),
            failure_body: None,
        }
    }

    fn with_cases(file: &str, cases: Vec<CaseReport>) -> SuiteReport {
        let failures = cases.iter().filter(|c| c.failed).count() as u32;
        let skipped = cases.iter().filter(|c| c.skipped).count() as u32;
        SuiteReport {
            file_name: file.to_string(),
            total_cases: cases.len() as u32,
            skipped,
            failures,
            errors: 0,
            elapsed_seconds: 1.0,
            cases,
        }
    }

    fn total(items: &[ScoredTestItem]) -> f64 {
        items.iter().map(|i| i.score).sum()
    }

    #[test]
    fn test_all_passing_suite_gets_full_score() {
        let suites = vec![make_suite("TEST-calc.xml", 10, 0, 0, 2)];

        let items = allocate(&suites, 100.0, ScoringMode::Auto, "mvn test");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].score, 100.0);
        assert_eq!(items[0].status, TestStatus::Pass);
        assert_eq!(items[0].name, "TEST-calc.xml");
        assert_eq!(items[0].detail, "mvn test");
        assert_eq!(items[0].elapsed_millis, 500.0);
    }

    #[test]
    fn test_failures_reduce_suite_score() {
        let suites = vec![make_suite("TEST-calc.xml", 10, 3, 0, 2)];

        let items = allocate(&suites, 100.0, ScoringMode::Suite, "mvn test");

        assert_eq!(items[0].score, 62.5);
        assert_eq!(items[0].status, TestStatus::Fail);
        assert_eq!(
            items[0].message,
            "Tests: 10, Passed: 5, Failures: 3, Errors: 0, Skipped: 2"
        );
    }

    #[test]
    fn test_errors_fail_suite() {
        let suites = vec![make_suite("TEST-io.xml", 4, 0, 1, 0)];
        let items = allocate(&suites, 40.0, ScoringMode::Suite, "mvn test");
        assert_eq!(items[0].score, 30.0);
        assert_eq!(items[0].status, TestStatus::Fail);
    }

    #[test]
    fn test_zero_eligible_suite_scores_zero() {
        let suites = vec![make_suite("TEST-skipped.xml", 3, 0, 0, 3)];
        let items = allocate(&suites, 100.0, ScoringMode::Suite, "mvn test");
        assert_eq!(items[0].score, 0.0);
        assert_eq!(items[0].status, TestStatus::Pass);

        let empty = vec![make_suite("TEST-empty.xml", 0, 0, 0, 0)];
        let items = allocate(&empty, 100.0, ScoringMode::Suite, "mvn test");
        assert_eq!(items[0].score, 0.0);
    }

    #[test]
    fn test_suite_mode_shares_budget_across_files() {
        let suites = vec![
            make_suite("TEST-a.xml", 6, 0, 0, 0),
            make_suite("TEST-b.xml", 2, 0, 0, 0),
        ];

        let items = allocate(&suites, 100.0, ScoringMode::Suite, "mvn test");

        assert_eq!(items[0].score, 75.0);
        assert_eq!(items[1].score, 25.0);
        assert!((total(&items) - 100.0).abs() < EPSILON);
    }

    #[test]
    fn test_per_case_split_across_files() {
        let suites = vec![
            with_cases("TEST-a.xml", vec![make_case("A.one", false, false), make_case("A.two", false, false)]),
            with_cases("TEST-b.xml", vec![make_case("B.one", false, false), make_case("B.two", false, false)]),
        ];

        let items = allocate(&suites, 100.0, ScoringMode::Auto, "gradle test");

        assert_eq!(items.len(), 4);
        for item in &items {
            assert_eq!(item.score, 25.0);
            assert_eq!(item.status, TestStatus::Pass);
            assert_eq!(item.message, PASSED_MESSAGE);
        }
        assert_eq!(items[0].name, "A.one");
        assert_eq!(items[2].filename, "TEST-b.xml");
        assert_eq!(items[0].elapsed_millis, 250.0);
    }

    #[test]
    fn test_failed_and_skipped_cases_score_zero() {
        let suites = vec![with_cases(
            "TEST-a.xml",
            vec![
                make_case("A.one", false, false),
                make_case("A.two", true, false),
                make_case("A.three", false, true),
            ],
        )];

        let items = allocate(&suites, 10.0, ScoringMode::Case, "make test");

        assert_eq!(items[0].score, 5.0);
        assert_eq!(items[1].score, 0.0);
        assert_eq!(items[1].status, TestStatus::Fail);
        assert_eq!(items[1].message, "expected true");
        assert_eq!(items[1].detail, "java.lang.AssertionError");
        assert_eq!(items[2].score, 0.0);
        assert_eq!(items[2].status, TestStatus::Pass);
        assert_eq!(items[2].message, SKIPPED_MESSAGE);
    }

    #[test]
    fn test_erroring_case_scores_zero_in_every_mode() {
        let report = crate::report::parse_report(
            "TEST-A.xml",
            r#"<testsuite tests="2" errors="1">
  <testcase classname="A" name="x"><error message="NPE" type="java.lang.NullPointerException"/></testcase>
  <testcase classname="A" name="y"/>
</testsuite>"#,
        )
        .unwrap()
        .unwrap();
        let suites = vec![report];

        let by_case = allocate(&suites, 100.0, ScoringMode::Auto, "mvn test");
        assert_eq!(by_case.len(), 2);
        assert_eq!(by_case[0].name, "A.x");
        assert_eq!(by_case[0].status, TestStatus::Fail);
        assert_eq!(by_case[0].score, 0.0);
        assert_eq!(by_case[0].message, "NPE");
        assert_eq!(by_case[1].status, TestStatus::Pass);
        assert_eq!(by_case[1].score, 50.0);

        let by_suite = allocate(&suites, 100.0, ScoringMode::Suite, "mvn test");
        assert_eq!(by_suite[0].status, TestStatus::Fail);
        assert_eq!(by_suite[0].score, 50.0);
    }

    #[test]
    fn test_failure_body_preferred_as_detail() {
        let mut case = make_case("A.one", true, false);
        case.failure_body = Some("stack trace".to_string());
        let suites = vec![with_cases("TEST-a.xml", vec![case])];

        let items = allocate(&suites, 10.0, ScoringMode::Case, "make test");

        assert_eq!(items[0].detail, "stack trace");
    }

    #[test]
    fn test_zero_eligible_file_does_not_affect_others() {
        let suites = vec![
            with_cases("TEST-a.xml", vec![make_case("A.skip", false, true)]),
            with_cases("TEST-b.xml", vec![make_case("B.one", false, false)]),
        ];

        let items = allocate(&suites, 100.0, ScoringMode::Case, "make test");

        assert_eq!(items[0].score, 0.0);
        assert_eq!(items[1].score, 50.0);
    }

    #[test]
    fn test_case_mode_with_summary_only_file() {
        let suites = vec![
            make_suite("TEST-a.xml", 4, 1, 0, 0),
            with_cases("TEST-b.xml", vec![make_case("B.one", false, false)]),
        ];

        let items = allocate(&suites, 100.0, ScoringMode::Auto, "make test");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "TEST-a.xml");
        assert_eq!(items[0].score, 37.5);
        assert_eq!(items[1].score, 50.0);
    }

    #[test]
    fn test_explicit_suite_mode_ignores_case_detail() {
        let suites = vec![with_cases(
            "TEST-a.xml",
            vec![make_case("A.one", false, false), make_case("A.two", true, false)],
        )];

        let items = allocate(&suites, 100.0, ScoringMode::Suite, "make test");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].score, 50.0);
        assert_eq!(items[0].status, TestStatus::Fail);
    }

    #[test]
    fn test_resolve_mode() {
        let summary = vec![make_suite("TEST-a.xml", 1, 0, 0, 0)];
        let detailed = vec![with_cases("TEST-b.xml", vec![make_case("B", false, false)])];

        assert_eq!(resolve_mode(ScoringMode::Auto, &summary), ScoringMode::Suite);
        assert_eq!(resolve_mode(ScoringMode::Auto, &detailed), ScoringMode::Case);
        assert_eq!(resolve_mode(ScoringMode::Case, &summary), ScoringMode::Case);
        assert_eq!(resolve_mode(ScoringMode::Suite, &detailed), ScoringMode::Suite);
        assert_eq!(resolve_mode(ScoringMode::Auto, &[]), ScoringMode::Suite);
    }

    #[test]
    fn test_scores_never_exceed_budget() {
        let budgets = [0.0, 1.0, 7.0, 10.0, 33.0, 100.0];
        for &budget in &budgets {
            for files in 1..=4u32 {
                let suites: Vec<SuiteReport> = (0..files)
                    .map(|f| {
                        let cases = (0..(f + 2))
                            .map(|c| make_case(&format!("T{f}.c{c}"), c % 3 == 1, c % 4 == 3))
                            .collect();
                        with_cases(&format!("TEST-{f}.xml"), cases)
                    })
                    .collect();

                for mode in [ScoringMode::Suite, ScoringMode::Case] {
                    let items = allocate(&suites, budget, mode, "cmd");
                    assert!(
                        total(&items) <= budget + EPSILON,
                        "budget {budget}, files {files}, mode {mode}: {}",
                        total(&items)
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_input_yields_no_items() {
        assert!(allocate(&[], 100.0, ScoringMode::Auto, "cmd").is_empty());
        assert!(allocate(&[], 100.0, ScoringMode::Case, "cmd").is_empty());
    }
}
