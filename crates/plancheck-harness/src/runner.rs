//! Case execution and reporting.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use plancheck_plan::Plan;

use crate::apply::ApplyTestCase;
use crate::case::{TestCase, TupleTestCase};
use crate::compare::{ComparisonKind, Operand, Validator};
use crate::error::CaseFailure;
use crate::report::{CaseResult, SuiteReport};
use crate::structured_log::{LogEntry, LogLevel, LogSink, Outcome};

/// Placeholder in tuple address templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// What one case produced.
pub(crate) struct Evaluation {
    pub(crate) actual: Option<String>,
    pub(crate) result: Result<(), CaseFailure>,
}

/// Descriptive fields copied into the case result.
struct CaseMeta<'a> {
    resource: &'a str,
    attribute_path: &'a str,
    comparison: ComparisonKind,
    expected: String,
    message: Option<&'a str>,
}

/// Runs batches of cases, one report per batch.
#[derive(Debug, Clone)]
pub struct TestRunner {
    suite: String,
    log: Option<Arc<LogSink>>,
}

impl TestRunner {
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            log: None,
        }
    }

    /// Emit a `case_result` entry per case and a `suite_end` entry per batch.
    #[must_use]
    pub fn with_log(mut self, log: Arc<LogSink>) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Run every case against `plan`. A failing or panicking case does not
    /// stop the others.
    pub fn run<'a, I>(&self, tests: I, plan: &Plan) -> SuiteReport
    where
        I: IntoIterator<Item = (&'a String, &'a TestCase)>,
    {
        let results = tests
            .into_iter()
            .map(|(name, case)| self.run_case(name, case, plan))
            .collect();
        self.finish(results)
    }

    /// Expand each tuple into one equality case per attribute, addressed by
    /// `address_template` with `{name}` replaced by the tuple's name.
    pub fn run_tuples<'a, I>(&self, address_template: &str, tests: I, plan: &Plan) -> SuiteReport
    where
        I: IntoIterator<Item = (&'a String, &'a TupleTestCase)>,
    {
        let mut results = Vec::new();
        for (tuple_name, tuple) in tests {
            let address = address_template.replace(NAME_PLACEHOLDER, tuple_name);
            for (attr, expectation) in &tuple.expected {
                let case = TestCase::new(
                    address.clone(),
                    expectation.json_path.clone(),
                    expectation.expected_value.clone(),
                );
                results.push(self.run_case(&format!("{tuple_name}/{attr}"), &case, plan));
            }
        }
        self.finish(results)
    }

    /// Run post-apply cases, each resolving both of its sides.
    pub fn run_apply<'a, I>(&self, tests: I) -> SuiteReport
    where
        I: IntoIterator<Item = (&'a String, &'a ApplyTestCase)>,
    {
        let results = tests
            .into_iter()
            .map(|(name, case)| {
                let started = Instant::now();
                let (expected, evaluation) = match catch_unwind(AssertUnwindSafe(|| case.evaluate())) {
                    Ok(done) => done,
                    Err(payload) => (Operand::Text(String::new()), panicked(payload.as_ref())),
                };
                let meta = CaseMeta {
                    resource: "apply",
                    attribute_path: "",
                    comparison: case.comparison(),
                    expected: expected.to_string(),
                    message: case.message(),
                };
                self.record(name, meta, evaluation, started)
            })
            .collect();
        self.finish(results)
    }

    fn run_case(&self, name: &str, case: &TestCase, plan: &Plan) -> CaseResult {
        let started = Instant::now();
        let evaluation = guarded(|| evaluate(case, plan));
        let meta = CaseMeta {
            resource: case.resource(),
            attribute_path: case.attribute_path(),
            comparison: case.comparison(),
            expected: case.expected().to_string(),
            message: case.message(),
        };
        self.record(name, meta, evaluation, started)
    }

    fn record(&self, name: &str, meta: CaseMeta<'_>, evaluation: Evaluation, started: Instant) -> CaseResult {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let failure = evaluation.result.as_ref().err();
        let result = CaseResult {
            case_name: name.to_string(),
            resource: meta.resource.to_string(),
            attribute_path: meta.attribute_path.to_string(),
            comparison: meta.comparison,
            passed: failure.is_none(),
            expected: meta.expected,
            actual: evaluation.actual,
            message: meta.message.map(str::to_string),
            failure: failure.map(ToString::to_string),
            duration_ms,
        };

        if let Some(log) = &self.log {
            let (level, outcome) = match failure {
                None => (LogLevel::Info, Outcome::Pass),
                Some(CaseFailure::Mismatch(_)) => (LogLevel::Error, Outcome::Fail),
                Some(_) => (LogLevel::Error, Outcome::Error),
            };
            let mut entry = LogEntry::new(String::new(), level, "case_result")
                .with_case(name)
                .with_locator(&result.resource, &result.attribute_path)
                .with_comparison(result.comparison)
                .with_outcome(outcome)
                .with_values(&result.expected, result.actual.clone())
                .with_duration_ms(duration_ms);
            if let Some(text) = result.failure.as_ref().or(result.message.as_ref()) {
                entry = entry.with_message(text);
            }
            emit(log, entry);
        }
        result
    }

    fn finish(&self, results: Vec<CaseResult>) -> SuiteReport {
        let report = SuiteReport::from_results(&self.suite, results);
        tracing::info!(
            suite = %report.suite,
            total = report.total,
            failed = report.failed,
            "suite finished"
        );
        if let Some(log) = &self.log {
            let level = if report.all_passed() { LogLevel::Info } else { LogLevel::Warn };
            let entry = LogEntry::new(String::new(), level, "suite_end").with_details(serde_json::json!({
                "total": report.total,
                "passed": report.passed,
                "failed": report.failed,
            }));
            emit(log, entry);
            // Sinks often live in process-wide statics that are never dropped.
            if let Err(e) = log.flush() {
                tracing::warn!(error = %e, suite = log.suite(), "failed to flush evidence log");
            }
        }
        report
    }
}

fn emit(log: &LogSink, entry: LogEntry) {
    if let Err(e) = log.emit_entry(entry) {
        tracing::warn!(error = %e, suite = log.suite(), "failed to write evidence log entry");
    }
}

fn evaluate(case: &TestCase, plan: &Plan) -> Evaluation {
    let actual = match case
        .retriever()
        .retrieve(plan, case.resource(), case.attribute_path())
    {
        Ok(actual) => actual,
        Err(e) => {
            return Evaluation {
                actual: None,
                result: Err(e.into()),
            };
        }
    };
    let result = Validator::new(case.comparison(), case.expected().clone())
        .check(&Operand::Text(actual.clone()), case.message())
        .map_err(CaseFailure::from);
    Evaluation {
        actual: Some(actual),
        result,
    }
}

fn guarded(f: impl FnOnce() -> Evaluation) -> Evaluation {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| panicked(payload.as_ref()))
}

pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Evaluation {
    let text = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    Evaluation {
        actual: None,
        result: Err(CaseFailure::Panicked(text)),
    }
}

/// Run one case against `plan`.
pub fn run_test(case: &TestCase, plan: &Plan) -> Result<(), CaseFailure> {
    guarded(|| evaluate(case, plan)).result
}

/// Run a batch of named cases against `plan`.
pub fn run_tests<'a, I>(tests: I, plan: &Plan) -> SuiteReport
where
    I: IntoIterator<Item = (&'a String, &'a TestCase)>,
{
    TestRunner::new("plan").run(tests, plan)
}

/// Run tuple cases; see [`TestRunner::run_tuples`].
pub fn run_tuple_tests<'a, I>(address_template: &str, tests: I, plan: &Plan) -> SuiteReport
where
    I: IntoIterator<Item = (&'a String, &'a TupleTestCase)>,
{
    TestRunner::new("tuples").run_tuples(address_template, tests, plan)
}
