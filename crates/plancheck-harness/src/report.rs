//! Per-case results and suite reports.

use serde::{Deserialize, Serialize};

use crate::compare::ComparisonKind;

/// Result of running a single case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Name the case was registered under.
    pub case_name: String,
    /// Resource address, variable or output the value came from.
    pub resource: String,
    pub attribute_path: String,
    pub comparison: ComparisonKind,
    pub passed: bool,
    pub expected: String,
    /// Retrieved value; absent when retrieval itself failed.
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rendered failure, when the case did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of one batch of cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub timestamp: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Results sorted by case name.
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn from_results(suite: impl Into<String>, mut results: Vec<CaseResult>) -> Self {
        results.sort_by(|a, b| a.case_name.cmp(&b.case_name));
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            suite: suite.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    #[must_use]
    pub fn result(&self, case_name: &str) -> Option<&CaseResult> {
        self.results.iter().find(|r| r.case_name == case_name)
    }

    /// Fail the calling test, listing every failed case.
    #[track_caller]
    pub fn assert_passed(&self) {
        if self.all_passed() {
            return;
        }
        let mut out = format!(
            "{} of {} cases failed in `{}`:\n",
            self.failed, self.total, self.suite
        );
        for r in self.failures() {
            let failure = r.failure.as_deref().unwrap_or("failed");
            out.push_str(&format!("\n[{}] {}\n{failure}\n", r.case_name, r.resource));
        }
        panic!("{out}");
    }

    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.suite));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.total));
        out.push_str(&format!("- Passed: {}\n", self.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.failed));

        out.push_str("| Case | Resource | Comparison | Expected | Actual | Status |\n");
        out.push_str("|------|----------|------------|----------|--------|--------|\n");
        for r in &self.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | `{}` | {} | {} | {} | {} |\n",
                r.case_name,
                r.resource,
                r.comparison,
                cell(&r.expected),
                cell(r.actual.as_deref().unwrap_or("-")),
                status
            ));
        }
        out
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Several suites aggregated for one process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub suites: Vec<SuiteReport>,
}

impl RunSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: SuiteReport) {
        self.suites.push(report);
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.suites.iter().map(|s| s.total).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.suites.iter().map(|s| s.failed).sum()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.suites.iter().all(SuiteReport::all_passed)
    }

    /// 0 when every suite passed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }
}
