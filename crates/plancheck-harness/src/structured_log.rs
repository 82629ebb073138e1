//! Structured JSONL evidence log for plan validation runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL record with required + optional fields.
//! - [`LogSink`]: thread-safe writer that assigns sequential trace ids.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::compare::ComparisonKind;

// -- entries --

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Case outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    /// Retrieval or evaluation failed before a comparison could run.
    Error,
    Skip,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    /// Resource address, variable or output name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            suite: None,
            case: None,
            resource: None,
            attribute_path: None,
            comparison: None,
            outcome: None,
            expected: None,
            actual: None,
            message: None,
            duration_ms: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[must_use]
    pub fn with_case(mut self, case: impl Into<String>) -> Self {
        self.case = Some(case.into());
        self
    }

    /// Set the value locator: resource address and attribute path.
    #[must_use]
    pub fn with_locator(mut self, resource: impl Into<String>, attribute_path: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self.attribute_path = Some(attribute_path.into());
        self
    }

    #[must_use]
    pub fn with_comparison(mut self, comparison: ComparisonKind) -> Self {
        self.comparison = Some(comparison);
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the compared values.
    #[must_use]
    pub fn with_values(mut self, expected: impl Into<String>, actual: Option<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = actual;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// -- sink --

struct SinkState {
    writer: Box<dyn Write + Send>,
    seq: u64,
}

/// Shared JSONL writer. Trace ids are `<suite>::<run_id>::<seq>`.
pub struct LogSink {
    state: Mutex<SinkState>,
    suite: String,
    run_id: String,
}

impl LogSink {
    /// Append to the file at `path`, creating it if needed.
    pub fn to_file(path: &Path, suite: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::to_writer(std::io::BufWriter::new(file), suite, run_id))
    }

    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static, suite: &str, run_id: &str) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer: Box::new(writer),
                seq: 0,
            }),
            suite: suite.to_string(),
            run_id: run_id.to_string(),
        }
    }

    /// A run id derived from the current UTC time.
    #[must_use]
    pub fn run_id_now() -> String {
        chrono::Utc::now().format("run-%Y%m%dT%H%M%S").to_string()
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    fn trace_id(&self, seq: u64) -> String {
        format!("{}::{}::{:03}", self.suite, self.run_id, seq)
    }

    /// Emit a log entry with auto-generated trace_id and suite.
    pub fn emit(&self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let entry = LogEntry::new(String::new(), level, event);
        self.emit_entry(entry)
    }

    /// Emit a populated entry, filling `trace_id` and `suite` when unset.
    pub fn emit_entry(&self, mut entry: LogEntry) -> std::io::Result<LogEntry> {
        let mut state = self.state.lock();
        state.seq += 1;
        if entry.trace_id.is_empty() {
            entry.trace_id = self.trace_id(state.seq);
        }
        if entry.suite.is_none() {
            entry.suite = Some(self.suite.clone());
        }
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(state.writer, "{line}")?;
        Ok(entry)
    }

    pub fn flush(&self) -> std::io::Result<()> {
        self.state.lock().writer.flush()
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("suite", &self.suite)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let _ = self.state.get_mut().writer.flush();
    }
}

// -- validation --

/// Validation error for a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

impl LogValidationError {
    fn new(line_number: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            line_number,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

type JsonObject = serde_json::Map<String, serde_json::Value>;

fn str_field<'a>(obj: &'a JsonObject, field: &str) -> Option<&'a str> {
    obj.get(field).and_then(serde_json::Value::as_str)
}

/// Schema checks that run before deserialization, so every problem on the
/// line is reported rather than only the first.
fn schema_problems(obj: &JsonObject, line_number: usize) -> Vec<LogValidationError> {
    let mut problems: Vec<LogValidationError> = ["timestamp", "trace_id", "level", "event"]
        .into_iter()
        .filter(|field| !obj.contains_key(*field))
        .map(|field| LogValidationError::new(line_number, field, "required field missing"))
        .collect();

    let comparisons: Vec<&str> = ComparisonKind::ALL.iter().map(|k| k.as_str()).collect();
    let enums: [(&str, &[&str]); 3] = [
        ("level", &["trace", "debug", "info", "warn", "error"]),
        ("outcome", &["pass", "fail", "error", "skip"]),
        ("comparison", comparisons.as_slice()),
    ];
    for (field, allowed) in enums {
        if let Some(value) = str_field(obj, field)
            && !allowed.contains(&value)
        {
            problems.push(LogValidationError::new(line_number, field, format!("invalid {field}: '{value}'")));
        }
    }

    if let Some(timestamp) = str_field(obj, "timestamp")
        && chrono::DateTime::parse_from_rfc3339(timestamp).is_err()
    {
        problems.push(LogValidationError::new(
            line_number,
            "timestamp",
            format!("timestamp is not RFC 3339: '{timestamp}'"),
        ));
    }

    if let Some(trace_id) = str_field(obj, "trace_id")
        && trace_id.split("::").count() != 3
    {
        problems.push(LogValidationError::new(
            line_number,
            "trace_id",
            format!("expected <suite>::<run_id>::<seq>, got '{trace_id}'"),
        ));
    }

    if str_field(obj, "event") == Some("case_result") && !obj.contains_key("outcome") {
        problems.push(LogValidationError::new(
            line_number,
            "outcome",
            "case_result events must include an outcome",
        ));
    }
    problems
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| vec![LogValidationError::new(line_number, "<json>", format!("invalid JSON: {e}"))])?;
    let Some(obj) = value.as_object() else {
        return Err(vec![LogValidationError::new(line_number, "<root>", "expected JSON object")]);
    };

    let problems = schema_problems(obj, line_number);
    if !problems.is_empty() {
        return Err(problems);
    }
    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError::new(line_number, "<entry>", format!("does not decode as a log entry: {e}"))]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the non-empty line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();
    let errors = lines
        .iter()
        .filter_map(|(number, line)| validate_log_line(line, *number).err())
        .flatten()
        .collect();
    Ok((lines.len(), errors))
}

fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
