//! Table-driven validation harness for Terraform plans.
//!
//! This crate provides:
//! - JSONPath extraction: render any part of a planned attribute tree as text
//! - Comparison normalization: one validator shape over equals, contains,
//!   not-equals, not-contains and elements-match
//! - Test cases and runners: declarative plan, tuple and apply cases executed
//!   independently and collected into reports
//! - Plan cache: one plan per variable-set key per process, shared by readers
//! - Cloud inspection: typed Azure resources with per-field accessors
//! - Structured JSONL evidence logging

#![forbid(unsafe_code)]

pub mod apply;
pub mod cache;
pub mod case;
pub mod compare;
pub mod diff;
pub mod error;
pub mod expect;
pub mod extract;
pub mod inspect;
pub mod report;
pub mod retrieve;
pub mod runner;
pub mod structured_log;

pub use apply::{ApplyTestCase, Source, retrieve_from_plan, run_apply_test, run_apply_tests};
pub use cache::PlanCache;
pub use case::{AttrTuple, TestCase, TupleTestCase};
pub use compare::{ArgumentOrder, ComparisonKind, ComparisonMismatch, Operand, Validator};
pub use error::{CacheError, CaseFailure, ExtractionError};
pub use expect::ErrorExpectation;
pub use extract::{ABSENT, MISSING, Query, extract, render_value};
pub use report::{CaseResult, RunSummary, SuiteReport};
pub use retrieve::Retriever;
pub use runner::{TestRunner, run_test, run_tests, run_tuple_tests};
