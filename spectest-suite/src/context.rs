//! Compilation context: the state a suite run accumulates.
//!
//! Translation of one test never depends on another; everything that does
//! span tests (coverage claims, used images, seen names, diagnostics and
//! failures) lives here and is threaded through the run explicitly.

use serde::Serialize;
use spectest::{CoverageIndex, SpecError, TestCase};
use spectest_dsl::Dialect;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Why a test got no embedded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The body needs a human to check the result.
    Manual,
    /// Disabled in the test's embedded-harness flags.
    Disabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Manual => write!(f, "manual check"),
            SkipReason::Disabled => write!(f, "disabled"),
        }
    }
}

/// A non-fatal finding about one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    DuplicateTestName { test: String },
    UndeclaredAssertion { test: String, assertion: String },
    NoAssertionRefs { test: String },
    /// Expected green, yet asserts a transparent black pixel.
    SuspiciousPixelTest { test: String },
    EmbeddedSkipped { test: String, reason: SkipReason },
}

impl Diagnostic {
    pub fn test(&self) -> &str {
        match self {
            Diagnostic::DuplicateTestName { test }
            | Diagnostic::UndeclaredAssertion { test, .. }
            | Diagnostic::NoAssertionRefs { test }
            | Diagnostic::SuspiciousPixelTest { test }
            | Diagnostic::EmbeddedSkipped { test, .. } => test,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateTestName { test } => write!(f, "Test {} is defined twice", test),
            Diagnostic::UndeclaredAssertion { test, assertion } => {
                write!(f, "Test {} uses nonexistent spec point {}", test, assertion)
            }
            Diagnostic::NoAssertionRefs { test } => {
                write!(f, "Test {} doesn't refer to any spec points", test)
            }
            Diagnostic::SuspiciousPixelTest { test } => {
                write!(f, "Probable incorrect pixel test in {}", test)
            }
            Diagnostic::EmbeddedSkipped { test, reason } => {
                write!(f, "Skipping embedded test for {} ({})", test, reason)
            }
        }
    }
}

/// A record that could not be compiled, with the dialect it failed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub record: String,
    pub dialect: Option<Dialect>,
    pub error: SpecError,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dialect {
            Some(dialect) => write!(f, "{} ({}): {}", self.record, dialect, self.error),
            None => write!(f, "{}: {}", self.record, self.error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    coverage: CoverageIndex,
    used_images: BTreeSet<String>,
    seen_names: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    failures: Vec<RecordFailure>,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `test` as seen and record its claims. Returns `false` when a
    /// test of the same name was seen before.
    pub fn register(&mut self, test: &TestCase) -> bool {
        self.coverage.record(test);
        self.seen_names.insert(test.name.clone())
    }

    pub fn use_image(&mut self, image: &str) {
        self.used_images.insert(image.to_string());
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(test = diagnostic.test(), "{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn fail(&mut self, record: &str, dialect: Option<Dialect>, error: SpecError) {
        tracing::warn!(record, error = %error, "Record failed to compile");
        self.failures.push(RecordFailure {
            record: record.to_string(),
            dialect,
            error,
        });
    }

    pub fn coverage(&self) -> &CoverageIndex {
        &self.coverage
    }

    /// Shared images referenced by any test, sorted.
    pub fn used_images(&self) -> impl Iterator<Item = &str> {
        self.used_images.iter().map(String::as_str)
    }

    pub fn tests_seen(&self) -> usize {
        self.seen_names.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn failures(&self) -> &[RecordFailure] {
        &self.failures
    }
}
