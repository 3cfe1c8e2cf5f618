//! Drives a full spectest run.
//!
//! [`SuiteCompiler::run`] takes the loaded test and assertion records plus
//! the parsed standard and produces:
//!
//! - standalone and embedded code for every test
//! - the standard, annotated with links from each assertion to its tests
//! - a [`CoverageReport`] of what is missing, ambiguous or broken
//!
//! All cross-test state lives in an explicit [`CompilationContext`].
//!
//! ## Modules
//!
//! - [`compiler`] - Test translation, checks and annotation
//! - [`context`] - Accumulated coverage, images, diagnostics and failures
//! - [`embedded`] - Embedded-harness artifact metadata
//! - [`report`] - Coverage report and its text rendering
//! - [`config`] - Suite configuration via TOML

pub mod compiler;
pub mod config;
pub mod context;
pub mod embedded;
pub mod report;

pub use compiler::{CompiledTest, SuiteCompiler, SuiteOutput};
pub use config::{DocumentConfig, SuiteConfig};
pub use context::{CompilationContext, Diagnostic, RecordFailure, SkipReason};
pub use embedded::{EmbeddedTest, Helper, ImageRef};
pub use report::{format_report, CoverageReport, FailureSummary, UndeclaredReference};
