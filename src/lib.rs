//! Shared vocabulary for the spectest workspace.
//!
//! A conformance suite is described declaratively: one [`TestCase`] per test
//! (a body written in the assertion DSL plus metadata) and one
//! [`SpecAssertion`] per normative statement of the prose standard. The
//! member crates consume these records:
//!
//! - `spectest-dsl` translates test bodies into runnable assertion code
//! - `spectest-xref` locates each spec assertion in the prose document and
//!   inserts cross-reference anchors
//! - `spectest-suite` drives both passes and assembles the coverage report
//!
//! ## Modules
//!
//! - [`record`] - Test and spec-assertion records as supplied by a loader
//! - [`coverage`] - Which tests claim which assertions
//! - [`errors`] - Error types shared by every pass

pub mod coverage;
pub mod errors;
pub mod record;

pub use coverage::CoverageIndex;
pub use errors::{SpecError, SpecResult};
pub use record::{Disambiguator, Keyword, MozillaFlags, SpecAssertion, TestCase};
