//! Assertion-DSL translator.
//!
//! Test bodies are ordinary script with embedded directives:
//!
//! ```text
//! ctx.fillStyle = '#0f0';
//! ctx.fillRect(0, 0, 100, 50);
//! @assert pixel 50,25 == 0,255,0,255;
//! @nonfinite ctx.moveTo(<0 Infinity -Infinity NaN>, <0 Infinity -Infinity NaN>);
//! ```
//!
//! [`Translator::translate`] rewrites a body into one of two [`Dialect`]s.
//!
//! ## Example
//!
//! ```
//! use spectest_dsl::{translate, Dialect};
//!
//! let code = translate("@assert ctx.lineWidth === 1;", Dialect::Standalone).unwrap();
//! assert_eq!(code, r#"_assertSame(ctx.lineWidth, 1, "ctx.lineWidth", "1");"#);
//! ```
//!
//! ## Modules
//!
//! - [`nonfinite`] - Boundary-condition expansion for `@nonfinite`
//! - [`directive`] - Directive grammar and rule tables
//! - [`dialect`] - Per-dialect rendering
//! - [`translator`] - Stage pipeline and validation
//! - [`escape`] - Failure-message escaping

pub mod dialect;
pub mod directive;
pub mod escape;
pub mod nonfinite;
pub mod translator;

pub use dialect::Dialect;
pub use directive::{Directive, SENTINEL};
pub use escape::escape_message;
pub use translator::{translate, Translator, TranslatorConfig};
