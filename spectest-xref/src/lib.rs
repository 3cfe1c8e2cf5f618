//! Cross-references spec assertions against the prose standard.
//!
//! Each [`SpecAssertion`](spectest::SpecAssertion) carries a prose pattern
//! naming the sentence that states it. The annotator finds that sentence in
//! the parsed standard and inserts an anchor linking the tests that claim
//! the assertion.
//!
//! ## Modules
//!
//! - [`pattern`] - Prose patterns compiled to single-capture regexes
//! - [`markup`] - XHTML reader, HTML5 writer and the owned tree between them
//! - [`text_index`] - Flattened text with a map back to text nodes
//! - [`annotator`] - Match planning and anchor insertion

pub mod annotator;
pub mod markup;
pub mod pattern;
pub mod text_index;

pub use annotator::{Annotation, AnnotationOutcome, AnnotationWarning, Annotator, AnnotatorConfig};
pub use markup::{Document, Element, Node};
pub use pattern::{compile, compile_assertion, CompiledPattern};
pub use text_index::TextIndex;
