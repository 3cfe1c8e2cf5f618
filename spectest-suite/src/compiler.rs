//! Suite compilation: tests to code, the standard to an annotated document.

use crate::config::SuiteConfig;
use crate::context::{CompilationContext, Diagnostic, SkipReason};
use crate::embedded::{EmbeddedTest, ImageRef};
use crate::report::CoverageReport;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use spectest::{SpecAssertion, TestCase};
use spectest_dsl::{Dialect, Translator};
use spectest_xref::{Annotation, Annotator, Document};
use std::collections::HashSet;
use tracing::debug;

static TRANSPARENT_PIXEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@assert pixel .* 0,0,0,0;").unwrap());

/// One test, translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledTest {
    pub name: String,
    /// Code for the standalone runner.
    pub standalone: String,
    /// `None` when the test is skipped for, or failed in, the embedded
    /// dialect.
    pub embedded: Option<EmbeddedTest>,
    pub images: Vec<ImageRef>,
}

/// Everything a full run produces.
#[derive(Debug, Clone)]
pub struct SuiteOutput {
    pub tests: Vec<CompiledTest>,
    /// The annotated standard, ready for [`Document::to_html`].
    pub document: Document,
    pub annotation: Annotation,
    pub context: CompilationContext,
    pub report: CoverageReport,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteCompiler {
    config: SuiteConfig,
    translator: Translator,
    annotator: Annotator,
}

impl SuiteCompiler {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            translator: Translator::new(config.translator.clone()),
            annotator: Annotator::new(config.annotator.clone()),
            config,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Translate every test into both dialects.
    ///
    /// A test that fails to translate is recorded in `ctx` and left out of
    /// the result; the remaining tests are still compiled.
    pub fn compile_tests(
        &self,
        tests: &[TestCase],
        assertions: &[SpecAssertion],
        ctx: &mut CompilationContext,
    ) -> Vec<CompiledTest> {
        let declared: HashSet<&str> = assertions.iter().map(|a| a.id.as_str()).collect();
        tests
            .iter()
            .filter_map(|test| self.compile_test(test, &declared, ctx))
            .collect()
    }

    fn compile_test(
        &self,
        test: &TestCase,
        declared: &HashSet<&str>,
        ctx: &mut CompilationContext,
    ) -> Option<CompiledTest> {
        debug!(test = %test.name, "Compiling test");
        self.check(test, declared, ctx);

        let standalone = match self.translator.translate(&test.code, Dialect::Standalone) {
            Ok(code) => code,
            Err(err) => {
                ctx.fail(&test.name, Some(Dialect::Standalone), err);
                return None;
            }
        };

        let images = self.images(test, ctx);
        let embedded = self.embedded(test, &images, ctx);

        Some(CompiledTest {
            name: test.name.clone(),
            standalone,
            embedded,
            images,
        })
    }

    fn check(&self, test: &TestCase, declared: &HashSet<&str>, ctx: &mut CompilationContext) {
        let name = || test.name.clone();

        if !ctx.register(test) {
            ctx.diagnose(Diagnostic::DuplicateTestName { test: name() });
        }
        for id in &test.testing {
            if !declared.contains(id.as_str()) {
                ctx.diagnose(Diagnostic::UndeclaredAssertion {
                    test: name(),
                    assertion: id.clone(),
                });
            }
        }
        if test.testing.is_empty() {
            ctx.diagnose(Diagnostic::NoAssertionRefs { test: name() });
        }
        if test.expected.as_deref() == Some("green") && TRANSPARENT_PIXEL.is_match(&test.code) {
            ctx.diagnose(Diagnostic::SuspiciousPixelTest { test: name() });
        }
    }

    /// Image elements for the standalone page. Bare file names live in the
    /// shared image directory and are recorded as used.
    fn images(&self, test: &TestCase, ctx: &mut CompilationContext) -> Vec<ImageRef> {
        test.images
            .iter()
            .map(|image| {
                let id = image.rsplit('/').next().unwrap_or(image).to_string();
                let src = if image.contains('/') {
                    image.clone()
                } else {
                    ctx.use_image(image);
                    format!("{}{}", self.config.translator.shared_image_dir, image)
                };
                ImageRef { id, src }
            })
            .collect()
    }

    fn embedded(
        &self,
        test: &TestCase,
        images: &[ImageRef],
        ctx: &mut CompilationContext,
    ) -> Option<EmbeddedTest> {
        let skip = if test.code.contains("@manual") {
            Some(SkipReason::Manual)
        } else if test.is_disabled_for_embedded() {
            Some(SkipReason::Disabled)
        } else {
            None
        };
        if let Some(reason) = skip {
            ctx.diagnose(Diagnostic::EmbeddedSkipped {
                test: test.name.clone(),
                reason,
            });
            return None;
        }

        let code = match self.translator.translate(&test.code, Dialect::Embedded) {
            Ok(code) => code,
            Err(err) => {
                ctx.fail(&test.name, Some(Dialect::Embedded), err);
                return None;
            }
        };

        let translator = &self.config.translator;
        let images = images
            .iter()
            .map(|image| ImageRef {
                id: image.id.clone(),
                src: image
                    .src
                    .replace(&translator.shared_image_dir, &translator.embedded_image_prefix),
            })
            .collect();

        Some(EmbeddedTest::new(test, code, images))
    }

    /// Annotate the standard with the claims gathered in `ctx`.
    pub fn annotate(
        &self,
        document: &mut Document,
        assertions: &[SpecAssertion],
        ctx: &CompilationContext,
    ) -> Annotation {
        if let Some(href) = self.config.document.stylesheet.as_deref().filter(|h| !h.is_empty()) {
            document.add_stylesheet(href);
        }
        let annotation = self.annotator.annotate(document, assertions, ctx.coverage());
        document.prepare_for_html();
        annotation
    }

    /// Compile the tests, then annotate `document`, then build the report.
    pub fn run(
        &self,
        tests: &[TestCase],
        assertions: &[SpecAssertion],
        mut document: Document,
    ) -> SuiteOutput {
        let mut context = CompilationContext::new();
        let compiled = self.compile_tests(tests, assertions, &mut context);
        let annotation = self.annotate(&mut document, assertions, &context);
        let report = CoverageReport::build(assertions, &annotation, &context);

        debug!(
            tests = compiled.len(),
            assertions = assertions.len(),
            "Suite compiled"
        );

        SuiteOutput {
            tests: compiled,
            document,
            annotation,
            context,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectest::{MozillaFlags, SpecError};

    fn declared() -> Vec<SpecAssertion> {
        vec![SpecAssertion::new("2d.fillRect", "fillRect<^>")]
    }

    #[test]
    fn test_diagnostics() {
        let compiler = SuiteCompiler::default();
        let mut ctx = CompilationContext::new();
        let mut green = TestCase::new("2d.clear", "@assert pixel 50,25 == 0,0,0,0;");
        green.expected = Some("green".to_string());

        let tests = vec![
            TestCase::new("2d.fillRect.basic", "@assert true;").testing(&["2d.fillRect"]),
            TestCase::new("2d.fillRect.basic", "@assert true;").testing(&["2d.nope"]),
            green,
        ];
        let compiled = compiler.compile_tests(&tests, &declared(), &mut ctx);

        assert_eq!(compiled.len(), 3);
        assert_eq!(
            ctx.diagnostics(),
            [
                Diagnostic::DuplicateTestName {
                    test: "2d.fillRect.basic".to_string()
                },
                Diagnostic::UndeclaredAssertion {
                    test: "2d.fillRect.basic".to_string(),
                    assertion: "2d.nope".to_string(),
                },
                Diagnostic::NoAssertionRefs {
                    test: "2d.clear".to_string()
                },
                Diagnostic::SuspiciousPixelTest {
                    test: "2d.clear".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_translation_failure_is_recorded_and_run_continues() {
        let compiler = SuiteCompiler::default();
        let mut ctx = CompilationContext::new();
        let tests = vec![
            TestCase::new("2d.typo", "@asert true;").testing(&["2d.fillRect"]),
            TestCase::new("2d.ok", "@assert true;").testing(&["2d.fillRect"]),
        ];

        let compiled = compiler.compile_tests(&tests, &declared(), &mut ctx);

        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].name, "2d.ok");
        assert_eq!(ctx.failures().len(), 1);
        assert_eq!(ctx.failures()[0].record, "2d.typo");
        assert_eq!(ctx.failures()[0].dialect, Some(Dialect::Standalone));
        assert!(matches!(ctx.failures()[0].error, SpecError::UntranslatedDirective { .. }));
    }

    #[test]
    fn test_embedded_failure_keeps_standalone() {
        let compiler = SuiteCompiler::default();
        let mut ctx = CompilationContext::new();
        let tests = vec![TestCase::new("2d.todo", "@assert throws ctx.foo(); @moz-todo")
            .testing(&["2d.fillRect"])];

        let compiled = compiler.compile_tests(&tests, &declared(), &mut ctx);

        assert_eq!(compiled.len(), 1);
        assert!(compiled[0].embedded.is_none());
        assert_eq!(ctx.failures()[0].dialect, Some(Dialect::Embedded));
    }

    #[test]
    fn test_embedded_skips() {
        let compiler = SuiteCompiler::default();
        let mut ctx = CompilationContext::new();
        let mut disabled = TestCase::new("2d.disabled", "@assert true;").testing(&["2d.fillRect"]);
        disabled.mozilla = Some(MozillaFlags {
            disabled: true,
            ..Default::default()
        });
        let tests = vec![
            TestCase::new("2d.manual", "@manual;").testing(&["2d.fillRect"]),
            disabled,
        ];

        let compiled = compiler.compile_tests(&tests, &declared(), &mut ctx);

        assert!(compiled.iter().all(|t| t.embedded.is_none()));
        assert_eq!(compiled[0].standalone, "_requireManualCheck();");
        assert_eq!(
            ctx.diagnostics()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec![
                "Skipping embedded test for 2d.manual (manual check)",
                "Skipping embedded test for 2d.disabled (disabled)",
            ]
        );
    }

    #[test]
    fn test_assertions_sharing_an_anchor_are_reported() {
        let compiler = SuiteCompiler::default();
        let document = Document::parse_xhtml(
            "<html><head><title>t</title></head>\
             <body><p>Values must be ignored.</p></body></html>",
        )
        .unwrap();
        let assertions = vec![
            SpecAssertion::new("2d.ignored", "Values *must* be ignored<^>"),
            SpecAssertion::new("2d.ignored.short", "must be ignored<^>"),
        ];
        let tests = vec![TestCase::new("2d.ignored.basic", "@assert true;")
            .testing(&["2d.ignored", "2d.ignored.short"])];

        let output = compiler.run(&tests, &assertions, document);

        assert_eq!(output.report.matched_multiple, vec!["2d.ignored.short"]);
        assert!(!output.report.is_clean());
        assert!(crate::format_report(&output.report)
            .contains("Spec statements matching multiple places (1):\n  - 2d.ignored.short"));
    }

    #[test]
    fn test_shared_images() {
        let compiler = SuiteCompiler::default();
        let mut ctx = CompilationContext::new();
        let mut test = TestCase::new(
            "2d.drawImage.basic",
            "ctx.drawImage(document.getElementById('yellow.png'), 0, 0);",
        )
        .testing(&["2d.fillRect"]);
        test.images = vec!["yellow.png".to_string(), "custom/red.png".to_string()];

        let compiled = compiler.compile_tests(&[test], &declared(), &mut ctx);

        assert_eq!(
            compiled[0].images,
            vec![
                ImageRef {
                    id: "yellow.png".to_string(),
                    src: "../images/yellow.png".to_string(),
                },
                ImageRef {
                    id: "red.png".to_string(),
                    src: "custom/red.png".to_string(),
                },
            ]
        );
        let embedded = compiled[0].embedded.as_ref().unwrap();
        assert_eq!(embedded.images[0].src, "image_yellow.png");
        assert_eq!(ctx.used_images().collect::<Vec<_>>(), vec!["yellow.png"]);
    }
}
