//! Coverage report: what the suite covers and what went wrong.

use crate::context::{CompilationContext, Diagnostic};
use serde::Serialize;
use spectest::SpecAssertion;
use spectest_xref::{Annotation, AnnotationOutcome};
use std::fmt::Write;

/// A test claiming an assertion id nobody declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndeclaredReference {
    pub test: String,
    pub assertion: String,
}

/// A record that failed to compile, flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub record: String,
    pub dialect: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub assertions: usize,
    pub tests: usize,
    /// Assertions located in the standard, whether anchored or not.
    pub matched: usize,
    pub unmatched: Vec<String>,
    pub matched_multiple: Vec<String>,
    /// Declared assertions no test claims.
    pub zero_coverage: Vec<String>,
    pub undeclared_references: Vec<UndeclaredReference>,
    pub failures: Vec<FailureSummary>,
}

impl CoverageReport {
    pub fn build(
        assertions: &[SpecAssertion],
        annotation: &Annotation,
        ctx: &CompilationContext,
    ) -> Self {
        let with = |outcome: AnnotationOutcome| -> Vec<String> {
            assertions
                .iter()
                .filter(|a| annotation.outcome(&a.id) == Some(outcome))
                .map(|a| a.id.clone())
                .collect()
        };

        let undeclared_references = ctx
            .diagnostics()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UndeclaredAssertion { test, assertion } => Some(UndeclaredReference {
                    test: test.clone(),
                    assertion: assertion.clone(),
                }),
                _ => None,
            })
            .collect();

        let pattern_failures = annotation.failures.iter().map(|err| FailureSummary {
            record: match err {
                spectest::SpecError::MalformedPattern { id, .. } => id.clone(),
                _ => String::new(),
            },
            dialect: None,
            message: err.to_string(),
        });
        let failures = ctx
            .failures()
            .iter()
            .map(|f| FailureSummary {
                record: f.record.clone(),
                dialect: f.dialect.map(|d| d.to_string()),
                message: f.error.to_string(),
            })
            .chain(pattern_failures)
            .collect();

        Self {
            assertions: assertions.len(),
            tests: ctx.tests_seen(),
            matched: assertions
                .iter()
                .filter(|a| annotation.outcome(&a.id).map_or(false, AnnotationOutcome::is_matched))
                .count(),
            unmatched: with(AnnotationOutcome::Unmatched),
            matched_multiple: assertions
                .iter()
                .filter(|a| annotation.is_matched_multiple(&a.id))
                .map(|a| a.id.clone())
                .collect(),
            zero_coverage: annotation.unclaimed.clone(),
            undeclared_references,
            failures,
        }
    }

    /// Nothing unmatched, ambiguous, undeclared or failed.
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty()
            && self.matched_multiple.is_empty()
            && self.undeclared_references.is_empty()
            && self.failures.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Human-readable summary of a report.
pub fn format_report(report: &CoverageReport) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "Spec coverage: {}/{} assertions located, {} tests",
        report.matched, report.assertions, report.tests
    )
    .unwrap();

    let sections: [(&str, Vec<String>); 4] = [
        ("Unmatched spec statements", report.unmatched.clone()),
        ("Spec statements matching multiple places", report.matched_multiple.clone()),
        ("Spec statements without tests", report.zero_coverage.clone()),
        (
            "References to nonexistent spec points",
            report
                .undeclared_references
                .iter()
                .map(|r| format!("{} (from {})", r.assertion, r.test))
                .collect(),
        ),
    ];

    for (title, items) in sections.iter().filter(|(_, items)| !items.is_empty()) {
        writeln!(output).unwrap();
        writeln!(output, "{} ({}):", title, items.len()).unwrap();
        for item in items {
            writeln!(output, "  - {}", item).unwrap();
        }
    }

    if !report.failures.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "Failures ({}):", report.failures.len()).unwrap();
        for failure in &report.failures {
            match &failure.dialect {
                Some(dialect) => {
                    writeln!(output, "  \u{2717} {} [{}]: {}", failure.record, dialect, failure.message)
                        .unwrap()
                }
                None => writeln!(output, "  \u{2717} {}: {}", failure.record, failure.message).unwrap(),
            }
        }
    }

    if report.is_clean() {
        writeln!(output).unwrap();
        writeln!(output, "\u{2713} No problems found").unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CoverageReport {
        CoverageReport {
            assertions: 3,
            tests: 2,
            matched: 2,
            unmatched: vec!["2d.nowhere".to_string()],
            matched_multiple: vec![],
            zero_coverage: vec!["2d.nowhere".to_string(), "2d.arcTo".to_string()],
            undeclared_references: vec![UndeclaredReference {
                test: "2d.arc.zero".to_string(),
                assertion: "2d.arc.missing".to_string(),
            }],
            failures: vec![FailureSummary {
                record: "2d.typo".to_string(),
                dialect: Some("standalone".to_string()),
                message: "untranslated directive `@asert`".to_string(),
            }],
        }
    }

    #[test]
    fn test_format_report() {
        insta::assert_snapshot!(format_report(&report()), @r###"
        Spec coverage: 2/3 assertions located, 2 tests

        Unmatched spec statements (1):
          - 2d.nowhere

        Spec statements without tests (2):
          - 2d.nowhere
          - 2d.arcTo

        References to nonexistent spec points (1):
          - 2d.arc.missing (from 2d.arc.zero)

        Failures (1):
          ✗ 2d.typo [standalone]: untranslated directive `@asert`
        "###);
    }

    #[test]
    fn test_clean_report() {
        let report = CoverageReport {
            assertions: 1,
            tests: 1,
            matched: 1,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert!(format_report(&report).ends_with("\u{2713} No problems found\n"));
    }

    #[test]
    fn test_shared_anchor_counts_as_matched_multiple() {
        use spectest_xref::AnnotationWarning;

        let assertions = vec![
            SpecAssertion::new("2d.lineWidth.get", "*must* return<^>"),
            SpecAssertion::new("2d.lineWidth.get.dup", "return<^>"),
        ];
        let mut annotation = Annotation::default();
        annotation
            .outcomes
            .insert("2d.lineWidth.get".to_string(), AnnotationOutcome::Annotated);
        annotation
            .outcomes
            .insert("2d.lineWidth.get.dup".to_string(), AnnotationOutcome::Located);
        annotation.warnings.push(AnnotationWarning::MatchedMultiple {
            id: "2d.lineWidth.get.dup".to_string(),
            conflicting_with: Some("2d.lineWidth.get".to_string()),
        });

        let report = CoverageReport::build(&assertions, &annotation, &CompilationContext::new());

        assert_eq!(report.matched, 2);
        assert_eq!(report.matched_multiple, vec!["2d.lineWidth.get.dup"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&report().to_json().unwrap()).unwrap();
        assert_eq!(json["unmatched"][0], "2d.nowhere");
        assert_eq!(json["undeclared_references"][0]["assertion"], "2d.arc.missing");
        assert_eq!(json["failures"][0]["dialect"], "standalone");
    }
}
