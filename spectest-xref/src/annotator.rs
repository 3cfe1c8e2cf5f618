//! Cross-referencing spec assertions against the prose document.
//!
//! The body of the document is walked one top-level node at a time (the
//! children of an implementation-notes section are each their own unit).
//! For every unit the annotator first plans: each pattern is run against a
//! snapshot of the unit's flattened text, and accepted matches become
//! planned anchor insertions. The plan is then applied in document order,
//! rebuilding the text index after every insertion.

use crate::markup::{Document, Element, Node};
use crate::pattern::{compile_assertion, CompiledPattern};
use crate::text_index::TextIndex;
use serde::{Deserialize, Serialize};
use spectest::{CoverageIndex, Keyword, SpecAssertion, SpecError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Annotator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Class marking inserted anchors; also the prefix of their ids.
    pub anchor_class: String,
    /// Class of sections whose children are matched one by one.
    pub implementation_class: String,
    /// Appended to a test name to link to its page.
    pub test_link_suffix: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            anchor_class: "testrefs".to_string(),
            implementation_class: "impl".to_string(),
            test_link_suffix: ".html".to_string(),
        }
    }
}

/// How an assertion fared against the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationOutcome {
    /// Matched once; an anchor was inserted.
    Annotated,
    /// Matched, but the split point already carries another anchor.
    Located,
    /// Matched in more than one place.
    MatchedMultiple,
    Unmatched,
}

impl AnnotationOutcome {
    pub fn is_matched(self) -> bool {
        self != AnnotationOutcome::Unmatched
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationWarning {
    /// `id` matched again, either in a later unit or (with
    /// `conflicting_with`) at a split point another assertion owns.
    MatchedMultiple {
        id: String,
        conflicting_with: Option<String>,
    },
    Unmatched { id: String },
}

/// Everything one annotation pass found out.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    /// One outcome per assertion id.
    pub outcomes: BTreeMap<String, AnnotationOutcome>,
    pub warnings: Vec<AnnotationWarning>,
    /// Assertions no test claims, in assertion order.
    pub unclaimed: Vec<String>,
    /// Assertions whose pattern did not compile.
    pub failures: Vec<SpecError>,
}

impl Annotation {
    pub fn outcome(&self, id: &str) -> Option<AnnotationOutcome> {
        self.outcomes.get(id).copied()
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &str> {
        self.ids_with(AnnotationOutcome::Unmatched)
    }

    /// Ids that matched more than once, including those that only
    /// collided with another assertion's anchor.
    pub fn matched_multiple(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .keys()
            .map(String::as_str)
            .filter(move |id| self.is_matched_multiple(id))
    }

    pub fn is_matched_multiple(&self, id: &str) -> bool {
        self.outcome(id) == Some(AnnotationOutcome::MatchedMultiple)
            || self.warnings.iter().any(|w| {
                matches!(w, AnnotationWarning::MatchedMultiple { id: warned, .. } if warned == id)
            })
    }

    fn ids_with(&self, outcome: AnnotationOutcome) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(move |(_, o)| **o == outcome)
            .map(|(id, _)| id.as_str())
    }
}

struct Planned<'a> {
    offset: usize,
    id: &'a str,
    keyword: Keyword,
}

#[derive(Debug, Clone, Default)]
pub struct Annotator {
    config: AnnotatorConfig,
}

impl Annotator {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Insert an anchor for every assertion found in `document`, linking the
    /// tests that claim it.
    ///
    /// Never fails: malformed patterns land in [`Annotation::failures`] and
    /// the assertion counts as unmatched.
    pub fn annotate(
        &self,
        document: &mut Document,
        assertions: &[SpecAssertion],
        coverage: &CoverageIndex,
    ) -> Annotation {
        let mut annotation = Annotation::default();

        let mut patterns = Vec::with_capacity(assertions.len());
        for assertion in assertions {
            match compile_assertion(assertion) {
                Ok(pattern) => patterns.push((assertion, pattern)),
                Err(err) => {
                    warn!(id = %assertion.id, error = %err, "Malformed spec pattern");
                    annotation.failures.push(err);
                }
            }
        }

        match document.body_mut() {
            Some(body) => self.annotate_body(body, &patterns, coverage, &mut annotation),
            None => warn!("Document has no <body>; nothing annotated"),
        }

        for assertion in assertions {
            let id = assertion.id.as_str();
            let outcome = annotation
                .outcomes
                .entry(id.to_string())
                .or_insert(AnnotationOutcome::Unmatched);
            if *outcome == AnnotationOutcome::Unmatched {
                warn!(id, "Annotation incomplete: unmatched spec statement");
                annotation
                    .warnings
                    .push(AnnotationWarning::Unmatched { id: id.to_string() });
            }
            if !coverage.is_claimed(id) {
                warn!(id, "Unused spec statement");
                annotation.unclaimed.push(id.to_string());
            }
        }

        annotation
    }

    fn annotate_body(
        &self,
        body: &mut Element,
        patterns: &[(&SpecAssertion, CompiledPattern)],
        coverage: &CoverageIndex,
        annotation: &mut Annotation,
    ) {
        let mut i = 0;
        while i < body.children.len() {
            let section = body.children[i]
                .as_element_mut()
                .filter(|el| el.attribute("class") == Some(self.config.implementation_class.as_str()));

            match section {
                Some(section) => {
                    let mut j = 0;
                    while j < section.children.len() {
                        j += self.annotate_unit(&mut section.children, j, patterns, coverage, annotation);
                    }
                    i += 1;
                }
                None => {
                    i += self.annotate_unit(&mut body.children, i, patterns, coverage, annotation);
                }
            }
        }
    }

    /// Annotate `siblings[start]`. Splitting a text node that sits directly
    /// in `siblings` turns it into several siblings; returns how many the
    /// unit spans afterwards.
    fn annotate_unit(
        &self,
        siblings: &mut Vec<Node>,
        start: usize,
        patterns: &[(&SpecAssertion, CompiledPattern)],
        coverage: &CoverageIndex,
        annotation: &mut Annotation,
    ) -> usize {
        let class = self.config.anchor_class.as_str();
        let index = TextIndex::build(&siblings[start..=start], class);
        let mut plan: Vec<Planned<'_>> = Vec::new();

        for (assertion, pattern) in patterns {
            let id = assertion.id.as_str();
            let offset = match pattern.anchor_offset(index.text()) {
                Some(offset) if index.locate(offset).is_some() => offset,
                _ => continue,
            };

            if let Some(rule) = &assertion.previously {
                let back = start - rule.siblings.min(start);
                let sibling = TextIndex::build(&siblings[back..=back], class);
                if !rule.accepts(sibling.text()) {
                    debug!(id, "Match rejected by back-reference");
                    continue;
                }
            }

            let seen = annotation.outcomes.contains_key(id);
            if seen {
                warn!(id, "Spec statement matches multiple places");
                annotation.warnings.push(AnnotationWarning::MatchedMultiple {
                    id: id.to_string(),
                    conflicting_with: None,
                });
            }

            let (placed, conflict) = match plan.iter().find(|p| p.offset == offset) {
                Some(other) => (false, Some(other.id.to_string())),
                None => match index.anchor_at(offset) {
                    Some(site) if site.assertion_id.as_deref() == Some(id) => (false, None),
                    Some(site) => (false, site.assertion_id.clone()),
                    None => (true, None),
                },
            };

            if let Some(other) = conflict {
                warn!(id, other = %other, "Spec statements share an anchor point");
                annotation.warnings.push(AnnotationWarning::MatchedMultiple {
                    id: id.to_string(),
                    conflicting_with: Some(other),
                });
            }

            let outcome = if seen {
                AnnotationOutcome::MatchedMultiple
            } else if placed {
                AnnotationOutcome::Annotated
            } else {
                AnnotationOutcome::Located
            };
            annotation.outcomes.insert(id.to_string(), outcome);

            if placed {
                plan.push(Planned {
                    offset,
                    id,
                    keyword: pattern.keyword(),
                });
            }
        }

        plan.sort_by_key(|p| p.offset);

        let mut span = 1;
        for planned in plan {
            let index = TextIndex::build(&siblings[start..start + span], class);
            let Some((segment, at)) = index.locate(planned.offset) else {
                continue;
            };
            let anchor = self.anchor(planned.id, planned.keyword, coverage);
            span += split_text(siblings, start, &segment.path, at, anchor);
            debug!(id = planned.id, offset = planned.offset, "Inserted anchor");
        }
        span
    }

    /// `<span class="testrefs kw-KEYWORD" id="testrefs.ID"> <a href="#testrefs.ID"
    /// title="ID">#</a> <a href="TEST.html">TEST</a> ...</span>`
    fn anchor(&self, id: &str, keyword: Keyword, coverage: &CoverageIndex) -> Node {
        let class = &self.config.anchor_class;
        let anchor_id = format!("{}.{}", class, id);

        let mut span = Element::new("span")
            .with_attribute("class", format!("{} kw-{}", class, keyword))
            .with_attribute("id", &anchor_id)
            .with_text(" ")
            .with_child(
                Element::new("a")
                    .with_attribute("href", format!("#{}", anchor_id))
                    .with_attribute("title", id)
                    .with_text("#"),
            )
            .with_text(" ");

        for test in coverage.claims(id) {
            span = span
                .with_child(
                    Element::new("a")
                        .with_attribute("href", format!("{}{}", test, self.config.test_link_suffix))
                        .with_text(test.as_str()),
                )
                .with_text(" ");
        }

        Node::Element(span)
    }
}

/// Split the text node at `path` (relative to `nodes[base]`) at byte `at`
/// and put `anchor` between the halves. Empty halves are not kept. Returns
/// how many nodes were added to `nodes` itself.
fn split_text(nodes: &mut Vec<Node>, base: usize, path: &[usize], at: usize, anchor: Node) -> usize {
    let Some((&first, rest)) = path.split_first() else {
        return 0;
    };
    let idx = base + first;

    if !rest.is_empty() {
        if let Some(el) = nodes.get_mut(idx).and_then(Node::as_element_mut) {
            split_text(&mut el.children, 0, rest, at, anchor);
        }
        return 0;
    }

    let Some(Node::Text(text)) = nodes.get(idx) else {
        return 0;
    };
    let (before, after) = text.split_at(at.min(text.len()));
    let mut pieces = Vec::with_capacity(3);
    if !before.is_empty() {
        pieces.push(Node::text(before));
    }
    pieces.push(anchor);
    if !after.is_empty() {
        pieces.push(Node::text(after));
    }

    let added = pieces.len() - 1;
    nodes.splice(idx..=idx, pieces);
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectest::{Disambiguator, TestCase};

    fn doc(body: Vec<Node>) -> Document {
        Document::new(
            Element::new("html")
                .with_child(Element::new("head"))
                .with_child(Element::new("body").with_children(body)),
        )
    }

    fn para(text: &str) -> Node {
        Node::Element(Element::new("p").with_text(text))
    }

    fn body_html(document: &Document) -> String {
        let mut html = document.to_html();
        let start = html.find("<body>").unwrap();
        html.replace_range(..start, "");
        html
    }

    #[test]
    fn test_anchor_markup() {
        let mut document = doc(vec![para("The lineWidth attribute must return 1.0.")]);
        let assertions = [SpecAssertion::new(
            "2d.lineWidth.default",
            "The lineWidth attribute *must* return 1.0<^>.",
        )];
        let coverage = CoverageIndex::from_tests(&[
            TestCase::new("2d.line.width.basic", "").testing(&["2d.lineWidth.default"])
        ]);

        let annotation = Annotator::default().annotate(&mut document, &assertions, &coverage);

        assert_eq!(
            annotation.outcome("2d.lineWidth.default"),
            Some(AnnotationOutcome::Annotated)
        );
        assert!(annotation.warnings.is_empty());
        assert!(annotation.unclaimed.is_empty());
        insta::assert_snapshot!(body_html(&document), @r###"<body><p>The lineWidth attribute must return 1.0<span class="testrefs kw-must" id="testrefs.2d.lineWidth.default"> <a href="#testrefs.2d.lineWidth.default" title="2d.lineWidth.default">#</a> <a href="2d.line.width.basic.html">2d.line.width.basic</a> </span>.</p></body></html>"###);
    }

    #[test]
    fn test_boundary_offset_lands_in_next_node() {
        let mut document = doc(vec![Node::Element(
            Element::new("p")
                .with_text("Calls ")
                .with_child(Element::new("code").with_text("fill()")),
        )]);
        let assertions = [SpecAssertion::new("a", "Calls <^>fill()")];
        Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        let p = document.body().unwrap().children[0].as_element().unwrap();
        let code = p.children[1].as_element().unwrap();
        assert_eq!(p.children.len(), 2);
        assert!(code.children[0].as_element().unwrap().has_class("testrefs"));
        assert_eq!(code.children[1], Node::text("fill()"));
    }

    #[test]
    fn test_implementation_sections_match_per_child() {
        let section = Element::new("div")
            .with_attribute("class", "impl")
            .with_child(para("First note."))
            .with_child(para("Second note."));
        let mut document = doc(vec![Node::Element(section)]);
        let assertions = [SpecAssertion::new("a", "<...> note<^>.")];

        let annotation = Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        assert_eq!(annotation.outcome("a"), Some(AnnotationOutcome::MatchedMultiple));
        assert_eq!(
            annotation.warnings,
            vec![AnnotationWarning::MatchedMultiple {
                id: "a".to_string(),
                conflicting_with: None,
            }]
        );
    }

    #[test]
    fn test_back_reference_picks_the_paragraph() {
        let mut document = doc(vec![
            para("The arc() method:"),
            para("Throws if negative."),
            para("The arcTo() method:"),
            para("Throws if negative."),
        ]);
        let assertions = [SpecAssertion::new("2d.arcTo.negative", "Throws<^> if negative.")
            .previously(Disambiguator::new(1, "arcTo"))];

        let annotation = Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        assert_eq!(annotation.outcome("2d.arcTo.negative"), Some(AnnotationOutcome::Annotated));
        let body = document.body().unwrap();
        assert_eq!(body.children[1].as_element().unwrap().children.len(), 1);
        assert_eq!(body.children[3].as_element().unwrap().children.len(), 3);
    }

    #[test]
    fn test_negative_back_reference() {
        let mut document = doc(vec![para("Intro"), para("The value must be positive.")]);
        let assertions = [SpecAssertion::new("a", "must be positive<^>.")
            .previously(Disambiguator::new(1, "Intro").absent())];

        let annotation = Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        assert_eq!(annotation.outcome("a"), Some(AnnotationOutcome::Unmatched));
        assert_eq!(
            annotation.warnings,
            vec![AnnotationWarning::Unmatched { id: "a".to_string() }]
        );
    }

    #[test]
    fn test_top_level_text_grows_its_span() {
        let mut document = doc(vec![
            Node::text("alpha beta gamma"),
            para("beta again"),
        ]);
        let assertions = [
            SpecAssertion::new("a", "alpha<^> beta"),
            SpecAssertion::new("b", "beta<^> gamma"),
            SpecAssertion::new("c", "beta<^> again"),
        ];

        let annotation = Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        assert!(annotation.outcomes.values().all(|o| *o == AnnotationOutcome::Annotated));
        let body = document.body().unwrap();
        // text, anchor, text, anchor, text, p
        assert_eq!(body.children.len(), 6);
        assert_eq!(body.children[4], Node::text(" gamma"));
        assert_eq!(body.children[5].as_element().unwrap().children.len(), 3);
    }

    #[test]
    fn test_malformed_pattern_is_contained() {
        let mut document = doc(vec![para("Some text.")]);
        let assertions = [
            SpecAssertion::new("bad", "<^>Some<^>"),
            SpecAssertion::new("good", "Some<^> text"),
        ];

        let annotation = Annotator::default().annotate(&mut document, &assertions, &CoverageIndex::new());

        assert_eq!(annotation.failures.len(), 1);
        assert_eq!(annotation.outcome("bad"), Some(AnnotationOutcome::Unmatched));
        assert_eq!(annotation.outcome("good"), Some(AnnotationOutcome::Annotated));
        assert_eq!(annotation.unclaimed, vec!["bad", "good"]);
    }
}
