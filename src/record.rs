//! Test and spec-assertion records.
//!
//! Records are produced by an external loader (any serde format works) with
//! generator entries already expanded. Nothing in the workspace mutates them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One conformance test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Dot-delimited hierarchical name, e.g. `2d.fillStyle.parse.hex3`.
    pub name: String,
    /// Body written in the assertion DSL.
    pub code: String,
    /// Spec assertion ids this test claims to exercise.
    #[serde(default)]
    pub testing: Vec<String>,
    /// Expected rendering: `green`, `clear`, or a drawing recipe.
    #[serde(default)]
    pub expected: Option<String>,
    /// Canvas element attributes.
    #[serde(default)]
    pub canvas: Option<String>,
    /// Image resources; bare file names refer to the shared image directory.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub fonts: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    /// Flags for the embedded harness.
    #[serde(default)]
    pub mozilla: Option<MozillaFlags>,
}

/// Embedded-harness flags attached to a test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MozillaFlags {
    /// Tracking bug number; appended to the embedded test's display name.
    #[serde(default)]
    pub bug: Option<u64>,
    /// The whole test is expected to throw.
    #[serde(default)]
    pub throws: bool,
    /// Do not produce an embedded artifact.
    #[serde(default)]
    pub disabled: bool,
}

impl TestCase {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn testing(mut self, ids: &[&str]) -> Self {
        self.testing = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    /// Category prefixes of the name, outermost first (`a.b.c` → `a`, `a.b`).
    pub fn categories(&self) -> Vec<&str> {
        self.name
            .match_indices('.')
            .map(|(idx, _)| &self.name[..idx])
            .collect()
    }

    pub fn is_disabled_for_embedded(&self) -> bool {
        self.mozilla.as_ref().map_or(false, |m| m.disabled)
    }
}

/// Requirement level of a spec statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    Must,
    Should,
    Required,
    None,
}

impl Keyword {
    /// Keywords that can be marked inline as `*keyword*`.
    pub const MARKED: [Keyword; 3] = [Keyword::Must, Keyword::Should, Keyword::Required];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Must => "must",
            Keyword::Should => "should",
            Keyword::Required => "required",
            Keyword::None => "none",
        }
    }
}

impl Default for Keyword {
    fn default() -> Self {
        Keyword::None
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normative statement of the prose standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecAssertion {
    pub id: String,
    /// Prose pattern, see `spectest_xref::pattern`.
    pub text: String,
    /// Overrides any inline `*keyword*` marker.
    #[serde(default)]
    pub keyword: Option<Keyword>,
    #[serde(default)]
    pub previously: Option<Disambiguator>,
}

impl SpecAssertion {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            keyword: None,
            previously: None,
        }
    }

    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keyword = Some(keyword);
        self
    }

    pub fn previously(mut self, disambiguator: Disambiguator) -> Self {
        self.previously = Some(disambiguator);
        self
    }
}

/// Back-reference used to pick the right paragraph when a pattern alone is
/// ambiguous: the node `siblings` positions earlier must (or must not)
/// contain `text`.
///
/// Written as `[n, "text"]` or `[n, "text", expected]` in the data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DisambiguatorRepr", into = "DisambiguatorRepr")]
pub struct Disambiguator {
    pub siblings: usize,
    pub text: String,
    pub expected: bool,
}

impl Disambiguator {
    pub fn new(siblings: usize, text: impl Into<String>) -> Self {
        Self {
            siblings,
            text: text.into(),
            expected: true,
        }
    }

    pub fn absent(mut self) -> Self {
        self.expected = false;
        self
    }

    /// Whether a sibling's flattened text satisfies this rule.
    pub fn accepts(&self, sibling_text: &str) -> bool {
        sibling_text.contains(self.text.as_str()) == self.expected
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DisambiguatorRepr {
    Full(usize, String, bool),
    Short(usize, String),
}

impl From<DisambiguatorRepr> for Disambiguator {
    fn from(repr: DisambiguatorRepr) -> Self {
        match repr {
            DisambiguatorRepr::Full(siblings, text, expected) => Self {
                siblings,
                text,
                expected,
            },
            DisambiguatorRepr::Short(siblings, text) => Self::new(siblings, text),
        }
    }
}

impl From<Disambiguator> for DisambiguatorRepr {
    fn from(d: Disambiguator) -> Self {
        DisambiguatorRepr::Full(d.siblings, d.text, d.expected)
    }
}
