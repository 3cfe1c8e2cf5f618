//! Directive grammar: the ordered rule tables used by the translator.
//!
//! Every directive starts with [`SENTINEL`]. A [`Rule`] pairs an anchored
//! matcher with a builder that turns the match into a [`Directive`]; the
//! translator tries the rules of a stage in table order at each sentinel, so
//! more specific forms must come first.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Leading character of every DSL directive.
pub const SENTINEL: char = '@';

/// A parsed directive, borrowing its operands from the DSL body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'t> {
    /// `@nonfinite callable(<args>)tail`
    NonFinite {
        callable: &'t str,
        arguments: &'t str,
        tail: &'t str,
    },
    /// `@assert pixel X,Y == R,G,B,A;` and its approximate forms.
    Pixel {
        coord: &'t str,
        color: &'t str,
        tolerance: Tolerance<'t>,
    },
    /// `@assert throws NAME_ERR statement;`
    ThrowsTyped { error: &'t str, statement: &'t str },
    /// `@assert throws statement;`
    Throws { statement: &'t str },
    /// `@assert lhs OP rhs;` for `===`, `!==` and `==`.
    Compare {
        lhs: &'t str,
        op: CompareOp,
        rhs: &'t str,
    },
    /// `@assert lhs =~ rhs;`
    Match { lhs: &'t str, rhs: &'t str },
    /// `@assert expr;`
    Truthy { expr: &'t str },
    /// `@manual;`
    Manual,
    /// `@crash;`
    Crash,
    /// `@moz-UniversalBrowserRead;`
    UniversalBrowserRead,
    /// ` @moz-todo` after a statement.
    Todo,
}

/// Pixel comparison tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tolerance<'t> {
    Exact,
    /// `==~` without `+/-`: the configured default.
    Default,
    Explicit(&'t str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Same,
    Different,
    Equal,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Same => "===",
            CompareOp::Different => "!==",
            CompareOp::Equal => "==",
        }
    }
}

/// One (matcher, builder) entry of a stage's rule table.
pub struct Rule {
    pub name: &'static str,
    matcher: Regex,
    build: for<'t> fn(&Captures<'t>) -> Directive<'t>,
    /// The directive swallows the space in front of its sentinel.
    pub absorbs_leading_space: bool,
}

impl Rule {
    fn new(
        name: &'static str,
        pattern: &str,
        build: for<'t> fn(&Captures<'t>) -> Directive<'t>,
    ) -> Self {
        Self {
            name,
            matcher: Regex::new(pattern).unwrap(),
            build,
            absorbs_leading_space: false,
        }
    }

    fn absorbing_leading_space(mut self) -> Self {
        self.absorbs_leading_space = true;
        self
    }

    /// Try the rule at the start of `input`; returns the directive and the
    /// number of bytes it consumed.
    pub fn apply<'t>(&self, input: &'t str) -> Option<(Directive<'t>, usize)> {
        let caps = self.matcher.captures(input)?;
        let consumed = caps.get(0).map_or(0, |m| m.end());
        Some(((self.build)(&caps), consumed))
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("matcher", &self.matcher.as_str())
            .finish()
    }
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

/// Stage 1: macro expansion. Runs before any assertion rewriting because
/// the expanded calls may carry `@assert` prefixes of their own.
pub static EXPANSION_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![Rule::new(
        "nonfinite",
        r"^@nonfinite ([^(\n]+)\(([^)\n]*)\)(.*)",
        |c| Directive::NonFinite {
            callable: group(c, 1),
            arguments: group(c, 2),
            tail: group(c, 3),
        },
    )]
});

/// Stage 2: assertion and marker directives, most specific first.
///
/// Operands are greedy up to the last `;` of the line, so `lhs` of a
/// comparison extends to the last occurrence of the operator.
pub static DIRECTIVE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "pixel",
            r"^@assert pixel (\d+,\d+) == (\d+,\d+,\d+,\d+);",
            |c| Directive::Pixel {
                coord: group(c, 1),
                color: group(c, 2),
                tolerance: Tolerance::Exact,
            },
        ),
        Rule::new(
            "pixel-approx",
            r"^@assert pixel (\d+,\d+) ==~ (\d+,\d+,\d+,\d+);",
            |c| Directive::Pixel {
                coord: group(c, 1),
                color: group(c, 2),
                tolerance: Tolerance::Default,
            },
        ),
        Rule::new(
            "pixel-approx-tolerance",
            r"^@assert pixel (\d+,\d+) ==~ (\d+,\d+,\d+,\d+) \+/- (\d+);",
            |c| Directive::Pixel {
                coord: group(c, 1),
                color: group(c, 2),
                tolerance: Tolerance::Explicit(group(c, 3)),
            },
        ),
        Rule::new(
            "throws-typed",
            r"^@assert throws (\S+_ERR) (.*);",
            |c| Directive::ThrowsTyped {
                error: group(c, 1),
                statement: group(c, 2),
            },
        ),
        Rule::new("throws", r"^@assert throws (.*);", |c| Directive::Throws {
            statement: group(c, 1),
        }),
        Rule::new("same", r"^@assert (.*) === (.*);", |c| Directive::Compare {
            lhs: group(c, 1),
            op: CompareOp::Same,
            rhs: group(c, 2),
        }),
        Rule::new("different", r"^@assert (.*) !== (.*);", |c| {
            Directive::Compare {
                lhs: group(c, 1),
                op: CompareOp::Different,
                rhs: group(c, 2),
            }
        }),
        Rule::new("equal", r"^@assert (.*) == (.*);", |c| Directive::Compare {
            lhs: group(c, 1),
            op: CompareOp::Equal,
            rhs: group(c, 2),
        }),
        Rule::new("match", r"^@assert (.*) =~ (.*);", |c| Directive::Match {
            lhs: group(c, 1),
            rhs: group(c, 2),
        }),
        Rule::new("truthy", r"^@assert (.*);", |c| Directive::Truthy {
            expr: group(c, 1),
        }),
        Rule::new("manual", r"^@manual;", |_| Directive::Manual),
        Rule::new("crash", r"^@crash;", |_| Directive::Crash),
        Rule::new("universal-browser-read", r"^@moz-UniversalBrowserRead;", |_| {
            Directive::UniversalBrowserRead
        }),
        Rule::new("todo", r"^@moz-todo", |_| Directive::Todo).absorbing_leading_space(),
    ]
});

/// First rule of `rules` matching at the start of `input`.
pub fn match_rules<'r, 't>(
    rules: &'r [Rule],
    input: &'t str,
) -> Option<(&'r Rule, Directive<'t>, usize)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(input).map(|(d, len)| (rule, d, len)))
}
