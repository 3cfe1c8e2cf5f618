//! Translation of DSL bodies into dialect code.
//!
//! Translation runs as a fixed pipeline of stages. Each stage scans its input
//! once from left to right; at every [`SENTINEL`] it tries the stage's rule
//! table in order and splices in the rewrite of the first matching rule.
//! Text between directives is copied unchanged.
//!
//! 1. expansion: `@nonfinite` calls, whose output may contain `@assert`
//! 2. directives: assertions and markers
//! 3. dialect fix-ups (embedded only): `@moz-todo` and shared image paths
//! 4. validation: no sentinel may survive

use crate::dialect::Dialect;
use crate::directive::{match_rules, Directive, Rule, DIRECTIVE_RULES, EXPANSION_RULES, SENTINEL};
use crate::nonfinite;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spectest::{SpecError, SpecResult};

static TODO_OK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"((?:^|\n|;)\s*)ok(.*;) @moz-todo").unwrap());
static TODO_IS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"((?:^|\n|;)\s*)(is.*;) @moz-todo").unwrap());

/// Translator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Tolerance used by `==~` pixel checks without an explicit `+/-`.
    pub pixel_tolerance: u32,
    /// Path prefix of shared images as written in test bodies.
    pub shared_image_dir: String,
    /// Replacement for `shared_image_dir` in embedded code.
    pub embedded_image_prefix: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            pixel_tolerance: 2,
            shared_image_dir: "../images/".to_string(),
            embedded_image_prefix: "image_".to_string(),
        }
    }
}

/// Rewrites DSL bodies into either dialect.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate one DSL body.
    ///
    /// Fails with [`SpecError::Arity`] for an empty `@nonfinite` argument
    /// list and with [`SpecError::UntranslatedDirective`] when a sentinel is
    /// left in the output.
    pub fn translate(&self, body: &str, dialect: Dialect) -> SpecResult<String> {
        let expanded = scan(body, &EXPANSION_RULES, |directive| {
            self.rewrite(directive, dialect)
        })?;
        let rewritten = scan(&expanded, &DIRECTIVE_RULES, |directive| {
            self.rewrite(directive, dialect)
        })?;
        let code = match dialect {
            Dialect::Standalone => rewritten,
            Dialect::Embedded => self.embedded_fixups(&rewritten),
        };
        validate(&code)?;
        Ok(code)
    }

    fn rewrite(&self, directive: Directive<'_>, dialect: Dialect) -> SpecResult<String> {
        match directive {
            Directive::NonFinite {
                callable,
                arguments,
                tail,
            } => {
                let alternatives = nonfinite::parse_arguments(arguments);
                Ok(nonfinite::expand(callable, &alternatives, tail)?.join("\n"))
            }
            other => Ok(dialect.render(&other, self.config.pixel_tolerance)),
        }
    }

    fn embedded_fixups(&self, code: &str) -> String {
        let code = TODO_OK.replace_all(code, "${1}todo${2}");
        let code = TODO_IS.replace_all(&code, "${1}todo_${2}");
        code.replace(
            self.config.shared_image_dir.as_str(),
            &self.config.embedded_image_prefix,
        )
    }
}

/// Translate with the default configuration.
pub fn translate(body: &str, dialect: Dialect) -> SpecResult<String> {
    Translator::default().translate(body, dialect)
}

/// One left-to-right pass over `input` applying `rules` at each sentinel.
fn scan<F>(input: &str, rules: &[Rule], mut rewrite: F) -> SpecResult<String>
where
    F: FnMut(Directive<'_>) -> SpecResult<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(SENTINEL) {
        out.push_str(&rest[..pos]);
        let here = &rest[pos..];

        match match_rules(rules, here) {
            Some((rule, directive, consumed)) => {
                tracing::trace!(rule = rule.name, "rewriting directive");
                if rule.absorbs_leading_space && out.ends_with(' ') {
                    out.pop();
                }
                out.push_str(&rewrite(directive)?);
                rest = &here[consumed..];
            }
            None => {
                out.push(SENTINEL);
                rest = &here[SENTINEL.len_utf8()..];
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Reject output that still carries a directive marker.
fn validate(code: &str) -> SpecResult<()> {
    match code.find(SENTINEL) {
        Some(pos) => {
            let fragment: String = code[pos..]
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != ';')
                .take(48)
                .collect();
            Err(SpecError::UntranslatedDirective { fragment })
        }
        None => Ok(()),
    }
}
