//! Prose patterns for locating spec assertions.
//!
//! A pattern is literal prose with a handful of placeholders:
//!
//! | syntax      | matches                                           |
//! |-------------|---------------------------------------------------|
//! | whitespace  | one or more whitespace characters                 |
//! | `<...>`     | any non-empty span, greedy, across newlines       |
//! | `<^>`       | nothing; marks where the anchor goes              |
//! | `<eol>`     | optional trailing whitespace and a newline        |
//! | `*must*`    | the word `must`, and sets the keyword             |
//!
//! Everything else is matched verbatim.

use regex::Regex;
use spectest::{Keyword, SpecAssertion, SpecError, SpecResult};

const ANCHOR: &str = "<^>";
const ANY: &str = "<...>";
const EOL: &str = "<eol>";

/// A pattern ready to search flattened document text.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    keyword: Keyword,
}

impl CompiledPattern {
    pub fn keyword(&self) -> Keyword {
        self.keyword
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    /// Byte offset of the anchor point in the first match, if any.
    pub fn anchor_offset(&self, text: &str) -> Option<usize> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.end())
    }
}

/// Compile a spec assertion's pattern, honouring its explicit keyword.
pub fn compile_assertion(assertion: &SpecAssertion) -> SpecResult<CompiledPattern> {
    compile(&assertion.id, &assertion.text, assertion.keyword)
}

/// Compile `text` for the assertion `id`.
///
/// An explicit keyword wins over an inline marker; markers are removed from
/// the prose either way.
pub fn compile(id: &str, text: &str, explicit: Option<Keyword>) -> SpecResult<CompiledPattern> {
    let (prose, marked) = extract_keyword(id, text)?;
    let keyword = explicit.or(marked).unwrap_or_default();

    let anchors = prose.matches(ANCHOR).count();
    if anchors != 1 {
        return Err(SpecError::malformed_pattern(
            id,
            format!("expected exactly one {} anchor, found {}", ANCHOR, anchors),
        ));
    }

    let regex = Regex::new(&to_regex(&prose))
        .map_err(|e| SpecError::malformed_pattern(id, e.to_string()))?;

    if regex.captures_len() != 2 {
        return Err(SpecError::malformed_pattern(
            id,
            format!("{} capture groups", regex.captures_len() - 1),
        ));
    }

    Ok(CompiledPattern { regex, keyword })
}

/// Strip `*keyword*` markers, returning the plain prose and the marked
/// keyword. More than one marker is an error.
fn extract_keyword(id: &str, text: &str) -> SpecResult<(String, Option<Keyword>)> {
    let mut prose = text.to_string();
    let mut found = Vec::new();

    for keyword in Keyword::MARKED {
        let marker = format!("*{}*", keyword);
        let count = prose.matches(&marker).count();
        if count > 0 {
            found.extend(std::iter::repeat(keyword).take(count));
            prose = prose.replace(&marker, keyword.as_str());
        }
    }

    match found.as_slice() {
        [] => Ok((prose, None)),
        [keyword] => Ok((prose, Some(*keyword))),
        _ => Err(SpecError::malformed_pattern(
            id,
            format!("{} keyword markers, at most one allowed", found.len()),
        )),
    }
}

fn to_regex(prose: &str) -> String {
    let mut out = String::from("(?s)");
    let mut rest = prose;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with(ANCHOR) {
            out.push_str("()");
            rest = &rest[ANCHOR.len()..];
        } else if rest.starts_with(ANY) {
            out.push_str(".+");
            rest = &rest[ANY.len()..];
        } else if rest.starts_with(EOL) {
            out.push_str(r"\s*?\n");
            rest = &rest[EOL.len()..];
        } else if ch.is_whitespace() {
            out.push_str(r"\s+");
            rest = rest.trim_start_matches(char::is_whitespace);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}
