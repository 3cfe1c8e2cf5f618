//! Escaping of DSL source text for use inside generated string literals.

use once_cell::sync::Lazy;
use regex::Regex;

static SUBSCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\w+)\]").unwrap());

/// Escape source text for a double-quoted failure message.
///
/// Backslashes and quotes are escaped. A subscript `[i]` is spliced out of
/// the literal as `[\""+(i)+"\"]`, so the message shows the runtime value of
/// the index instead of its name.
pub fn escape_message(source: &str) -> String {
    let escaped = source.replace('\\', "\\\\").replace('"', "\\\"");
    SUBSCRIPT
        .replace_all(&escaped, r#"[\""+(${1})+"\"]"#)
        .into_owned()
}
