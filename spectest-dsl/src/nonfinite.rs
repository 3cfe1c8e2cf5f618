//! Expansion of `@nonfinite` directives.
//!
//! A directive such as
//!
//! ```text
//! @nonfinite ctx.arc(<0 Infinity -Infinity NaN>, <0 Infinity>, <1>);
//! ```
//!
//! lists, per argument, a valid value followed by invalid (usually
//! non-finite) alternatives. Expansion produces one call per boundary case:
//! every invalid value alone, then every combination of two or more
//! arguments set to their first invalid value.

use spectest::{SpecError, SpecResult};

/// Generate the boundary-condition calls for `callable`.
///
/// `alternatives` holds one entry per argument; the first element of each
/// entry is the valid value. Each returned string is
/// `callable(arg0, arg1, ...)` followed by `tail`.
///
/// Single substitutions come first (argument order, then alternative
/// order), followed by the multi-argument combinations in depth-first order.
/// Combinations only use the first invalid value of each argument.
pub fn expand<S: AsRef<str>>(
    callable: &str,
    alternatives: &[Vec<S>],
    tail: &str,
) -> SpecResult<Vec<String>> {
    let baseline: Vec<&str> = alternatives
        .iter()
        .map(|alts| alts.first().map(AsRef::as_ref))
        .collect::<Option<_>>()
        .filter(|baseline: &Vec<&str>| !baseline.is_empty())
        .ok_or_else(|| SpecError::Arity {
            callable: callable.to_string(),
        })?;

    let mut calls = Vec::new();

    for (i, alts) in alternatives.iter().enumerate() {
        for invalid in alts.iter().skip(1) {
            let mut call = baseline.clone();
            call[i] = invalid.as_ref();
            calls.push(call);
        }
    }

    combine(alternatives, &baseline, 0, 0, &mut calls);

    Ok(calls
        .into_iter()
        .map(|call| format!("{}({}){}", callable, call.join(", "), tail))
        .collect())
}

/// Depth-first walk over strictly increasing position sequences. `depth` is
/// the number of substitutions already active in `call`; only calls with at
/// least two substitutions are emitted.
fn combine<'a, S: AsRef<str>>(
    alternatives: &'a [Vec<S>],
    call: &[&'a str],
    start: usize,
    depth: usize,
    calls: &mut Vec<Vec<&'a str>>,
) {
    for i in start..alternatives.len() {
        if let Some(first_invalid) = alternatives[i].get(1) {
            let mut next = call.to_vec();
            next[i] = first_invalid.as_ref();
            if depth > 0 {
                calls.push(next.clone());
            }
            combine(alternatives, &next, i + 1, depth + 1, calls);
        }
    }
}

/// Parse the argument list of a `@nonfinite` directive.
///
/// Arguments are separated by `", "`. An argument written `<v a b>` has the
/// valid value `v` and invalid alternatives `a` and `b`; an argument without
/// angle brackets is passed through unchanged in every call. An empty list
/// parses to no arguments.
pub fn parse_arguments(argstr: &str) -> Vec<Vec<String>> {
    if argstr.trim().is_empty() {
        return Vec::new();
    }
    argstr
        .split(", ")
        .map(|arg| match (arg.find('<'), arg.rfind('>')) {
            (Some(0), Some(end)) if end > 0 => {
                arg[1..end].split(' ').map(str::to_string).collect()
            }
            _ => vec![arg.to_string()],
        })
        .collect()
}
