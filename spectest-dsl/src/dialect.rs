//! Output dialects.
//!
//! Both dialects recognise the same directives; they differ in the call
//! names and argument shapes they emit, and in how a typed exception is
//! checked (error code in the standalone runner, caught-exception value in
//! the embedded harness).

use crate::directive::{CompareOp, Directive, Tolerance};
use crate::escape::escape_message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target shape for translated test code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Self-contained test page driven by the suite's own runner (`_assert*`).
    Standalone,
    /// Test embedded in a browser harness (`ok`, `isPixel`, `todo`).
    Embedded,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Standalone, Dialect::Embedded];

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Standalone => "standalone",
            Dialect::Embedded => "embedded",
        }
    }

    /// Render one directive. `@nonfinite` is expanded by the translator
    /// before rendering and renders as its source here.
    pub fn render(self, directive: &Directive<'_>, default_tolerance: u32) -> String {
        match self {
            Dialect::Standalone => render_standalone(directive, default_tolerance),
            Dialect::Embedded => render_embedded(directive, default_tolerance),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tolerance_text(tolerance: Tolerance<'_>, default_tolerance: u32) -> String {
    match tolerance {
        Tolerance::Exact => "0".to_string(),
        Tolerance::Default => default_tolerance.to_string(),
        Tolerance::Explicit(t) => t.to_string(),
    }
}

fn render_standalone(directive: &Directive<'_>, default_tolerance: u32) -> String {
    match *directive {
        Directive::Pixel {
            coord,
            color,
            tolerance: Tolerance::Exact,
        } => format!(
            "_assertPixel(canvas, {}, {}, \"{}\", \"{}\");",
            coord, color, coord, color
        ),
        Directive::Pixel {
            coord,
            color,
            tolerance,
        } => format!(
            "_assertPixelApprox(canvas, {}, {}, \"{}\", \"{}\", {});",
            coord,
            color,
            coord,
            color,
            tolerance_text(tolerance, default_tolerance)
        ),
        Directive::ThrowsTyped { error, statement } => format!(
            "try {{ var _thrown = false;\n  {stmt};\n}} catch (e) {{ if (e.code != DOMException.{err}) \
             _fail(\"Failed assertion: expected exception of type {err}, got: \"+e.message); \
             _thrown = true; }} finally {{ _assert(_thrown, \"should throw exception of type {err}: {msg}\"); }}",
            stmt = statement,
            err = error,
            msg = escape_message(statement)
        ),
        Directive::Throws { statement } => format!(
            "try {{ var _thrown = false; {}; }} catch (e) {{ _thrown = true; }} \
             finally {{ _assert(_thrown, \"should throw exception: {}\"); }}",
            statement,
            escape_message(statement)
        ),
        Directive::Compare { lhs, op, rhs } => {
            let call = match op {
                CompareOp::Same => "_assertSame",
                CompareOp::Different => "_assertDifferent",
                CompareOp::Equal => "_assertEqual",
            };
            format!(
                "{}({}, {}, \"{}\", \"{}\");",
                call,
                lhs,
                rhs,
                escape_message(lhs),
                escape_message(rhs)
            )
        }
        Directive::Match { lhs, rhs } => format!(
            "_assertMatch({}, {}, \"{}\", \"{}\");",
            lhs,
            rhs,
            escape_message(lhs),
            escape_message(rhs)
        ),
        Directive::Truthy { expr } => format!("_assert({}, \"{}\");", expr, escape_message(expr)),
        Directive::Manual => "_requireManualCheck();".to_string(),
        Directive::Crash => "return _crash();".to_string(),
        Directive::UniversalBrowserRead | Directive::Todo => String::new(),
        Directive::NonFinite {
            callable,
            arguments,
            tail,
        } => format!("@nonfinite {}({}){}", callable, arguments, tail),
    }
}

fn render_embedded(directive: &Directive<'_>, default_tolerance: u32) -> String {
    match *directive {
        Directive::Pixel {
            coord,
            color,
            tolerance,
        } => format!(
            "isPixel(ctx, {}, {}, \"{}\", \"{}\", {});",
            coord,
            color,
            coord,
            color,
            tolerance_text(tolerance, default_tolerance)
        ),
        Directive::ThrowsTyped { error, statement } => format!(
            "var _thrown = undefined; try {{\n  {stmt};\n}} catch (e) {{ _thrown = e }}; \
             ok(_thrown && _thrown.code == DOMException.{err}, \"should throw {err}\");",
            stmt = statement,
            err = error
        ),
        Directive::Throws { statement } => format!(
            "try {{ var _thrown = false;\n  {};\n}} catch (e) {{ _thrown = true; }} \
             finally {{ ok(_thrown, \"should throw exception\"); }}",
            statement
        ),
        Directive::Compare { lhs, op, rhs } => {
            let expr = format!("{} {} {}", lhs, op.as_str(), rhs);
            // `=~` binds loosest in the embedded harness.
            match expr.rfind(" =~ ") {
                Some(at) => embedded_match(&expr[..at], &expr[at + 4..]),
                None => format!("ok({}, \"{}\");", expr, escape_message(&expr)),
            }
        }
        Directive::Match { lhs, rhs } => embedded_match(lhs, rhs),
        Directive::Truthy { expr } => format!("ok({}, \"{}\");", expr, escape_message(expr)),
        Directive::Manual => "/* manual check required */".to_string(),
        Directive::Crash => "return;".to_string(),
        Directive::UniversalBrowserRead => {
            "netscape.security.PrivilegeManager.enablePrivilege('UniversalBrowserRead');"
                .to_string()
        }
        // Resolved against the preceding statement once the whole body is
        // rewritten.
        Directive::Todo => " @moz-todo".to_string(),
        Directive::NonFinite {
            callable,
            arguments,
            tail,
        } => format!("@nonfinite {}({}){}", callable, arguments, tail),
    }
}

fn embedded_match(lhs: &str, rhs: &str) -> String {
    format!(
        "ok({}.match({}), \"{}.match({})\");",
        lhs,
        rhs,
        escape_message(lhs),
        escape_message(rhs)
    )
}
