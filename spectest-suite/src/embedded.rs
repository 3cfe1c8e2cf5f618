//! Metadata for tests embedded in a browser harness.
//!
//! The harness page itself comes from an external template; this module
//! decides what goes into it: display name, translated code, which helper
//! scripts the code needs and whether the harness should finish the test
//! on its own.

use serde::Serialize;
use spectest::TestCase;
use std::fmt;

/// Harness helpers a test body may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Helper {
    #[serde(rename = "isPixel")]
    IsPixel,
    #[serde(rename = "todo_isPixel")]
    TodoIsPixel,
    #[serde(rename = "deferTest")]
    DeferTest,
    #[serde(rename = "wrapFunction")]
    WrapFunction,
}

impl Helper {
    pub const ALL: [Helper; 4] = [
        Helper::IsPixel,
        Helper::TodoIsPixel,
        Helper::DeferTest,
        Helper::WrapFunction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Helper::IsPixel => "isPixel",
            Helper::TodoIsPixel => "todo_isPixel",
            Helper::DeferTest => "deferTest",
            Helper::WrapFunction => "wrapFunction",
        }
    }

    /// Helpers mentioned anywhere in `code`, in declaration order.
    pub fn used_by(code: &str) -> Vec<Helper> {
        Self::ALL
            .into_iter()
            .filter(|h| code.contains(h.as_str()))
            .collect()
    }
}

impl fmt::Display for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image element of a test page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Element id: the file name without directories.
    pub id: String,
    pub src: String,
}

/// The embedded rendition of one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedTest {
    /// `test_NAME.html`
    pub file_name: String,
    /// Test name, with ` - bug N` when a tracking bug is set.
    pub display_name: String,
    pub description: Option<String>,
    pub code: String,
    pub helpers: Vec<Helper>,
    /// The harness wraps the whole body in an exception check.
    pub expects_exception: bool,
    /// The harness calls `SimpleTest.finish()` after the body; false when
    /// the test defers its own completion.
    pub auto_finish: bool,
    pub images: Vec<ImageRef>,
}

impl EmbeddedTest {
    /// Assemble the embedded artifact from already translated `code`.
    pub fn new(test: &TestCase, code: String, images: Vec<ImageRef>) -> Self {
        let mozilla = test.mozilla.as_ref();
        let display_name = match mozilla.and_then(|m| m.bug) {
            Some(bug) => format!("{} - bug {}", test.name, bug),
            None => test.name.clone(),
        };
        let helpers = Helper::used_by(&code);

        Self {
            file_name: format!("test_{}.html", test.name),
            display_name,
            description: test.desc.clone(),
            auto_finish: !helpers.contains(&Helper::DeferTest),
            helpers,
            expects_exception: mozilla.map_or(false, |m| m.throws),
            code,
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectest::MozillaFlags;

    #[test]
    fn test_helpers_in_declaration_order() {
        let code = "deferTest(); todo_isPixel(ctx, 1,1, 0,0,0,0, \"1,1\", \"0,0,0,0\", 0);";
        assert_eq!(
            Helper::used_by(code),
            vec![Helper::IsPixel, Helper::TodoIsPixel, Helper::DeferTest]
        );
        assert!(Helper::used_by("ok(true, \"true\");").is_empty());
    }

    #[test]
    fn test_bug_number_and_flags() {
        let mut test = TestCase::new("2d.drawImage.null", "");
        test.mozilla = Some(MozillaFlags {
            bug: Some(401788),
            throws: true,
            disabled: false,
        });

        let embedded = EmbeddedTest::new(&test, "ctx.drawImage(null, 0, 0);".to_string(), vec![]);
        assert_eq!(embedded.display_name, "2d.drawImage.null - bug 401788");
        assert_eq!(embedded.file_name, "test_2d.drawImage.null.html");
        assert!(embedded.expects_exception);
        assert!(embedded.auto_finish);
    }

    #[test]
    fn test_deferred_tests_finish_themselves() {
        let test = TestCase::new("2d.pattern.image.async", "");
        let embedded = EmbeddedTest::new(&test, "deferTest();\nimg.onload = wrapFunction(f);".to_string(), vec![]);
        assert!(!embedded.auto_finish);
        assert_eq!(embedded.helpers, vec![Helper::DeferTest, Helper::WrapFunction]);
    }
}
