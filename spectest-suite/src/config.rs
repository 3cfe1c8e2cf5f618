//! Suite configuration via TOML file.

use serde::{Deserialize, Serialize};
use spectest::{SpecError, SpecResult};
use spectest_dsl::TranslatorConfig;
use spectest_xref::AnnotatorConfig;
use std::fs;
use std::path::Path;

/// Loaded suite configuration. Every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub translator: TranslatorConfig,
    pub annotator: AnnotatorConfig,
    pub document: DocumentConfig,
}

/// Output settings for the annotated standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Stylesheet linked from the annotated document's `<head>`; empty for
    /// none.
    pub stylesheet: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            stylesheet: Some("../spectest.css".to_string()),
        }
    }
}

impl SuiteConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> SpecResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| SpecError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SpecError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let config = SuiteConfig::load(Path::new("/nonexistent/spectest.toml")).unwrap();
        assert_eq!(config, SuiteConfig::default());
        assert_eq!(config.translator.pixel_tolerance, 2);
        assert_eq!(config.annotator.anchor_class, "testrefs");
        assert_eq!(config.document.stylesheet.as_deref(), Some("../spectest.css"));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[translator]
pixel_tolerance = 4

[annotator]
implementation_class = "implementation"
test_link_suffix = ".htm"
"#
        )
        .unwrap();

        let config = SuiteConfig::load(file.path()).unwrap();
        assert_eq!(config.translator.pixel_tolerance, 4);
        assert_eq!(config.translator.embedded_image_prefix, "image_");
        assert_eq!(config.annotator.implementation_class, "implementation");
        assert_eq!(config.annotator.anchor_class, "testrefs");
        assert_eq!(config.annotator.test_link_suffix, ".htm");
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[translator]\npixel_tolerance = \"wide\"").unwrap();

        let err = SuiteConfig::load(file.path()).unwrap_err();
        match err {
            SpecError::Config { path, .. } => assert_eq!(path, file.path().display().to_string()),
            other => panic!("unexpected error: {}", other),
        }
    }
}
