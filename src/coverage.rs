//! Coverage index: which tests claim which spec assertions.

use crate::record::TestCase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assertion id → names of the tests claiming it, in claim order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageIndex {
    claims: BTreeMap<String, Vec<String>>,
}

impl CoverageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from every test's `testing` list.
    pub fn from_tests<'a>(tests: impl IntoIterator<Item = &'a TestCase>) -> Self {
        let mut index = Self::new();
        for test in tests {
            index.record(test);
        }
        index
    }

    /// Record all claims made by one test.
    pub fn record(&mut self, test: &TestCase) {
        for id in &test.testing {
            self.claim(id, &test.name);
        }
    }

    pub fn claim(&mut self, assertion_id: &str, test_name: &str) {
        self.claims
            .entry(assertion_id.to_string())
            .or_default()
            .push(test_name.to_string());
    }

    /// Tests claiming an assertion (empty when unclaimed).
    pub fn claims(&self, assertion_id: &str) -> &[String] {
        self.claims
            .get(assertion_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_claimed(&self, assertion_id: &str) -> bool {
        self.claims.contains_key(assertion_id)
    }

    /// Claimed assertion ids in sorted order.
    pub fn assertion_ids(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_many() {
        let tests = vec![
            TestCase::new("2d.fillRect.basic", "").testing(&["2d.fillRect", "2d.fillStyle"]),
            TestCase::new("2d.fillRect.zero", "").testing(&["2d.fillRect"]),
        ];
        let index = CoverageIndex::from_tests(&tests);

        assert_eq!(index.claims("2d.fillRect"), ["2d.fillRect.basic", "2d.fillRect.zero"]);
        assert_eq!(index.claims("2d.fillStyle"), ["2d.fillRect.basic"]);
        assert!(index.claims("2d.strokeRect").is_empty());
        assert!(!index.is_claimed("2d.strokeRect"));
        assert_eq!(index.len(), 2);
    }
}
