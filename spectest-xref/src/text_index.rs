//! Flattened text of a run of sibling nodes, with a map back to the text
//! nodes it came from.
//!
//! Anchors (elements carrying the anchor class) contribute no text, so
//! offsets into the flattened text survive anchor insertion unchanged. The
//! index itself is a snapshot: build a new one after every tree edit.

use crate::markup::Node;

/// One text node's slice of the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// Child indices from the indexed run down to the text node; the first
    /// entry indexes into the run itself.
    pub path: Vec<usize>,
    /// Byte offset of the node's first character in the flattened text.
    pub start: usize,
    pub len: usize,
}

impl TextSegment {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// An anchor already present in the indexed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSite {
    /// Flattened offset at which the anchor sits.
    pub offset: usize,
    /// Assertion id from the anchor's `id` attribute, if it has one.
    pub assertion_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    text: String,
    segments: Vec<TextSegment>,
    anchors: Vec<AnchorSite>,
}

impl TextIndex {
    /// Index `nodes`, skipping elements whose class list contains
    /// `anchor_class`.
    pub fn build(nodes: &[Node], anchor_class: &str) -> Self {
        let mut index = Self::default();
        let mut path = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            path.push(i);
            index.visit(node, &mut path, anchor_class);
            path.pop();
        }
        index
    }

    fn visit(&mut self, node: &Node, path: &mut Vec<usize>, anchor_class: &str) {
        match node {
            Node::Text(text) => {
                self.segments.push(TextSegment {
                    path: path.clone(),
                    start: self.text.len(),
                    len: text.len(),
                });
                self.text.push_str(text);
            }
            Node::Element(el) if el.has_class(anchor_class) => {
                let prefix = format!("{}.", anchor_class);
                self.anchors.push(AnchorSite {
                    offset: self.text.len(),
                    assertion_id: el
                        .attribute("id")
                        .and_then(|id| id.strip_prefix(prefix.as_str()))
                        .map(str::to_string),
                });
            }
            Node::Element(el) => {
                for (i, child) in el.children.iter().enumerate() {
                    path.push(i);
                    self.visit(child, path, anchor_class);
                    path.pop();
                }
            }
            Node::Comment(_) => {}
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    pub fn anchors(&self) -> &[AnchorSite] {
        &self.anchors
    }

    /// The anchor already sitting at `offset`, if any.
    pub fn anchor_at(&self, offset: usize) -> Option<&AnchorSite> {
        self.anchors.iter().find(|a| a.offset == offset)
    }

    /// Map a flattened offset to a text node and an offset inside it.
    ///
    /// An offset on the boundary between two text nodes belongs to the start
    /// of the later node. The end of the text belongs to the end of the last
    /// node. Returns `None` only when the run holds no text nodes.
    pub fn locate(&self, offset: usize) -> Option<(&TextSegment, usize)> {
        self.segments
            .iter()
            .find(|seg| offset < seg.end())
            .or_else(|| self.segments.last())
            .map(|seg| (seg, offset.saturating_sub(seg.start).min(seg.len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Element;

    fn paragraph() -> Vec<Node> {
        vec![Node::Element(
            Element::new("p")
                .with_text("The ")
                .with_child(Element::new("code").with_text("arc()"))
                .with_child(
                    Element::new("span")
                        .with_attribute("class", "testrefs kw-must")
                        .with_attribute("id", "testrefs.2d.arc")
                        .with_text(" # "),
                )
                .with_text(" method"),
        )]
    }

    #[test]
    fn test_flatten_skips_anchors() {
        let index = TextIndex::build(&paragraph(), "testrefs");
        assert_eq!(index.text(), "The arc() method");
        assert_eq!(
            index.segments().iter().map(|s| s.path.clone()).collect::<Vec<_>>(),
            vec![vec![0, 0], vec![0, 1, 0], vec![0, 3]]
        );
        assert_eq!(
            index.anchors(),
            [AnchorSite {
                offset: 9,
                assertion_id: Some("2d.arc".to_string()),
            }]
        );
    }

    #[test]
    fn test_locate_boundaries() {
        let index = TextIndex::build(&paragraph(), "testrefs");

        let (seg, at) = index.locate(2).unwrap();
        assert_eq!((seg.path.as_slice(), at), (&[0, 0][..], 2));

        // "The " ends at 4: the boundary belongs to the <code> text
        let (seg, at) = index.locate(4).unwrap();
        assert_eq!((seg.path.as_slice(), at), (&[0, 1, 0][..], 0));

        let (seg, at) = index.locate(16).unwrap();
        assert_eq!((seg.path.as_slice(), at), (&[0, 3][..], 7));
    }

    #[test]
    fn test_locate_without_text() {
        let nodes = vec![Node::Element(Element::new("hr"))];
        assert!(TextIndex::build(&nodes, "testrefs").locate(0).is_none());
    }
}
