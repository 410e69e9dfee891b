//! Node storage types

use std::fmt;

/// Index of a node in its document's arena.
///
/// Ids stay valid for the document's lifetime; detached nodes keep their id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The document node, always the first node of the arena
    pub const DOCUMENT: NodeId = NodeId(0);

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element payload: tag name plus attributes in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementData {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets `name`, returning the previous value.
    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) -> Option<String> {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
            None => {
                self.attributes.push((name.to_string(), value.to_string()));
                None
            }
        }
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The document node at the top of the tree
    Document,
    Element(ElementData),
    Text(String),
    /// Trusted markup inserted verbatim; never parsed or sanitized
    Markup(String),
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_set_replace_remove() {
        let mut el = ElementData::new("BUTTON");
        assert_eq!(el.tag, "button");

        assert_eq!(el.set_attribute("title", "Hi"), None);
        assert_eq!(el.set_attribute("title", "Hello"), Some("Hi".to_string()));
        assert_eq!(el.attribute("title"), Some("Hello"));

        assert_eq!(el.remove_attribute("title"), Some("Hello".to_string()));
        assert_eq!(el.attribute("title"), None);
        assert_eq!(el.remove_attribute("title"), None);
    }

    #[test]
    fn test_classes() {
        let mut el = ElementData::new("div");
        el.set_attribute("class", "  flag active\tbig ");
        assert_eq!(el.classes().collect::<Vec<_>>(), vec!["flag", "active", "big"]);
    }
}
