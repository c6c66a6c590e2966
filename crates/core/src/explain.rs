//! Score explanation tree
//!
//! When a request asks for explanations, scoring strategies record how each
//! score was derived. The result is a nested {description, value, children}
//! tree suitable for serialization in a debug response.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a score explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Human-readable description of this contribution
    pub description: String,
    /// Numeric value of this contribution
    pub value: f32,
    /// Nested contributions this one is derived from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Explanation>,
}

impl Explanation {
    /// Create a leaf explanation
    pub fn leaf(description: impl Into<String>, value: f32) -> Self {
        Explanation {
            description: description.into(),
            value,
            children: Vec::new(),
        }
    }

    /// Create an explanation with nested contributions
    pub fn node(description: impl Into<String>, value: f32, children: Vec<Explanation>) -> Self {
        Explanation {
            description: description.into(),
            value,
            children,
        }
    }

    /// Append a child contribution
    pub fn push(&mut self, child: Explanation) {
        self.children.push(child);
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{} = {}", "  ".repeat(depth), self.description, self.value)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explanation_tree_shape() {
        let mut root = Explanation::leaf("sum of fields", 3.0);
        root.push(Explanation::node(
            "field title",
            2.0,
            vec![Explanation::leaf("term hello", 2.0)],
        ));
        root.push(Explanation::leaf("field body", 1.0));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children[0].description, "term hello");
    }

    #[test]
    fn test_explanation_display_indents() {
        let root = Explanation::node("total", 1.5, vec![Explanation::leaf("part", 1.5)]);
        let text = root.to_string();
        assert!(text.contains("total = 1.5"));
        assert!(text.contains("  part = 1.5"));
    }

    #[test]
    fn test_explanation_serializes_without_empty_children() {
        let leaf = Explanation::leaf("idf", 0.25);
        let json = serde_json::to_string(&leaf).unwrap();
        assert!(!json.contains("children"));
    }
}
