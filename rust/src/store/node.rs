//! Recursive value model: a leaf string or an ordered branch of named children.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Children of a branch, kept in insertion order.
pub type Branch = IndexMap<String, VariableNode>;

/// Serializes untagged, so a tree dumps to JSON as nested objects of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableNode {
    Leaf(String),
    Branch(Branch),
}

impl VariableNode {
    pub fn empty_branch() -> Self {
        VariableNode::Branch(IndexMap::new())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            VariableNode::Leaf(value) => Some(value),
            VariableNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            VariableNode::Branch(children) => Some(children),
            VariableNode::Leaf(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, VariableNode::Leaf(_))
    }

    /// Turns a leaf into an empty branch and returns the children.
    pub(crate) fn make_branch(&mut self) -> &mut Branch {
        if self.is_leaf() {
            *self = VariableNode::empty_branch();
        }
        match self {
            VariableNode::Branch(children) => children,
            VariableNode::Leaf(_) => unreachable!("leaf was replaced by a branch"),
        }
    }

    /// Every `(path, value)` leaf pair below this node, depth first, with
    /// segments joined by `separator`.
    pub fn flatten(&self, separator: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        flatten_into(self, separator, &mut path, &mut out);
        out
    }
}

fn flatten_into<'a>(
    node: &'a VariableNode,
    separator: &str,
    path: &mut Vec<&'a str>,
    out: &mut Vec<(String, String)>,
) {
    match node {
        VariableNode::Leaf(value) => out.push((path.join(separator), value.clone())),
        VariableNode::Branch(children) => {
            for (key, child) in children {
                path.push(key.as_str());
                flatten_into(child, separator, path, out);
                path.pop();
            }
        }
    }
}
