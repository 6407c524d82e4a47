use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node of a cached experiment tree.
///
/// Only `name`, `height`, `width` and `children` are interpreted; any other
/// attributes the runner recorded are kept so that derived experiment files
/// reproduce the matched subtrees unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub height: f64,
    pub width: f64,
    #[serde(default)]
    pub children: Vec<TreeNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TreeNode {
    pub fn new(name: &str, height: f64, width: f64, children: Vec<TreeNode>) -> Self {
        TreeNode {
            name: name.to_string(),
            height,
            width,
            children,
            extra: Map::new(),
        }
    }

    /// Iterates the node and all of its descendants in pre-order.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

/// Pre-order traversal: the node itself, then each child subtree in
/// definition order.
pub struct PreOrder<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so the first child is popped next.
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Returns the first node in pre-order whose name equals `name`.
pub fn find<'a>(name: &str, tree: &'a TreeNode) -> Result<&'a TreeNode> {
    tree.iter()
        .find(|node| node.name == name)
        .ok_or_else(|| Error::NotFound(name.to_string()))
}
