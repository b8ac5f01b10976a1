//! Various types and logic that don't fit well into any other module.

use std::fmt::{self, Display};

use crate::node::{NodeReference, TrieNode};

/// Simplified trie node type to make logging cleaner.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrieNodeType {
    /// A node without value or children.
    Empty,

    /// A node without children.
    Leaf,

    /// A node with at least one child.
    Branch,

    /// A child known only by its hash.
    Hash,
}

impl From<&TrieNode> for TrieNodeType {
    fn from(node: &TrieNode) -> Self {
        match (node.is_empty_trie(), node.is_terminal()) {
            (true, _) => Self::Empty,
            (false, true) => Self::Leaf,
            (false, false) => Self::Branch,
        }
    }
}

impl From<&NodeReference> for TrieNodeType {
    fn from(r: &NodeReference) -> Self {
        match r {
            NodeReference::Empty => Self::Empty,
            NodeReference::Hash(_) => Self::Hash,
            NodeReference::Embedded(n) => (&**n).into(),
        }
    }
}

impl Display for TrieNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrieNodeType::Empty => "Empty",
            TrieNodeType::Leaf => "Leaf",
            TrieNodeType::Branch => "Branch",
            TrieNodeType::Hash => "Hash",
        };

        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;

    use super::TrieNodeType;
    use crate::{
        bit_path::BitPath,
        node::{NodeReference, TrieNode},
    };

    #[test]
    fn node_types() {
        let leaf = TrieNode::leaf(BitPath::empty(), vec![1]);
        let branch = TrieNode::new(
            BitPath::empty(),
            None,
            leaf.clone().into(),
            NodeReference::Hash(H256::zero()),
        );

        assert_eq!(TrieNodeType::from(&TrieNode::default()), TrieNodeType::Empty);
        assert_eq!(TrieNodeType::from(&leaf), TrieNodeType::Leaf);
        assert_eq!(TrieNodeType::from(&branch), TrieNodeType::Branch);
        assert_eq!(TrieNodeType::from(&branch.left), TrieNodeType::Leaf);
        assert_eq!(TrieNodeType::from(&branch.right).to_string(), "Hash");
    }
}
