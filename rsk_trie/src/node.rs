//! Definitions for the core types [`TrieNode`] and [`NodeReference`].
//!
//! RSK stores accounts, contract storage and contract code in one binary
//! trie. Every node carries a compressed shared path, at most two children
//! and optionally a value. Small values live inside the node; values longer
//! than [`MAX_INLINE_VALUE_SIZE`] bytes are "long values" that the node only
//! references by hash and length.

use enum_as_inner::EnumAsInner;
use ethereum_types::H256;
use keccak_hash::keccak;

use crate::{bit_path::BitPath, varint::Uint24};

/// Values longer than this are stored outside the node.
pub const MAX_INLINE_VALUE_SIZE: usize = 32;

/// A reference from a node to one of its children.
#[derive(Clone, Debug, Default, EnumAsInner, Eq, Hash, PartialEq)]
pub enum NodeReference {
    /// No child on this side.
    #[default]
    Empty,

    /// A child known only by the hash of its serialized message. Resolving
    /// it needs a mapping from hash to node bytes supplied by the caller.
    Hash(H256),

    /// A child held in memory. Children decoded from an embedded section of
    /// their parent land here, and so do the children of tries built with
    /// [`TrieBuilder`][crate::builder::TrieBuilder].
    Embedded(Box<TrieNode>),
}

impl From<TrieNode> for NodeReference {
    fn from(v: TrieNode) -> Self {
        Self::Embedded(Box::new(v))
    }
}

impl From<H256> for NodeReference {
    fn from(v: H256) -> Self {
        Self::Hash(v)
    }
}

impl NodeReference {
    /// Returns the in-memory node if this reference holds one.
    pub fn node(&self) -> Option<&TrieNode> {
        self.as_embedded().map(|n| &**n)
    }

    /// The contribution of this child to its parent's children size: the
    /// child's own children size, its external value length and its message
    /// length. Children known only by hash contribute nothing since their
    /// sizes are unknown.
    pub fn reference_size(&self) -> u64 {
        match self {
            NodeReference::Empty | NodeReference::Hash(_) => 0,
            NodeReference::Embedded(n) => {
                let external_value_len = match n.has_long_value() {
                    true => n.value_length as u64,
                    false => 0,
                };

                n.children_size() + external_value_len + n.to_message().len() as u64
            }
        }
    }
}

/// One node of RSK's binary trie.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TrieNode {
    /// Compressed path consumed before branching. The bit that selects a
    /// child is implicit and never part of the child's shared path.
    pub shared_path: BitPath,

    /// Child taken when the next key bit is `0`.
    pub left: NodeReference,

    /// Child taken when the next key bit is `1`.
    pub right: NodeReference,

    /// The value stored at this node, when its bytes are available. Absent
    /// for long values that were not resolved.
    pub value: Option<Vec<u8>>,

    /// Length of the value in bytes.
    pub value_length: Uint24,

    /// Hash of the value. Present iff the node holds a long value.
    pub value_hash: Option<H256>,

    /// Aggregated size of the subtree below this node, as recorded in the
    /// serialized message. `None` when the node was not decoded from a
    /// message or is terminal.
    pub children_size: Option<u64>,
}

impl TrieNode {
    /// Creates a node, deriving its value length, value hash and children
    /// size from its parts.
    pub fn new(
        shared_path: BitPath,
        value: Option<Vec<u8>>,
        left: NodeReference,
        right: NodeReference,
    ) -> Self {
        let value = value.filter(|v| !v.is_empty());
        let value_length = value.as_ref().map_or(0, |v| v.len() as Uint24);
        let value_hash = value
            .as_ref()
            .filter(|v| v.len() > MAX_INLINE_VALUE_SIZE)
            .map(keccak);

        let mut node = Self {
            shared_path,
            left,
            right,
            value,
            value_length,
            value_hash,
            children_size: None,
        };

        if !node.is_terminal() {
            node.children_size =
                Some(node.left.reference_size() + node.right.reference_size());
        }

        node
    }

    /// Creates a childless node holding `value`.
    pub fn leaf(shared_path: BitPath, value: Vec<u8>) -> Self {
        Self::new(
            shared_path,
            Some(value),
            NodeReference::Empty,
            NodeReference::Empty,
        )
    }

    /// A node with both children empty.
    pub fn is_terminal(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// A node with no value and no children.
    pub fn is_empty_trie(&self) -> bool {
        self.value_length == 0 && self.value_hash.is_none() && self.is_terminal()
    }

    /// Whether the value is stored outside the node.
    pub fn has_long_value(&self) -> bool {
        self.value_hash.is_some()
    }

    /// The inline value bytes, if any.
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// The children size to serialize. Falls back to summing in-memory
    /// children when the node was not decoded from a message.
    pub fn children_size(&self) -> u64 {
        match self.is_terminal() {
            true => 0,
            false => self
                .children_size
                .unwrap_or_else(|| self.left.reference_size() + self.right.reference_size()),
        }
    }

    /// Returns the child selected by `bit`.
    pub fn child(&self, bit: bool) -> &NodeReference {
        match bit {
            false => &self.left,
            true => &self.right,
        }
    }
}
