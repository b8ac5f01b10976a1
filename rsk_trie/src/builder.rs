//! A builder for constructing short-lived tries in memory, used to compute
//! the transaction and receipt roots of a block.

use ethereum_types::H256;
use log::trace;
use thiserror::Error;

use crate::{
    bit_path::BitPath,
    node::{NodeReference, TrieNode},
    trie_hashing::TrieFormat,
    varint::{encode_uint24, CodecError},
};

/// Errors encountered while inserting into a [`TrieBuilder`].
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum BuildError {
    /// Empty values mean "no value" in the trie and cannot be inserted.
    #[error("Cannot insert an empty value at key 0x{0}")]
    EmptyValue(String),

    /// The value length does not fit in the node's 24 bit length field.
    #[error("Value is too long to store in a trie node: {0}")]
    ValueTooLong(#[from] CodecError),
}

/// Result alias for [`TrieBuilder`] operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Clone, Debug, Default)]
struct BuildNode {
    shared_path: BitPath,
    value: Option<Vec<u8>>,
    left: Option<Box<BuildNode>>,
    right: Option<Box<BuildNode>>,
}

impl BuildNode {
    fn leaf(shared_path: BitPath, value: Vec<u8>) -> Self {
        Self {
            shared_path,
            value: Some(value),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.value.is_none() && self.left.is_none() && self.right.is_none()
    }

    fn child_mut(&mut self, bit: bool) -> &mut Option<Box<BuildNode>> {
        match bit {
            false => &mut self.left,
            true => &mut self.right,
        }
    }

    /// Inserts `value` at `key[pos..]`.
    fn put(&mut self, key: &BitPath, pos: usize, value: Vec<u8>) {
        if self.is_empty() {
            self.shared_path = key.skip(pos);
            self.value = Some(value);
            return;
        }

        let common = self.shared_path.common_prefix_len(0, key, pos);
        if common < self.shared_path.len() {
            self.split(common);
        }

        let pos = pos + self.shared_path.len();
        let Ok(bit) = key.get(pos) else {
            self.value = Some(value);
            return;
        };

        let slot = self.child_mut(bit);
        match slot {
            Some(child) => child.put(key, pos + 1, value),
            None => *slot = Some(Box::new(Self::leaf(key.skip(pos + 1), value))),
        }
    }

    /// Cuts the shared path after `at` bits, moving the rest of this node
    /// into a child. The bit at `at` selects the side and is dropped.
    fn split(&mut self, at: usize) {
        let path = std::mem::take(&mut self.shared_path);
        let bit = path.get(at).unwrap_or_default();

        let moved = BuildNode {
            shared_path: path.skip(at + 1),
            value: self.value.take(),
            left: self.left.take(),
            right: self.right.take(),
        };

        self.shared_path = path.slice(0, at);
        *self.child_mut(bit) = Some(Box::new(moved));
    }

    fn into_node(self) -> TrieNode {
        let child = |c: Option<Box<BuildNode>>| {
            c.map_or(NodeReference::Empty, |c| c.into_node().into())
        };

        TrieNode::new(self.shared_path, self.value, child(self.left), child(self.right))
    }
}

/// Builds a trie from key/value pairs.
///
/// ```rust
/// # use rsk_trie::builder::TrieBuilder;
/// let mut b = TrieBuilder::new();
/// b.insert(&[0x80], vec![0x01]).unwrap();
/// b.insert(&[0x01], vec![0x02]).unwrap();
///
/// let root = b.build();
/// assert!(!root.is_terminal());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TrieBuilder {
    root: BuildNode,
    len: usize,
}

impl TrieBuilder {
    /// Creates a builder for an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value at `key`, replacing any previous value.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> BuildResult<()> {
        if value.is_empty() {
            return Err(BuildError::EmptyValue(hex::encode(key)));
        }
        encode_uint24(value.len() as u64)?;

        trace!("Inserting {} bytes at key 0x{}", value.len(), hex::encode(key));

        self.root.put(&BitPath::from_bytes(key), 0, value);
        self.len += 1;

        Ok(())
    }

    /// The number of insertions performed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Produces the root node. Every child is held in memory.
    pub fn build(self) -> TrieNode {
        self.root.into_node()
    }

    /// Builds the trie and hashes its root with the given layout.
    pub fn root_hash(self, format: TrieFormat) -> H256 {
        self.build().hash_with(format)
    }
}

#[cfg(test)]
mod tests {
    use rsk_common::EMPTY_TRIE_HASH;

    use super::{BuildError, TrieBuilder};
    use crate::{
        bit_path::BitPath,
        node::TrieNode,
        testing_utils::{common_setup, random_entries},
        trie_hashing::TrieFormat,
    };

    #[test]
    fn empty_builder_hashes_to_empty_trie() {
        assert_eq!(TrieBuilder::new().root_hash(TrieFormat::Rskip107), EMPTY_TRIE_HASH);
        assert_eq!(TrieBuilder::new().root_hash(TrieFormat::Orchid), EMPTY_TRIE_HASH);
    }

    #[test]
    fn single_entry_is_one_leaf() {
        let mut b = TrieBuilder::new();
        b.insert(&[0xab, 0xcd], vec![0x01]).unwrap();

        let root = b.build();
        assert_eq!(root, TrieNode::leaf(BitPath::from_bytes(&[0xab, 0xcd]), vec![0x01]));
    }

    #[test]
    fn diverging_keys_split_on_first_different_bit() {
        common_setup();

        // 0b1000_0000 and 0b1001_0000 share three bits, then diverge.
        let mut b = TrieBuilder::new();
        b.insert(&[0x80], vec![0x01]).unwrap();
        b.insert(&[0x90], vec![0x02]).unwrap();

        let root = b.build();
        assert_eq!(root.shared_path, BitPath::from_encoded(&[0x80], 3).unwrap());
        assert!(root.value.is_none());

        let left = root.left.node().unwrap();
        let right = root.right.node().unwrap();
        assert_eq!(left.shared_path, BitPath::from_encoded(&[0x00], 4).unwrap());
        assert_eq!(left.value(), Some(&[0x01][..]));
        assert_eq!(right.shared_path, BitPath::from_encoded(&[0x00], 4).unwrap());
        assert_eq!(right.value(), Some(&[0x02][..]));
    }

    #[test]
    fn prefix_keys_hold_values_on_inner_nodes() {
        let mut b = TrieBuilder::new();
        b.insert(&[0x01, 0x02], vec![0x0b]).unwrap();
        b.insert(&[0x01], vec![0x0a]).unwrap();

        let root = b.build();
        assert_eq!(root.shared_path, BitPath::from_bytes(&[0x01]));
        assert_eq!(root.value(), Some(&[0x0a][..]));
        assert!(root.right.is_empty());

        let left = root.left.node().unwrap();
        assert_eq!(left.shared_path, BitPath::from_encoded(&[0x04], 7).unwrap());
        assert_eq!(left.value(), Some(&[0x0b][..]));
    }

    #[test]
    fn overwriting_replaces_the_value() {
        let mut b = TrieBuilder::new();
        b.insert(&[0x01], vec![0x0a]).unwrap();
        b.insert(&[0x02], vec![0x0b]).unwrap();
        b.insert(&[0x01], vec![0x0c]).unwrap();

        let mut expected = TrieBuilder::new();
        expected.insert(&[0x02], vec![0x0b]).unwrap();
        expected.insert(&[0x01], vec![0x0c]).unwrap();

        assert_eq!(b.root_hash(TrieFormat::Rskip107), expected.root_hash(TrieFormat::Rskip107));
    }

    #[test]
    fn root_does_not_depend_on_insertion_order() {
        common_setup();

        let entries = random_entries(64, 7);
        let mut forward = TrieBuilder::new();
        let mut backward = TrieBuilder::new();

        for (k, v) in entries.iter() {
            forward.insert(k, v.clone()).unwrap();
        }
        for (k, v) in entries.iter().rev() {
            backward.insert(k, v.clone()).unwrap();
        }

        let (forward, backward) = (forward.build(), backward.build());
        assert_eq!(forward, backward);
        assert_eq!(forward.hash(), backward.hash());
        assert_eq!(forward.hash_orchid(), backward.hash_orchid());
    }

    #[test]
    fn empty_values_are_rejected() {
        assert!(matches!(
            TrieBuilder::new().insert(&[1], vec![]),
            Err(BuildError::EmptyValue(_))
        ));
    }
}
