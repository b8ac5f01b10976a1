//! Serialization of [`TrieNode`]s into their binary messages and the hashes
//! derived from them.
//!
//! Two message layouts exist. Orchid is the layout used before RSKIP-107 and
//! is still needed to recompute the transaction and receipt roots of old
//! blocks. RSKIP-107 is the layout used by every node written since, and is
//! the one stored in the state trie.

use ethereum_types::H256;
use keccak_hash::keccak;
use rsk_common::EMPTY_TRIE_HASH;

use crate::{
    bit_path::BitPath,
    node::{NodeReference, TrieNode},
    varint::{VarInt, Uint24},
};

/// Version bits carried by every RSKIP-107 flags byte.
pub(crate) const RSKIP107_VERSION: u8 = 0b0100_0000;
pub(crate) const FLAG_LONG_VALUE: u8 = 0b0010_0000;
pub(crate) const FLAG_SHARED_PREFIX: u8 = 0b0001_0000;
pub(crate) const FLAG_LEFT_PRESENT: u8 = 0b0000_1000;
pub(crate) const FLAG_RIGHT_PRESENT: u8 = 0b0000_0100;
pub(crate) const FLAG_LEFT_EMBEDDED: u8 = 0b0000_0010;
pub(crate) const FLAG_RIGHT_EMBEDDED: u8 = 0b0000_0001;

/// The leading byte of every Orchid message.
pub(crate) const ORCHID_ARITY: u8 = 2;
pub(crate) const ORCHID_FLAG_SECURE: u8 = 0b01;
pub(crate) const ORCHID_FLAG_LONG_VALUE: u8 = 0b10;
pub(crate) const ORCHID_LEFT_PRESENT: u16 = 0b01;
pub(crate) const ORCHID_RIGHT_PRESENT: u16 = 0b10;

/// Children whose message is at most this long are serialized inside their
/// parent.
pub const MAX_EMBEDDED_NODE_SIZE: usize = 44;

/// Largest shared path length that fits the one byte "low" range.
pub(crate) const SHARED_PATH_LOW_MAX: usize = 32;
/// Bounds of the one byte "high" range.
pub(crate) const SHARED_PATH_HIGH_MIN: usize = 160;
pub(crate) const SHARED_PATH_HIGH_MAX: usize = 382;
pub(crate) const SHARED_PATH_HIGH_OFFSET: usize = 128;
/// Marker byte announcing a [`VarInt`] shared path length.
pub(crate) const SHARED_PATH_VARINT_MARKER: u8 = 255;

/// The message layout used to hash a node.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TrieFormat {
    /// The legacy layout, used for transaction and receipt roots before
    /// RSKIP-126.
    Orchid,

    /// The current layout.
    #[default]
    Rskip107,
}

impl TrieNode {
    /// Serializes the node using the RSKIP-107 layout.
    pub fn to_message(&self) -> Vec<u8> {
        let mut flags = RSKIP107_VERSION;
        if self.has_long_value() {
            flags |= FLAG_LONG_VALUE;
        }
        if !self.shared_path.is_empty() {
            flags |= FLAG_SHARED_PREFIX;
        }
        if !self.left.is_empty() {
            flags |= FLAG_LEFT_PRESENT;
        }
        if !self.right.is_empty() {
            flags |= FLAG_RIGHT_PRESENT;
        }
        if self.left.is_embeddable() {
            flags |= FLAG_LEFT_EMBEDDED;
        }
        if self.right.is_embeddable() {
            flags |= FLAG_RIGHT_EMBEDDED;
        }

        let mut out = vec![flags];
        encode_shared_path(&self.shared_path, &mut out);
        self.left.serialize_into(&mut out);
        self.right.serialize_into(&mut out);

        if !self.is_terminal() {
            out.extend(VarInt::new(self.children_size()).encode());
        }

        match self.value_hash {
            Some(h) => {
                out.extend_from_slice(h.as_bytes());
                out.extend_from_slice(&uint24_bytes(self.value_length));
            }
            None => out.extend_from_slice(self.value().unwrap_or_default()),
        }

        out
    }

    /// Serializes the node using the legacy Orchid layout. Children are
    /// always referenced by their Orchid hash.
    pub fn to_message_orchid(&self) -> Vec<u8> {
        let mut flags = 0;
        if self.has_long_value() {
            flags |= ORCHID_FLAG_LONG_VALUE;
        }

        let left = self.left.hash_orchid();
        let right = self.right.hash_orchid();

        let mut present = 0;
        if left.is_some() {
            present |= ORCHID_LEFT_PRESENT;
        }
        if right.is_some() {
            present |= ORCHID_RIGHT_PRESENT;
        }

        let mut out = vec![ORCHID_ARITY, flags];
        out.extend_from_slice(&present.to_be_bytes());
        out.extend_from_slice(&(self.shared_path.len() as u16).to_be_bytes());
        out.extend(self.shared_path.encode());

        for h in left.iter().chain(right.iter()) {
            out.extend_from_slice(h.as_bytes());
        }

        match self.value_hash {
            Some(h) => out.extend_from_slice(h.as_bytes()),
            None => out.extend_from_slice(self.value().unwrap_or_default()),
        }

        out
    }

    /// The node hash: keccak256 of its RSKIP-107 message.
    pub fn hash(&self) -> H256 {
        match self.is_empty_trie() {
            true => EMPTY_TRIE_HASH,
            false => keccak(self.to_message()),
        }
    }

    /// The legacy node hash: keccak256 of its Orchid message.
    pub fn hash_orchid(&self) -> H256 {
        match self.is_empty_trie() {
            true => EMPTY_TRIE_HASH,
            false => keccak(self.to_message_orchid()),
        }
    }

    /// Hashes the node with the given layout.
    pub fn hash_with(&self, format: TrieFormat) -> H256 {
        match format {
            TrieFormat::Orchid => self.hash_orchid(),
            TrieFormat::Rskip107 => self.hash(),
        }
    }
}

impl NodeReference {
    /// Whether the child is written inline into its parent's message.
    pub fn is_embeddable(&self) -> bool {
        self.node().is_some_and(|n| {
            n.is_terminal() && n.to_message().len() <= MAX_EMBEDDED_NODE_SIZE
        })
    }

    /// RSKIP-107 hash of the referenced node, if any.
    pub fn hash(&self) -> Option<H256> {
        match self {
            NodeReference::Empty => None,
            NodeReference::Hash(h) => Some(*h),
            NodeReference::Embedded(n) => Some(n.hash()),
        }
    }

    /// Orchid hash of the referenced node, if any.
    pub fn hash_orchid(&self) -> Option<H256> {
        match self {
            NodeReference::Empty => None,
            NodeReference::Hash(h) => Some(*h),
            NodeReference::Embedded(n) => Some(n.hash_orchid()),
        }
    }

    fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            NodeReference::Empty => (),
            NodeReference::Embedded(n) if self.is_embeddable() => {
                let msg = n.to_message();
                // Bounded by `MAX_EMBEDDED_NODE_SIZE`.
                out.push(msg.len() as u8);
                out.extend(msg);
            }
            _ => {
                if let Some(h) = self.hash() {
                    out.extend_from_slice(h.as_bytes());
                }
            }
        }
    }
}

/// Writes the length prefix and packed bits of a non-empty shared path.
pub(crate) fn encode_shared_path(path: &BitPath, out: &mut Vec<u8>) {
    let len = path.len();
    match len {
        0 => return,
        1..=SHARED_PATH_LOW_MAX => out.push((len - 1) as u8),
        SHARED_PATH_HIGH_MIN..=SHARED_PATH_HIGH_MAX => {
            out.push((len - SHARED_PATH_HIGH_OFFSET) as u8)
        }
        _ => {
            out.push(SHARED_PATH_VARINT_MARKER);
            out.extend(VarInt::new(len as u64).encode());
        }
    }

    out.extend(path.encode());
}

fn uint24_bytes(v: Uint24) -> [u8; 3] {
    let [_, a, b, c] = v.to_be_bytes();
    [a, b, c]
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use keccak_hash::keccak;
    use rsk_common::EMPTY_TRIE_HASH;

    use super::{encode_shared_path, TrieFormat};
    use crate::{
        bit_path::BitPath,
        node::{NodeReference, TrieNode},
    };

    fn path_of_len(len: usize) -> BitPath {
        (0..len).map(|i| i % 2 == 0).collect()
    }

    #[test]
    fn empty_trie_hashes_to_the_empty_trie_hash() {
        let n = TrieNode::default();

        assert_eq!(n.hash(), EMPTY_TRIE_HASH);
        assert_eq!(n.hash_orchid(), EMPTY_TRIE_HASH);
        assert_eq!(n.to_message(), vec![0x40]);
    }

    #[test]
    fn leaf_message_layout() {
        let n = TrieNode::leaf(BitPath::empty(), vec![0xab, 0xcd]);

        assert_eq!(n.to_message(), hex!("40abcd"));
        assert_eq!(n.hash(), keccak(hex!("40abcd")));
        assert_eq!(n.to_message_orchid(), hex!("02000000 0000 abcd"));
    }

    #[test]
    fn leaf_with_shared_path() {
        let n = TrieNode::leaf(BitPath::from_bytes(&[0xc0]), vec![0x01]);

        // flags, length byte (8 - 1), path, value
        assert_eq!(n.to_message(), hex!("50 07 c0 01"));
        assert_eq!(n.to_message_orchid(), hex!("02 00 0000 0008 c0 01"));
    }

    #[test]
    fn long_value_message_layout() {
        let v = vec![0x11; 33];
        let n = TrieNode::leaf(BitPath::empty(), v.clone());

        let mut expected = vec![0x60];
        expected.extend_from_slice(keccak(&v).as_bytes());
        expected.extend_from_slice(&[0x00, 0x00, 0x21]);
        assert_eq!(n.to_message(), expected);

        let mut expected_orchid = vec![0x02, 0x02, 0x00, 0x00, 0x00, 0x00];
        expected_orchid.extend_from_slice(keccak(&v).as_bytes());
        assert_eq!(n.to_message_orchid(), expected_orchid);
    }

    #[test]
    fn small_terminal_children_are_embedded() {
        let left = TrieNode::leaf(BitPath::empty(), vec![0x01]);
        let right = TrieNode::leaf(BitPath::empty(), vec![0x02]);
        let parent = TrieNode::new(BitPath::empty(), None, left.into(), right.into());

        // Each child is `40 0x` (2 bytes) and adds 2 to the children size.
        assert_eq!(parent.to_message(), hex!("4f 02 4001 02 4002 04"));
    }

    #[test]
    fn large_children_are_referenced_by_hash() {
        let big = TrieNode::leaf(BitPath::empty(), vec![0x33; 32]);
        let big_msg_len = big.to_message().len();
        assert_eq!(big_msg_len, 33);

        let inner = TrieNode::new(
            BitPath::empty(),
            None,
            NodeReference::Hash(keccak([0u8])),
            NodeReference::Empty,
        );
        assert!(!NodeReference::from(inner.clone()).is_embeddable());

        let parent = TrieNode::new(BitPath::empty(), None, inner.clone().into(), big.into());
        let msg = parent.to_message();

        // Left present, right present and embedded.
        assert_eq!(msg[0], 0x4d);
        assert_eq!(&msg[1..33], inner.hash().as_bytes());
        assert_eq!(msg[33] as usize, big_msg_len);
    }

    #[test]
    fn oversized_terminal_children_are_not_embedded() {
        let child = TrieNode::leaf(BitPath::from_bytes(&[0; 12]), vec![0x55; 32]);
        assert!(child.to_message().len() > super::MAX_EMBEDDED_NODE_SIZE);
        assert!(!NodeReference::from(child).is_embeddable());
    }

    #[test]
    fn shared_path_length_ranges() {
        let cases = [
            (1, vec![0x00]),
            (32, vec![31]),
            (33, vec![0xff, 33]),
            (159, vec![0xff, 159]),
            (160, vec![32]),
            (382, vec![254]),
            (383, vec![0xff, 0xfd, 0x7f, 0x01]),
        ];

        for (len, prefix) in cases {
            let p = path_of_len(len);
            let mut out = Vec::new();
            encode_shared_path(&p, &mut out);

            assert_eq!(&out[..prefix.len()], &prefix[..], "length {len}");
            assert_eq!(&out[prefix.len()..], &p.encode()[..], "length {len}");
        }
    }

    #[test]
    fn orchid_children_use_orchid_hashes() {
        let left = TrieNode::leaf(BitPath::empty(), vec![0x01]);
        let parent = TrieNode::new(
            BitPath::empty(),
            None,
            left.clone().into(),
            NodeReference::Empty,
        );

        let mut expected = vec![0x02, 0x00, 0x00, 0x01, 0x00, 0x00];
        expected.extend_from_slice(left.hash_orchid().as_bytes());
        assert_eq!(parent.to_message_orchid(), expected);
        assert_eq!(parent.hash_with(TrieFormat::Orchid), keccak(&expected));
        assert_ne!(parent.hash_with(TrieFormat::Rskip107), parent.hash_orchid());
    }

    #[test]
    fn orchid_messages_never_set_the_secure_flag() {
        let short = TrieNode::leaf(BitPath::from_bytes(&[0x80]), vec![0x01, 0x02]);
        let long = TrieNode::leaf(BitPath::empty(), vec![0x33; 40]);

        let msg = short.to_message_orchid();
        assert_eq!(msg[1], 0x00);
        assert_eq!(long.to_message_orchid()[1], 0b10);

        // A secure bit on input is accepted and does not change the node.
        let mut secure = msg.clone();
        secure[1] = 0x01;
        let decoded = TrieNode::from_message(&secure, None).unwrap();
        assert_eq!(decoded, TrieNode::from_message(&msg, None).unwrap());
        assert_eq!(decoded.to_message_orchid(), msg);
    }
}
