//! Parsing of serialized node messages back into [`TrieNode`]s.
//!
//! The leading byte selects the layout: a literal `2` is the Orchid arity
//! byte, anything else is an RSKIP-107 flags byte.

use std::collections::HashMap;

use ethereum_types::H256;
use log::trace;
use rsk_common::HASH_SIZE;
use thiserror::Error;

use crate::{
    bit_path::{BitPath, BitPathError},
    node::{NodeReference, TrieNode},
    trie_hashing::{
        FLAG_LEFT_EMBEDDED, FLAG_LEFT_PRESENT, FLAG_LONG_VALUE, FLAG_RIGHT_EMBEDDED,
        FLAG_RIGHT_PRESENT, FLAG_SHARED_PREFIX, ORCHID_ARITY, ORCHID_FLAG_LONG_VALUE,
        ORCHID_FLAG_SECURE, ORCHID_LEFT_PRESENT, ORCHID_RIGHT_PRESENT, SHARED_PATH_HIGH_OFFSET,
        SHARED_PATH_LOW_MAX, SHARED_PATH_VARINT_MARKER,
    },
    varint::{decode_uint24, field, read_var_int, CodecError, UINT24_SIZE},
};

/// Longest shared path accepted from a message, in bits.
pub const MAX_SHARED_PATH_BITS: u64 = u16::MAX as u64 * 8;

/// Errors encountered while parsing a node message.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum NodeDecodeError {
    /// The message has no bytes at all.
    #[error("Node message is empty")]
    EmptyMessage,

    /// A field runs past the end of the message.
    #[error("Node message is truncated: {0}")]
    Truncated(#[from] CodecError),

    /// An Orchid message whose first byte is not `2`.
    #[error("Orchid node has arity {0}, expected 2")]
    InvalidArity(u8),

    /// A flag combination no known layout produces.
    #[error("Node has an invalid flag combination ({flags:#010b})")]
    InvalidFlags {
        /// The offending flags.
        flags: u16,
    },

    /// The declared shared path length cannot be decoded.
    #[error("Shared path of {0} bits is too long")]
    SharedPathTooLong(u64),

    /// The packed shared path is shorter than its declared length.
    #[error(transparent)]
    SharedPath(#[from] BitPathError),

    /// An embedded child did not consume exactly its declared length, or the
    /// message has trailing bytes after the last field.
    #[error("Embedded node of {declared} bytes has an inconsistent layout")]
    EmbeddedLengthMismatch {
        /// Length announced by the parent.
        declared: usize,
    },
}

/// Result alias for node decoding.
pub type NodeDecodeResult<T> = Result<T, NodeDecodeError>;

/// A source of long values, keyed by their keccak256 hash.
pub trait ValueStore {
    /// Returns the value whose hash is `hash`, if known.
    fn retrieve_value(&self, hash: &H256) -> Option<Vec<u8>>;
}

impl ValueStore for HashMap<H256, Vec<u8>> {
    fn retrieve_value(&self, hash: &H256) -> Option<Vec<u8>> {
        self.get(hash).cloned()
    }
}

impl TrieNode {
    /// Parses a node message in either layout.
    ///
    /// Long values are looked up in `store`; when they cannot be found the
    /// node keeps only their hash and length.
    pub fn from_message(msg: &[u8], store: Option<&dyn ValueStore>) -> NodeDecodeResult<Self> {
        match msg.first() {
            None => Err(NodeDecodeError::EmptyMessage),
            Some(&ORCHID_ARITY) => Self::from_message_orchid(msg, store),
            Some(_) => Self::from_message_rskip107(msg, store),
        }
    }

    /// Parses an RSKIP-107 message.
    pub fn from_message_rskip107(
        msg: &[u8],
        store: Option<&dyn ValueStore>,
    ) -> NodeDecodeResult<Self> {
        let mut cur = Cursor::new(msg);
        let flags = cur.take(1)?[0];

        let left_present = flags & FLAG_LEFT_PRESENT != 0;
        let right_present = flags & FLAG_RIGHT_PRESENT != 0;
        // Embedded bits are ignored for absent children.
        let left_embedded = left_present && flags & FLAG_LEFT_EMBEDDED != 0;
        let right_embedded = right_present && flags & FLAG_RIGHT_EMBEDDED != 0;

        let shared_path = match flags & FLAG_SHARED_PREFIX != 0 {
            true => decode_shared_path(&mut cur)?,
            false => BitPath::empty(),
        };

        let left = decode_child(&mut cur, left_present, left_embedded, store)?;
        let right = decode_child(&mut cur, right_present, right_embedded, store)?;

        let children_size = match left_present || right_present {
            true => {
                let v = read_var_int(cur.buf, cur.offset)?;
                cur.offset += v.size;
                Some(v.value)
            }
            false => None,
        };

        let (value, value_length, value_hash) = match flags & FLAG_LONG_VALUE != 0 {
            true => {
                let hash = H256::from_slice(cur.take(HASH_SIZE)?);
                let len = decode_uint24(cur.buf, cur.offset)?;
                cur.offset += UINT24_SIZE;

                if !cur.rest().is_empty() {
                    return Err(NodeDecodeError::EmbeddedLengthMismatch {
                        declared: msg.len(),
                    });
                }

                (store.and_then(|s| s.retrieve_value(&hash)), len, Some(hash))
            }
            false => inline_value(cur.rest()),
        };

        trace!(
            "Decoded RSKIP-107 node (flags: {:#04x}, shared path: {} bits, value: {} bytes)",
            flags,
            shared_path.len(),
            value_length
        );

        Ok(Self {
            shared_path,
            left,
            right,
            value,
            value_length,
            value_hash,
            children_size,
        })
    }

    /// Parses a legacy Orchid message.
    pub fn from_message_orchid(
        msg: &[u8],
        store: Option<&dyn ValueStore>,
    ) -> NodeDecodeResult<Self> {
        let mut cur = Cursor::new(msg);

        let arity = cur.take(1)?[0];
        if arity != ORCHID_ARITY {
            return Err(NodeDecodeError::InvalidArity(arity));
        }

        let flags = cur.take(1)?[0];
        if flags & !(ORCHID_FLAG_SECURE | ORCHID_FLAG_LONG_VALUE) != 0 {
            return Err(NodeDecodeError::InvalidFlags {
                flags: flags as u16,
            });
        }

        let present = cur.take_u16()?;
        if present & !(ORCHID_LEFT_PRESENT | ORCHID_RIGHT_PRESENT) != 0 {
            return Err(NodeDecodeError::InvalidFlags { flags: present });
        }

        let path_len = cur.take_u16()? as usize;
        let shared_path = match path_len {
            0 => BitPath::empty(),
            _ => BitPath::from_encoded(cur.take(BitPath::encoded_len_for(path_len))?, path_len)?,
        };

        let mut child = |bit: u16| -> NodeDecodeResult<NodeReference> {
            match present & bit != 0 {
                true => Ok(NodeReference::Hash(H256::from_slice(cur.take(HASH_SIZE)?))),
                false => Ok(NodeReference::Empty),
            }
        };
        let left = child(ORCHID_LEFT_PRESENT)?;
        let right = child(ORCHID_RIGHT_PRESENT)?;

        let (value, value_length, value_hash) = match flags & ORCHID_FLAG_LONG_VALUE != 0 {
            true => {
                let hash = H256::from_slice(cur.take(HASH_SIZE)?);
                let value = store.and_then(|s| s.retrieve_value(&hash));
                let len = value.as_ref().map_or(0, |v| v.len() as u32);

                (value, len, Some(hash))
            }
            false => inline_value(cur.rest()),
        };

        trace!(
            "Decoded Orchid node (children: {:#04b}, shared path: {} bits, value: {} bytes)",
            present,
            shared_path.len(),
            value_length
        );

        Ok(Self {
            shared_path,
            left,
            right,
            value,
            value_length,
            value_hash,
            children_size: None,
        })
    }
}

/// A read position over a message.
struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, n: usize) -> NodeDecodeResult<&'a [u8]> {
        let bytes = field(self.buf, self.offset, n)?;
        self.offset += n;

        Ok(bytes)
    }

    fn take_u16(&mut self) -> NodeDecodeResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn rest(&self) -> &'a [u8] {
        self.buf.get(self.offset..).unwrap_or_default()
    }
}

fn decode_shared_path(cur: &mut Cursor) -> NodeDecodeResult<BitPath> {
    let b = cur.take(1)?[0];

    let len = match b {
        b if (b as usize) < SHARED_PATH_LOW_MAX => b as usize + 1,
        SHARED_PATH_VARINT_MARKER => {
            let v = read_var_int(cur.buf, cur.offset)?;
            cur.offset += v.size;

            if v.value > MAX_SHARED_PATH_BITS {
                return Err(NodeDecodeError::SharedPathTooLong(v.value));
            }
            v.value as usize
        }
        _ => b as usize + SHARED_PATH_HIGH_OFFSET,
    };

    let packed = cur.take(BitPath::encoded_len_for(len))?;
    Ok(BitPath::from_encoded(packed, len)?)
}

fn decode_child(
    cur: &mut Cursor,
    present: bool,
    embedded: bool,
    store: Option<&dyn ValueStore>,
) -> NodeDecodeResult<NodeReference> {
    match (present, embedded) {
        (false, _) => Ok(NodeReference::Empty),
        (true, false) => Ok(NodeReference::Hash(H256::from_slice(cur.take(HASH_SIZE)?))),
        (true, true) => {
            let declared = cur.take(1)?[0] as usize;
            let child_msg = cur.take(declared)?;

            // Embedded nodes are always RSKIP-107, even if their flags byte
            // happens to be `2`.
            let node = TrieNode::from_message_rskip107(child_msg, store).map_err(|e| match e {
                NodeDecodeError::Truncated(_) | NodeDecodeError::EmptyMessage => {
                    NodeDecodeError::EmbeddedLengthMismatch { declared }
                }
                e => e,
            })?;

            Ok(node.into())
        }
    }
}

fn inline_value(rest: &[u8]) -> (Option<Vec<u8>>, u32, Option<H256>) {
    match rest.is_empty() {
        true => (None, 0, None),
        false => (Some(rest.to_vec()), rest.len() as u32, None),
    }
}
