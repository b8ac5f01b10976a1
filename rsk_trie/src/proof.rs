//! Verification of inclusion and exclusion proofs against a state root.
//!
//! A proof is the list of node messages met on the way from the root to a
//! key, each wrapped in an RLP byte string (the `eth_getProof` shape). The
//! nodes are indexed by the keccak256 of their unwrapped message, so their
//! order in the list does not matter. The key is then walked bit by bit from
//! the root, resolving hash references through the index.

use std::collections::HashMap;

use ethereum_types::{H160, H256};
use keccak_hash::keccak;
use log::{debug, trace};
use rlp::Rlp;
use thiserror::Error;

use crate::{
    key_mapper::{TrieKey, TrieKeyMapper},
    node::{NodeReference, TrieNode},
    node_decoding::{NodeDecodeError, ValueStore},
    utils::TrieNodeType,
};

/// Errors that make a proof unusable. A proof showing that a key is absent
/// is not an error.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum ProofError {
    /// No proof nodes were supplied.
    #[error("Proof contains no nodes")]
    EmptyProof,

    /// None of the supplied nodes hashes to the claimed root.
    #[error("No proof node hashes to the root {0:x}")]
    RootNotFound(H256),

    /// A node references a child that is not part of the proof.
    #[error("Proof is missing the node with hash {0:x}")]
    MissingProofNode(H256),

    /// The key ends in the middle of a node's shared path.
    #[error("Key has {key_bits_left} bits left but the node's shared path is {shared_path_len} bits long")]
    MalformedProof {
        /// Bits of the key not consumed yet.
        key_bits_left: usize,
        /// Length of the shared path that had to be matched.
        shared_path_len: usize,
    },

    /// A proof entry is not a single RLP byte string.
    #[error("Proof node is not wrapped in an RLP byte string: {0}")]
    InvalidNodeWrapping(String),

    /// A proof node could not be parsed.
    #[error(transparent)]
    MalformedNode(#[from] NodeDecodeError),
}

/// Result alias for proof verification.
pub type ProofResult<T> = Result<T, ProofError>;

/// What a proof says about a key.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ProofLookup {
    /// The key holds this value.
    Found(Vec<u8>),

    /// The key holds a long value whose bytes are not part of the proof.
    FoundHashed {
        /// keccak256 of the value.
        value_hash: H256,
        /// Length of the value in bytes.
        value_length: u32,
    },

    /// The key is not in the trie.
    NotFound,
}

impl ProofLookup {
    /// The value bytes, if the proof carries them.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            ProofLookup::Found(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Checks the result against an expected value, where `None` expects the
    /// key to be absent.
    pub fn matches(&self, expected: Option<&[u8]>) -> bool {
        match (self, expected) {
            (ProofLookup::NotFound, None) => true,
            (ProofLookup::Found(v), Some(e)) => v == e,
            (
                ProofLookup::FoundHashed {
                    value_hash,
                    value_length,
                },
                Some(e),
            ) => e.len() == *value_length as usize && keccak(e) == *value_hash,
            _ => false,
        }
    }
}

/// Proof node messages indexed by their hash.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProofNodes {
    nodes: HashMap<H256, Vec<u8>>,
}

impl ValueStore for ProofNodes {
    fn retrieve_value(&self, hash: &H256) -> Option<Vec<u8>> {
        self.nodes.get(hash).cloned()
    }
}

impl ProofNodes {
    /// Indexes proof entries that are each wrapped in an RLP byte string.
    pub fn from_rlp_wrapped<I, B>(blobs: I) -> ProofResult<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let messages = blobs
            .into_iter()
            .map(|b| unwrap_node(b.as_ref()).map(<[u8]>::to_vec))
            .collect::<ProofResult<Vec<_>>>()?;

        Ok(Self::from_messages(messages))
    }

    /// Indexes node messages that are already unwrapped.
    pub fn from_messages<I: IntoIterator<Item = Vec<u8>>>(messages: I) -> Self {
        Self {
            nodes: messages.into_iter().map(|m| (keccak(&m), m)).collect(),
        }
    }

    /// The message whose hash is `hash`.
    pub fn get(&self, hash: &H256) -> Option<&[u8]> {
        self.nodes.get(hash).map(Vec::as_slice)
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no nodes were supplied.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn decode(&self, hash: &H256) -> ProofResult<Option<TrieNode>> {
        self.get(hash)
            .map(|msg| TrieNode::from_message(msg, Some(self)))
            .transpose()
            .map_err(ProofError::from)
    }

    /// Walks `key` from `root` through the indexed nodes.
    pub fn lookup(&self, root: H256, key: &TrieKey) -> ProofResult<ProofLookup> {
        if self.is_empty() {
            return Err(ProofError::EmptyProof);
        }

        let key_bits = key.to_bit_path();
        let mut node = self.decode(&root)?.ok_or(ProofError::RootNotFound(root))?;
        let mut cursor = 0;

        loop {
            let shared_len = node.shared_path.len();
            let key_bits_left = key_bits.len() - cursor;

            if shared_len > key_bits_left {
                return Err(ProofError::MalformedProof {
                    key_bits_left,
                    shared_path_len: shared_len,
                });
            }
            if !node.shared_path.is_prefix_of(&key_bits, cursor) {
                trace!("Key {} diverges from the shared path at bit {}", key, cursor);
                return Ok(ProofLookup::NotFound);
            }
            cursor += shared_len;

            let Ok(bit) = key_bits.get(cursor) else {
                return Ok(terminal_lookup(node));
            };
            cursor += 1;

            trace!(
                "Key bit {} is {}, following {} child",
                cursor - 1,
                u8::from(bit),
                TrieNodeType::from(node.child(bit))
            );

            node = match std::mem::take(match bit {
                false => &mut node.left,
                true => &mut node.right,
            }) {
                NodeReference::Empty => return Ok(ProofLookup::NotFound),
                NodeReference::Embedded(child) => *child,
                NodeReference::Hash(h) => {
                    self.decode(&h)?.ok_or(ProofError::MissingProofNode(h))?
                }
            };
        }
    }
}

fn terminal_lookup(node: TrieNode) -> ProofLookup {
    match (node.value, node.value_hash) {
        (Some(v), _) => ProofLookup::Found(v),
        (None, Some(value_hash)) => ProofLookup::FoundHashed {
            value_hash,
            value_length: node.value_length,
        },
        (None, None) => ProofLookup::NotFound,
    }
}

/// Strips the RLP byte string wrapping a proof entry.
pub fn unwrap_node(blob: &[u8]) -> ProofResult<&[u8]> {
    let rlp = Rlp::new(blob);
    let info = rlp
        .payload_info()
        .map_err(|e| ProofError::InvalidNodeWrapping(e.to_string()))?;

    if !rlp.is_data() || info.total() != blob.len() {
        return Err(ProofError::InvalidNodeWrapping(format!(
            "expected one byte string spanning all {} bytes",
            blob.len()
        )));
    }

    rlp.data()
        .map_err(|e| ProofError::InvalidNodeWrapping(e.to_string()))
}

/// Verifies `proof` for `key` against `root`.
pub fn verify_proof<B: AsRef<[u8]>>(
    root: H256,
    key: &TrieKey,
    proof: &[B],
) -> ProofResult<ProofLookup> {
    let nodes = ProofNodes::from_rlp_wrapped(proof)?;
    debug!("Indexed {} proof nodes for key {}", nodes.len(), key);

    nodes.lookup(root, key)
}

/// Verifies `proof` for `key` and compares the result with `expected`,
/// where `None` expects the key to be absent.
pub fn verify_proof_value<B: AsRef<[u8]>>(
    root: H256,
    key: &TrieKey,
    proof: &[B],
    expected: Option<&[u8]>,
) -> ProofResult<bool> {
    verify_proof(root, key, proof).map(|lookup| lookup.matches(expected))
}

/// The outcome of verifying an account proof.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountProofResult {
    /// Whether the proof is consistent with the root.
    pub valid: bool,
    /// The account the proof is about.
    pub address: H160,
    /// The encoded account state, absent if the account does not exist.
    pub value: Option<Vec<u8>>,
    /// Hash of a long value whose bytes were not in the proof.
    pub value_hash: Option<H256>,
    /// Why the proof is invalid.
    pub error: Option<ProofError>,
}

/// The outcome of verifying a storage proof.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageProofResult {
    /// Whether the proof is consistent with the root.
    pub valid: bool,
    /// The contract owning the slot.
    pub address: H160,
    /// The storage slot the proof is about.
    pub storage_key: H256,
    /// The stored value, absent if the slot is empty.
    pub value: Option<Vec<u8>>,
    /// Hash of a long value whose bytes were not in the proof.
    pub value_hash: Option<H256>,
    /// Why the proof is invalid.
    pub error: Option<ProofError>,
}

struct Outcome {
    valid: bool,
    value: Option<Vec<u8>>,
    value_hash: Option<H256>,
    error: Option<ProofError>,
}

impl From<ProofResult<ProofLookup>> for Outcome {
    fn from(r: ProofResult<ProofLookup>) -> Self {
        let (value, value_hash) = match &r {
            Ok(ProofLookup::Found(v)) => (Some(v.clone()), None),
            Ok(ProofLookup::FoundHashed { value_hash, .. }) => (None, Some(*value_hash)),
            Ok(ProofLookup::NotFound) | Err(_) => (None, None),
        };

        Self {
            valid: r.is_ok(),
            value,
            value_hash,
            error: r.err(),
        }
    }
}

/// Verifies account and storage proofs, deriving keys with a
/// [`TrieKeyMapper`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProofVerifier {
    mapper: TrieKeyMapper,
}

impl ProofVerifier {
    /// Creates a verifier that derives keys with `mapper`.
    pub const fn new(mapper: TrieKeyMapper) -> Self {
        Self { mapper }
    }

    /// The key mapper in use.
    pub fn mapper(&self) -> &TrieKeyMapper {
        &self.mapper
    }

    /// Verifies the proof of the account at `address`.
    pub fn verify_account_proof<B: AsRef<[u8]>>(
        &self,
        root: H256,
        address: H160,
        proof: &[B],
    ) -> AccountProofResult {
        let key = self.mapper.account_key(&address);
        let o = Outcome::from(verify_proof(root, &key, proof));

        AccountProofResult {
            valid: o.valid,
            address,
            value: o.value,
            value_hash: o.value_hash,
            error: o.error,
        }
    }

    /// Verifies the proof of one storage slot of `address`.
    pub fn verify_storage_proof<B: AsRef<[u8]>>(
        &self,
        root: H256,
        address: H160,
        storage_key: H256,
        proof: &[B],
    ) -> StorageProofResult {
        let key = self.mapper.account_storage_key(&address, &storage_key);
        let o = Outcome::from(verify_proof(root, &key, proof));

        StorageProofResult {
            valid: o.valid,
            address,
            storage_key,
            value: o.value,
            value_hash: o.value_hash,
            error: o.error,
        }
    }
}
