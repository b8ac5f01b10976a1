//! Utilities and types for reading and verifying Rootstock's unified binary
//! trie.
//!
//! Rootstock keeps accounts, contract code and contract storage in a single
//! binary Merkle trie. Nodes compress runs of shared key bits into a shared
//! path, hold at most two children, and may carry a value. Small children
//! are embedded in their parent's serialized message, large values are kept
//! outside the node and referenced by hash.
//!
//! The core of this library is the [`TrieNode`][node::TrieNode] type, with its
//! two historical serializations (Orchid and RSKIP-107), and the proof
//! verifier in [`proof`], which replays a key lookup over the nodes returned
//! by `eth_getProof`. The [`TrieBuilder`][builder::TrieBuilder] builds small
//! in-memory tries, which is how transaction and receipt roots are computed.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod bit_path;
pub mod builder;
pub mod key_mapper;
pub mod node;
pub mod node_decoding;
pub mod proof;
pub mod trie_hashing;
pub mod utils;
pub mod varint;

#[cfg(test)]
pub(crate) mod testing_utils;
