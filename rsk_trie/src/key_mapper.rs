//! Derivation of the keys under which accounts, contract code and storage
//! slots live in the unified trie.
//!
//! Every key starts with a domain prefix followed by a "secure" prefix: the
//! first ten bytes of the keccak256 hash of the raw key material. This keeps
//! the top of the trie balanced no matter how the raw keys are chosen.

use std::fmt::{self, Display};

use ethereum_types::{H160, H256};
use keccak_hash::keccak;

use crate::bit_path::BitPath;

/// Prefix of every account key.
pub const DOMAIN_PREFIX: [u8; 1] = [0x00];
/// Appended to an account key to form the storage root key.
pub const STORAGE_PREFIX: [u8; 1] = [0x00];
/// Appended to an account key to form the code key.
pub const CODE_PREFIX: [u8; 1] = [0x80];
/// Length of the hash prefix placed before raw key material.
pub const SECURE_KEY_SIZE: usize = 10;

/// A key in the unified trie.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TrieKey(pub Vec<u8>);

impl Display for TrieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for TrieKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for TrieKey {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for TrieKey {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl TrieKey {
    /// The key as the bits the trie walks over.
    pub fn to_bit_path(&self) -> BitPath {
        BitPath::from_bytes(&self.0)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn concat(&self, parts: &[&[u8]]) -> Self {
        let mut out = self.0.clone();
        for p in parts {
            out.extend_from_slice(p);
        }

        Self(out)
    }
}

/// How a storage slot whose bytes are all zero becomes a key suffix.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum StorageKeyEncoding {
    /// Strip every leading zero, leaving an empty suffix for slot zero.
    #[default]
    StripAll,

    /// Strip leading zeros but keep a single `0x00` for slot zero, the way
    /// `DataWord::getByteArrayForStorage` does in rskj.
    KeepSingleZero,
}

/// Builds trie keys for accounts, code and storage.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TrieKeyMapper {
    /// The encoding used for storage slot suffixes.
    pub storage_encoding: StorageKeyEncoding,
}

impl TrieKeyMapper {
    /// Creates a mapper with the given storage slot encoding.
    pub const fn new(storage_encoding: StorageKeyEncoding) -> Self {
        Self { storage_encoding }
    }

    /// `DOMAIN_PREFIX || keccak(address)[..10] || address`
    pub fn account_key(&self, address: &H160) -> TrieKey {
        let raw = address.as_bytes();
        TrieKey(DOMAIN_PREFIX.to_vec()).concat(&[&secure_key_prefix(raw), raw])
    }

    /// The account key followed by [`CODE_PREFIX`].
    pub fn code_key(&self, address: &H160) -> TrieKey {
        self.account_key(address).concat(&[&CODE_PREFIX])
    }

    /// The account key followed by [`STORAGE_PREFIX`].
    pub fn account_storage_prefix_key(&self, address: &H160) -> TrieKey {
        self.account_key(address).concat(&[&STORAGE_PREFIX])
    }

    /// The storage prefix key, then `keccak(slot)[..10]`, then the slot with
    /// its leading zeros stripped.
    pub fn account_storage_key(&self, address: &H160, slot: &H256) -> TrieKey {
        let stripped = strip_leading_zeros(slot.as_bytes());
        let suffix: &[u8] = match (stripped.is_empty(), self.storage_encoding) {
            (true, StorageKeyEncoding::KeepSingleZero) => &[0x00],
            _ => stripped,
        };

        self.account_storage_prefix_key(address)
            .concat(&[&secure_key_prefix(slot.as_bytes()), suffix])
    }
}

/// The first [`SECURE_KEY_SIZE`] bytes of `keccak(data)`.
pub fn secure_key_prefix(data: &[u8]) -> [u8; SECURE_KEY_SIZE] {
    let mut out = [0; SECURE_KEY_SIZE];
    out.copy_from_slice(&keccak(data).as_bytes()[..SECURE_KEY_SIZE]);

    out
}

/// Returns `data` without its leading zero bytes. All-zero input yields an
/// empty slice.
pub fn strip_leading_zeros(data: &[u8]) -> &[u8] {
    let first = data.iter().position(|b| *b != 0).unwrap_or(data.len());
    &data[first..]
}
