//! The RSK block header and the computation of its hash.
//!
//! The hash preimage is an RLP list whose shape depends on the RSKIPs active
//! for the block (see [`BlockHeaderConfig`]):
//!
//! ```text
//! parentHash, unclesHash, coinbase, stateRoot, txTrieRoot, receiptTrieRoot,
//! logsBloom | extensionData, difficulty, number, gasLimit, gasUsed,
//! timestamp, extraData, paidFees, minimumGasPrice, uncleCount,
//! [ummRoot], [mmHeader, [mmMerkleProof, mmCoinbaseTransaction]]
//! ```

use ethereum_types::{Bloom, H160, H256, U256};
use keccak_hash::keccak;
use log::debug;
use rlp::RlpStream;
use rsk_common::EMPTY_UNCLES_HASH;

use crate::config::BlockHeaderConfig;

/// Minimum width of the gas limit field.
pub const GAS_LIMIT_SIZE: usize = 4;

/// Version byte of the header extension introduced by RSKIP-351.
pub const HEADER_EXTENSION_VERSION: u8 = 1;

/// The hashed fields of an RSK block header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Hash of the parent block.
    pub parent_hash: H256,
    /// Hash of the uncle list.
    pub uncles_hash: H256,
    /// The miner's reward address.
    pub coinbase: H160,
    /// Root of the unified state trie.
    pub state_root: H256,
    /// Root of the transaction trie.
    pub transactions_root: H256,
    /// Root of the receipt trie.
    pub receipts_root: H256,
    /// Bloom filter over the block's logs.
    pub logs_bloom: Bloom,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block height.
    pub number: u64,
    /// Gas limit.
    pub gas_limit: U256,
    /// Gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Arbitrary miner data.
    pub extra_data: Vec<u8>,
    /// Fees paid by the block's transactions.
    pub paid_fees: U256,
    /// Minimum gas price accepted in the block.
    pub minimum_gas_price: U256,
    /// Number of uncles.
    pub uncle_count: u64,
    /// Root of the unified merged-mining data. Hashed whenever RSKIP-UMM is
    /// active, as an empty string if absent.
    pub umm_root: Option<Vec<u8>>,
    /// Parallel execution sublist boundaries. `None` and `Some(vec![])` hash
    /// differently.
    pub tx_execution_sublists_edges: Option<Vec<u16>>,
    /// The Bitcoin block header that merge-mined this block.
    pub bitcoin_merged_mining_header: Vec<u8>,
    /// Merkle proof of the merged-mining coinbase.
    pub bitcoin_merged_mining_merkle_proof: Vec<u8>,
    /// The Bitcoin coinbase transaction committing to this block.
    pub bitcoin_merged_mining_coinbase_transaction: Vec<u8>,
}

impl Default for BlockHeader {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            uncles_hash: EMPTY_UNCLES_HASH,
            coinbase: H160::zero(),
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::zero(),
            number: 0,
            gas_limit: U256::zero(),
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            paid_fees: U256::zero(),
            minimum_gas_price: U256::zero(),
            uncle_count: 0,
            umm_root: None,
            tx_execution_sublists_edges: None,
            bitcoin_merged_mining_header: Vec::new(),
            bitcoin_merged_mining_merkle_proof: Vec::new(),
            bitcoin_merged_mining_coinbase_transaction: Vec::new(),
        }
    }
}

impl BlockHeader {
    fn has_merged_mining_fields(&self) -> bool {
        !(self.bitcoin_merged_mining_header.is_empty()
            && self.bitcoin_merged_mining_merkle_proof.is_empty()
            && self.bitcoin_merged_mining_coinbase_transaction.is_empty())
    }

    /// The RLP preimage of the block hash under `config`.
    pub fn encode_for_hash(&self, config: &BlockHeaderConfig) -> Vec<u8> {
        let with_umm = config.rskip_umm;
        let mm_fields = match (self.has_merged_mining_fields(), config.rskip92) {
            (false, _) => 0,
            (true, true) => 1,
            (true, false) => 3,
        };

        let mut s = RlpStream::new_list(16 + usize::from(with_umm) + mm_fields);
        s.append(&self.parent_hash)
            .append(&self.uncles_hash)
            .append(&self.coinbase)
            .append(&self.state_root)
            .append(&self.transactions_root)
            .append(&self.receipts_root);

        match config.rskip351 {
            true => {
                let ext = extension_hash(
                    &self.logs_bloom,
                    self.tx_execution_sublists_edges.as_deref(),
                );
                s.append(&extension_data(ext));
            }
            false => {
                s.append(&self.logs_bloom);
            }
        }

        s.append(&self.difficulty)
            .append(&self.number)
            .append(&encode_gas_limit(self.gas_limit))
            .append(&self.gas_used)
            .append(&self.timestamp)
            .append(&self.extra_data)
            .append(&self.paid_fees);
        append_minimum_gas_price(&mut s, self.minimum_gas_price);
        s.append(&self.uncle_count);

        if with_umm {
            match &self.umm_root {
                Some(root) => s.append(root),
                None => s.append_empty_data(),
            };
        }

        if mm_fields > 0 {
            s.append(&self.bitcoin_merged_mining_header);
        }
        if mm_fields > 1 {
            s.append(&self.bitcoin_merged_mining_merkle_proof)
                .append(&self.bitcoin_merged_mining_coinbase_transaction);
        }

        s.out().to_vec()
    }

    /// Computes the block hash under `config`.
    pub fn hash(&self, config: &BlockHeaderConfig) -> H256 {
        keccak(self.encode_for_hash(config))
    }
}

/// Computes the hash of `header` under the rules selected by `config`.
pub fn compute_block_hash(header: &BlockHeader, config: &BlockHeaderConfig) -> H256 {
    let hash = header.hash(config);
    debug!("Computed hash {:x} for block {}", hash, header.number);

    hash
}

/// The RSKIP-351 header extension hash:
/// `keccak(RLP([keccak(logsBloom), [edges...]]))`, the edge list being left
/// out entirely when `edges` is `None`.
pub fn extension_hash(logs_bloom: &Bloom, edges: Option<&[u16]>) -> H256 {
    let bloom_hash = keccak(logs_bloom);
    let mut s = RlpStream::new_list(1 + usize::from(edges.is_some()));
    s.append(&bloom_hash);

    if let Some(edges) = edges {
        s.begin_list(edges.len());
        for edge in edges {
            s.append(edge);
        }
    }

    keccak(s.out())
}

/// The bytes hashed in place of the logs bloom once RSKIP-351 is active:
/// `RLP([version, extensionHash])`.
fn extension_data(extension_hash: H256) -> Vec<u8> {
    let mut s = RlpStream::new_list(2);
    s.append(&HEADER_EXTENSION_VERSION).append(&extension_hash);
    s.out().to_vec()
}

/// Big-endian bytes of `gas_limit`, zero padded to at least
/// [`GAS_LIMIT_SIZE`] bytes.
pub fn encode_gas_limit(gas_limit: U256) -> Vec<u8> {
    let minimal = minimal_be_bytes(gas_limit);
    let pad = GAS_LIMIT_SIZE.saturating_sub(minimal.len());

    let mut out = vec![0; pad];
    out.extend_from_slice(&minimal);
    out
}

/// Appends the minimum gas price the way RSK encodes coin amounts: zero as
/// the single raw byte `0x00`, anything else as its positive two's
/// complement big-endian bytes.
pub fn append_minimum_gas_price(s: &mut RlpStream, price: U256) {
    if price.is_zero() {
        s.append_raw(&[0x00], 1);
        return;
    }

    let mut bytes = minimal_be_bytes(price);
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        bytes.insert(0, 0x00);
    }
    s.append(&bytes);
}

pub(crate) fn minimal_be_bytes(v: U256) -> Vec<u8> {
    let mut buf = [0; 32];
    v.to_big_endian(&mut buf);
    let skip = (v.leading_zeros() / 8) as usize;

    buf[skip..].to_vec()
}
