//! Types deserialized from RSK JSON-RPC responses and their conversion into
//! the block, transaction and receipt models.

use std::fmt::Display;

use bytes::Bytes;
use ethereum_types::{Bloom, H160, H256, U256, U64};
use log::{debug, warn};
use rsk_trie::builder::BuildError;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{
    header::BlockHeader,
    receipt::{Log, Receipt, ReceiptRlp},
    transaction::{AccessListItem, Transaction, TxType},
};

/// Errors encountered while converting RPC input.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum InputError {
    /// A JSON document did not have the expected shape.
    #[error("Invalid RPC response at {path}: {reason}")]
    Json {
        /// Where in the document parsing failed.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// A hex string could not be decoded.
    #[error("Invalid hex string {value:?}: {reason}")]
    InvalidHex {
        /// The offending input.
        value: String,
        /// What went wrong.
        reason: String,
    },

    /// A field required by the transaction type is missing.
    #[error("Transaction {hash:x} is missing {field}")]
    MissingField {
        /// The transaction.
        hash: H256,
        /// The missing field.
        field: &'static str,
    },

    /// The transaction envelope is not supported.
    #[error("Unsupported transaction type {0}")]
    UnsupportedTxType(u64),

    /// The receipt status is neither success nor failure.
    #[error("Invalid receipt status {0:?}")]
    InvalidStatus(String),

    /// The number of receipts differs from the number of transactions.
    #[error("Expected {expected} receipts, got {got}")]
    ReceiptCount {
        /// Transactions in the block.
        expected: usize,
        /// Receipts supplied.
        got: usize,
    },

    /// The block was fetched with transaction hashes only.
    #[error("Block {0} does not include full transaction objects")]
    MissingTransactions(u64),

    /// A trie root could not be computed.
    #[error(transparent)]
    Trie(#[from] BuildError),
}

/// Result alias for RPC input conversions.
pub type InputResult<T> = Result<T, InputError>;

impl<E: Display> From<serde_path_to_error::Error<E>> for InputError {
    fn from(e: serde_path_to_error::Error<E>) -> Self {
        Self::Json {
            path: e.path().to_string(),
            reason: e.inner().to_string(),
        }
    }
}

/// Parses an RPC result from JSON text.
pub fn from_json<T: DeserializeOwned>(json: &str) -> InputResult<T> {
    let de = &mut serde_json::Deserializer::from_str(json);
    Ok(serde_path_to_error::deserialize(de)?)
}

/// Parses an RPC result from an already decoded JSON value.
pub fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> InputResult<T> {
    Ok(serde_path_to_error::deserialize(value)?)
}

/// The transactions of an [`RpcBlock`], depending on whether full objects
/// were requested.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RpcBlockTransactions {
    /// Full transaction objects.
    Full(Vec<RpcTransaction>),
    /// Transaction hashes.
    Hashes(Vec<H256>),
}

impl Default for RpcBlockTransactions {
    fn default() -> Self {
        Self::Full(Vec::new())
    }
}

impl RpcBlockTransactions {
    /// The number of transactions.
    pub fn len(&self) -> usize {
        match self {
            Self::Full(txs) => txs.len(),
            Self::Hashes(hashes) => hashes.len(),
        }
    }

    /// Returns `true` if the block has no transactions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The transaction hashes.
    pub fn hashes(&self) -> Vec<H256> {
        match self {
            Self::Full(txs) => txs.iter().map(|tx| tx.hash).collect(),
            Self::Hashes(hashes) => hashes.clone(),
        }
    }
}

/// An RSK `eth_getBlockByNumber` / `eth_getBlockByHash` result. Fields
/// mirror the JSON names.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RpcBlock {
    pub number: U64,
    pub hash: H256,
    pub parent_hash: H256,
    #[serde(rename = "sha3Uncles")]
    pub uncles_hash: H256,
    pub miner: H160,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub gas_limit: U256,
    pub gas_used: U64,
    pub timestamp: U64,
    #[serde(with = "crate::hex")]
    pub extra_data: Vec<u8>,
    #[serde(default)]
    pub paid_fees: U256,
    #[serde(default)]
    pub minimum_gas_price: U256,
    #[serde(default)]
    pub uncles: Vec<H256>,
    #[serde(default, with = "crate::hex")]
    pub umm_root: Vec<u8>,
    #[serde(default)]
    pub rsk_pte_edges: Option<Vec<u16>>,
    #[serde(default, with = "crate::hex")]
    pub bitcoin_merged_mining_header: Vec<u8>,
    #[serde(default, with = "crate::hex")]
    pub bitcoin_merged_mining_merkle_proof: Vec<u8>,
    #[serde(default, with = "crate::hex")]
    pub bitcoin_merged_mining_coinbase_transaction: Vec<u8>,
    #[serde(default)]
    pub transactions: RpcBlockTransactions,
}

impl RpcBlock {
    /// The full transactions of the block, decoded.
    pub fn to_transactions(&self) -> InputResult<Vec<Transaction>> {
        match &self.transactions {
            RpcBlockTransactions::Full(txs) => txs.iter().map(|tx| tx.to_transaction()).collect(),
            RpcBlockTransactions::Hashes(hashes) if hashes.is_empty() => Ok(Vec::new()),
            RpcBlockTransactions::Hashes(_) => {
                Err(InputError::MissingTransactions(self.number.as_u64()))
            }
        }
    }
}

/// Converts an RPC block into the header model used for hashing.
pub fn input_to_block_header(block: &RpcBlock) -> BlockHeader {
    BlockHeader {
        parent_hash: block.parent_hash,
        uncles_hash: block.uncles_hash,
        coinbase: block.miner,
        state_root: block.state_root,
        transactions_root: block.transactions_root,
        receipts_root: block.receipts_root,
        logs_bloom: block.logs_bloom,
        difficulty: block.difficulty,
        number: block.number.as_u64(),
        gas_limit: block.gas_limit,
        gas_used: block.gas_used.as_u64(),
        timestamp: block.timestamp.as_u64(),
        extra_data: block.extra_data.clone(),
        paid_fees: block.paid_fees,
        minimum_gas_price: block.minimum_gas_price,
        uncle_count: block.uncles.len() as u64,
        umm_root: (!block.umm_root.is_empty()).then(|| block.umm_root.clone()),
        tx_execution_sublists_edges: block.rsk_pte_edges.clone(),
        bitcoin_merged_mining_header: block.bitcoin_merged_mining_header.clone(),
        bitcoin_merged_mining_merkle_proof: block.bitcoin_merged_mining_merkle_proof.clone(),
        bitcoin_merged_mining_coinbase_transaction: block
            .bitcoin_merged_mining_coinbase_transaction
            .clone(),
    }
}

/// A transaction object as returned inside blocks and by
/// `eth_getTransactionByHash`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RpcTransaction {
    pub hash: H256,
    pub nonce: U256,
    #[serde(default)]
    pub transaction_index: Option<U64>,
    #[serde(default)]
    pub from: Option<H160>,
    #[serde(default)]
    pub to: Option<H160>,
    pub gas: U256,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<U256>,
    pub value: U256,
    #[serde(with = "crate::hex")]
    pub input: Vec<u8>,
    pub v: U256,
    pub r: U256,
    pub s: U256,
    #[serde(default, rename = "type")]
    pub tx_type: Option<U64>,
    #[serde(default)]
    pub chain_id: Option<U64>,
    #[serde(default)]
    pub access_list: Vec<AccessListItem>,
}

impl RpcTransaction {
    fn required<T: Copy>(&self, v: Option<T>, field: &'static str) -> InputResult<T> {
        v.ok_or(InputError::MissingField {
            hash: self.hash,
            field,
        })
    }

    /// Decodes the transaction, choosing the encoding of zero-valued fields
    /// whose hash matches the reported one.
    pub fn to_transaction(&self) -> InputResult<Transaction> {
        let raw_type = self.tx_type.map_or(0, |t| t.as_u64());
        let tx_type = TxType::try_from(raw_type).map_err(InputError::UnsupportedTxType)?;

        let mut tx = Transaction {
            tx_type,
            chain_id: 0,
            nonce: self.nonce,
            gas_price: U256::zero(),
            max_priority_fee_per_gas: U256::zero(),
            max_fee_per_gas: U256::zero(),
            gas: self.gas,
            to: self.to,
            value: self.value,
            data: self.input.clone(),
            access_list: self.access_list.clone(),
            v: self.v,
            r: self.r,
            s: self.s,
            raw_zeros: Default::default(),
        };

        if tx_type != TxType::Legacy {
            tx.chain_id = self.required(self.chain_id, "chainId")?.as_u64();
        }
        match tx_type {
            TxType::Legacy | TxType::AccessList => {
                tx.gas_price = self.required(self.gas_price, "gasPrice")?;
            }
            TxType::DynamicFee => {
                tx.max_priority_fee_per_gas =
                    self.required(self.max_priority_fee_per_gas, "maxPriorityFeePerGas")?;
                tx.max_fee_per_gas = self.required(self.max_fee_per_gas, "maxFeePerGas")?;
            }
        }

        let candidates = tx.raw_zero_candidates();
        let matching = candidates.iter().copied().find(|c| {
            let candidate = Transaction {
                raw_zeros: *c,
                ..tx.clone()
            };
            candidate.hash() == self.hash
        });

        match matching {
            Some(raw_zeros) => {
                if raw_zeros != Default::default() {
                    debug!("Transaction {:x} signs zero fields as {:?}", self.hash, raw_zeros);
                }
                tx.raw_zeros = raw_zeros;
            }
            None => warn!(
                "Transaction {:x} matches none of {} candidate encodings, using the canonical one",
                self.hash,
                candidates.len()
            ),
        }

        Ok(tx)
    }
}

/// A log as returned inside receipts.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RpcLog {
    pub address: H160,
    pub topics: Vec<H256>,
    #[serde(with = "crate::hex")]
    pub data: Vec<u8>,
}

impl From<&RpcLog> for Log {
    fn from(log: &RpcLog) -> Self {
        Log {
            address: log.address,
            topics: log.topics.clone(),
            data: Bytes::from(log.data.clone()),
        }
    }
}

/// An `eth_getTransactionReceipt` result.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RpcReceipt {
    pub transaction_hash: H256,
    pub transaction_index: U64,
    pub cumulative_gas_used: U256,
    pub gas_used: U256,
    pub logs_bloom: Bloom,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
    /// Post-transaction state, absent on most nodes.
    #[serde(default, with = "crate::hex")]
    pub root: Vec<u8>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub tx_type: Option<U64>,
}

impl RpcReceipt {
    fn succeeded(&self) -> InputResult<bool> {
        let Some(status) = self.status.as_deref() else {
            return Ok(false);
        };
        let digits = status.strip_prefix("0x").unwrap_or(status);

        match u64::from_str_radix(digits, 16) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            _ if digits.is_empty() => Ok(false),
            _ => Err(InputError::InvalidStatus(status.to_string())),
        }
    }

    /// Decodes the receipt. A receipt without a `type` is taken to belong to
    /// a legacy transaction.
    pub fn to_receipt(&self) -> InputResult<Receipt> {
        let raw_type = self.tx_type.map_or(0, |t| t.as_u64());
        let tx_type = TxType::try_from(raw_type).map_err(InputError::UnsupportedTxType)?;

        Ok(Receipt {
            tx_type,
            body: ReceiptRlp {
                post_tx_state: Bytes::from(self.root.clone()),
                cumulative_gas: self.cumulative_gas_used,
                logs_bloom: self.logs_bloom,
                logs: self.logs.iter().map(Log::from).collect(),
                gas_used: self.gas_used,
                status: self.succeeded()?,
            },
        })
    }
}

/// One storage entry of an `eth_getProof` result.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcStorageProof {
    /// The slot, possibly in short hex form such as `0x0`.
    #[serde(deserialize_with = "short_hash")]
    pub key: H256,
    /// The reported value, with leading zero bytes stripped.
    #[serde(default, deserialize_with = "quantity_bytes", serialize_with = "crate::hex::serialize")]
    pub value: Vec<u8>,
    /// RLP wrapped trie nodes, hex encoded.
    #[serde(alias = "proof")]
    pub proofs: Vec<String>,
}

/// An `eth_getProof` result.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RpcProofResponse {
    #[serde(default)]
    pub address: Option<H160>,
    #[serde(default)]
    pub balance: U256,
    #[serde(default)]
    pub nonce: U256,
    #[serde(default)]
    pub code_hash: Option<H256>,
    #[serde(default)]
    pub storage_hash: Option<H256>,
    /// RLP wrapped trie nodes, hex encoded.
    pub account_proof: Vec<String>,
    #[serde(default)]
    pub storage_proof: Vec<RpcStorageProof>,
}

fn decode_hex(s: &str) -> InputResult<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| InputError::InvalidHex {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes hex encoded proof nodes, with or without a `0x` prefix. The
/// returned blobs still carry their RLP wrapping.
pub fn decode_rlp_proof_nodes<S: AsRef<str>>(hex_nodes: &[S]) -> InputResult<Vec<Vec<u8>>> {
    hex_nodes.iter().map(|n| decode_hex(n.as_ref())).collect()
}

/// Big-endian bytes of a hex quantity of any length, leading zero bytes
/// removed.
fn parse_quantity(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let padded = match digits.len() % 2 {
        0 => digits.to_string(),
        _ => format!("0{}", digits),
    };

    let bytes = hex::decode(padded)?;
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    Ok(bytes[start..].to_vec())
}

fn quantity_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    use serde::de::Error as _;

    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    parse_quantity(&s).map_err(D::Error::custom)
}

fn short_hash<'de, D: Deserializer<'de>>(deserializer: D) -> Result<H256, D::Error> {
    use serde::de::Error as _;

    let s = String::deserialize(deserializer)?;
    let bytes = parse_quantity(&s).map_err(D::Error::custom)?;
    if bytes.len() > 32 {
        return Err(D::Error::custom(format!("{} is longer than 32 bytes", s)));
    }

    let mut key = H256::zero();
    key.0[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(key)
}
