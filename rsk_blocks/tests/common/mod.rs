//! Fixtures shared by the integration tests.
//!
//! The JSON files under `tests/data` are synthetic RSK JSON-RPC responses,
//! not data fetched from a network. Their digests were computed with a
//! separate implementation of the RSK hashing rules, so the tests using them
//! check self-consistency rather than agreement with a live chain.

#![allow(dead_code)]

use std::{fs, path::PathBuf};

use anyhow::Context as _;
use ethereum_types::{H160, H256};
use rsk_blocks::rpc::{from_json, RpcBlock, RpcProofResponse, RpcReceipt};
use serde::{de::DeserializeOwned, Deserialize};

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn load<T: DeserializeOwned>(name: &str) -> anyhow::Result<T> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "data", name]
        .iter()
        .collect();
    let json = fs::read_to_string(&path).context(format!("Unable to read {}", path.display()))?;

    from_json(&json).context(format!("Failed to parse {}", name))
}

pub fn block(name: &str) -> RpcBlock {
    load(name).unwrap()
}

pub fn receipts(name: &str) -> Vec<RpcReceipt> {
    load(name).unwrap()
}

/// An `eth_getProof` response and the query that produced it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofCase {
    pub state_root: H256,
    pub address: H160,
    pub response: RpcProofResponse,
}

pub fn proof_case(name: &str) -> ProofCase {
    load(name).unwrap()
}
