//! Verification of whole `eth_getProof` responses against a state root.

use ethereum_types::{H160, H256, U256};
use log::{debug, info};
use rlp::{DecoderError, Rlp};
use rsk_trie::proof::{AccountProofResult, ProofVerifier, StorageProofResult};

use crate::rpc::{decode_rlp_proof_nodes, InputResult, RpcProofResponse};

/// The value stored at an account key: `RLP([nonce, balance, stateFlags?])`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct AccountState {
    /// Account nonce.
    pub nonce: U256,
    /// Balance in wei.
    pub balance: U256,
    /// Optional flags byte, zero when not encoded.
    pub state_flags: u8,
}

fn decode_amount(rlp: &Rlp) -> Result<U256, DecoderError> {
    // Balances may carry a leading sign byte.
    let data = rlp.data()?;
    match data.len() > 32 {
        true => Err(DecoderError::RlpIsTooBig),
        false => Ok(U256::from_big_endian(data)),
    }
}

impl AccountState {
    /// Decodes an account leaf value.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
        let rlp = Rlp::new(bytes);
        let items = rlp.item_count()?;
        if !(2..=3).contains(&items) {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        let state_flags = match items {
            3 => rlp.at(2)?.data()?.first().copied().unwrap_or_default(),
            _ => 0,
        };

        Ok(Self {
            nonce: decode_amount(&rlp.at(0)?)?,
            balance: decode_amount(&rlp.at(1)?)?,
            state_flags,
        })
    }
}

/// The outcome of checking one storage entry of a response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageCheck {
    /// Proof verification result.
    pub proof: StorageProofResult,
    /// The value the node reported, leading zeros stripped.
    pub reported_value: Vec<u8>,
    /// Whether the proven value equals the reported one.
    pub value_matches: bool,
}

impl StorageCheck {
    /// Valid proof of the reported value.
    pub fn is_valid(&self) -> bool {
        self.proof.valid && self.value_matches
    }
}

/// The outcome of checking a whole `eth_getProof` response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProofResponseVerification {
    /// Proof verification result for the account key.
    pub account: AccountProofResult,
    /// The proven account, `None` if absent or undecodable.
    pub account_state: Option<AccountState>,
    /// Whether the proven nonce and balance equal the reported ones.
    pub account_matches: bool,
    /// One entry per storage proof, in response order.
    pub storage: Vec<StorageCheck>,
}

impl ProofResponseVerification {
    /// Every proof is valid and proves what the node reported.
    pub fn is_valid(&self) -> bool {
        self.account.valid
            && self.account_matches
            && self.storage.iter().all(StorageCheck::is_valid)
    }
}

fn strip_leading_zeros(v: &[u8]) -> &[u8] {
    let start = v.iter().position(|b| *b != 0).unwrap_or(v.len());
    &v[start..]
}

fn check_account(
    result: &AccountProofResult,
    response: &RpcProofResponse,
) -> (Option<AccountState>, bool) {
    if !result.valid {
        return (None, false);
    }

    match (&result.value, result.value_hash) {
        (Some(value), _) => match AccountState::decode(value) {
            Ok(state) => {
                let matches = state.nonce == response.nonce && state.balance == response.balance;
                (Some(state), matches)
            }
            Err(e) => {
                debug!("Undecodable account state for {:x}: {}", result.address, e);
                (None, false)
            }
        },
        // Account states are never long values.
        (None, Some(_)) => (None, false),
        (None, None) => (None, response.nonce.is_zero() && response.balance.is_zero()),
    }
}

fn check_storage(result: &StorageProofResult, reported: &[u8]) -> bool {
    match (&result.value, result.value_hash) {
        _ if !result.valid => false,
        (Some(value), _) => strip_leading_zeros(value) == reported,
        (None, Some(_)) => false,
        (None, None) => reported.is_empty(),
    }
}

/// Verifies the account proof and every storage proof of one `eth_getProof`
/// response for `address` against `state_root`, and compares the proven
/// values with the reported ones.
pub fn verify_proof_response(
    verifier: &ProofVerifier,
    state_root: H256,
    address: H160,
    response: &RpcProofResponse,
) -> InputResult<ProofResponseVerification> {
    let account_proof = decode_rlp_proof_nodes(&response.account_proof)?;
    let account = verifier.verify_account_proof(state_root, address, &account_proof);
    let (account_state, account_matches) = check_account(&account, response);

    let mut storage = Vec::with_capacity(response.storage_proof.len());
    for entry in response.storage_proof.iter() {
        let proof = decode_rlp_proof_nodes(&entry.proofs)?;
        let result = verifier.verify_storage_proof(state_root, address, entry.key, &proof);
        let value_matches = check_storage(&result, &entry.value);

        storage.push(StorageCheck {
            proof: result,
            reported_value: entry.value.clone(),
            value_matches,
        });
    }

    let verification = ProofResponseVerification {
        account,
        account_state,
        account_matches,
        storage,
    };
    info!(
        "Proofs for {:x}: account {}, {} storage slot(s), valid: {}",
        address,
        match verification.account_state {
            Some(_) => "present",
            None => "absent",
        },
        verification.storage.len(),
        verification.is_valid()
    );

    Ok(verification)
}
