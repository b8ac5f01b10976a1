mod common;

use common::{init_logger, proof_case};
use ethereum_types::{H256, U256};
use rsk_blocks::proof_response::verify_proof_response;
use rsk_trie::proof::{ProofError, ProofVerifier};

#[test]
fn account_and_storage_proofs_match_the_response() {
    init_logger();

    let case = proof_case("proof_present.json");
    let verifier = ProofVerifier::default();
    let verification =
        verify_proof_response(&verifier, case.state_root, case.address, &case.response).unwrap();

    assert!(verification.is_valid());
    assert!(verification.account.valid);

    let state = verification.account_state.unwrap();
    assert_eq!(state.nonce, U256::from(3));
    assert_eq!(state.balance, U256::from(500_000_000_000_000_000u64));
    assert_eq!(state.state_flags, 0);

    let values: Vec<Option<Vec<u8>>> = verification
        .storage
        .iter()
        .map(|s| s.proof.value.clone())
        .collect();
    assert_eq!(
        values,
        vec![
            Some(vec![0x2a]),
            Some(vec![0x0d, 0xe0, 0xb6, 0xb3, 0xa7, 0x64, 0x00, 0x00]),
            None,
        ]
    );
    assert_eq!(verification.storage[1].proof.storage_key, H256::from_low_u64_be(1));
    assert!(verification.storage[2].reported_value.is_empty());
}

#[test]
fn tampered_values_are_detected() {
    init_logger();

    let mut case = proof_case("proof_present.json");
    case.response.balance += U256::one();
    case.response.storage_proof[0].value = vec![0x2b];

    let verification = verify_proof_response(
        &ProofVerifier::default(),
        case.state_root,
        case.address,
        &case.response,
    )
    .unwrap();

    // The proofs themselves are still consistent with the root.
    assert!(verification.account.valid);
    assert!(verification.storage.iter().all(|s| s.proof.valid));

    assert!(!verification.account_matches);
    assert!(!verification.storage[0].value_matches);
    assert!(verification.storage[1].is_valid());
    assert!(!verification.is_valid());
}

#[test]
fn absent_account_with_zero_balance() {
    init_logger();

    let case = proof_case("proof_absent.json");
    let verification = verify_proof_response(
        &ProofVerifier::default(),
        case.state_root,
        case.address,
        &case.response,
    )
    .unwrap();

    assert!(verification.account.valid);
    assert_eq!(verification.account.value, None);
    assert_eq!(verification.account_state, None);
    assert!(verification.storage.is_empty());
    assert!(verification.is_valid());

    let mut rich = case.response.clone();
    rich.balance = U256::from(1);
    let verification =
        verify_proof_response(&ProofVerifier::default(), case.state_root, case.address, &rich)
            .unwrap();
    assert!(verification.account.valid);
    assert!(!verification.is_valid());
}

#[test]
fn proofs_against_another_root_are_invalid() {
    let case = proof_case("proof_present.json");
    let wrong_root = H256::repeat_byte(0x42);

    let verification =
        verify_proof_response(&ProofVerifier::default(), wrong_root, case.address, &case.response)
            .unwrap();

    assert!(!verification.account.valid);
    assert_eq!(verification.account.error, Some(ProofError::RootNotFound(wrong_root)));
    assert!(verification.storage.iter().all(|s| !s.is_valid()));
}

#[test]
fn incomplete_proofs_are_invalid() {
    let mut case = proof_case("proof_present.json");
    // Nodes are listed leaf first.
    case.response.account_proof.remove(0);

    let verification = verify_proof_response(
        &ProofVerifier::default(),
        case.state_root,
        case.address,
        &case.response,
    )
    .unwrap();

    assert!(!verification.account.valid);
    assert!(matches!(
        verification.account.error,
        Some(ProofError::MissingProofNode(_))
    ));
    assert!(!verification.account_matches);
    assert!(verification.storage.iter().all(|s| s.is_valid()));
}

#[test]
fn undecodable_hex_is_an_input_error() {
    let mut case = proof_case("proof_present.json");
    case.response.account_proof[0] = "0xzz".to_string();

    assert!(verify_proof_response(
        &ProofVerifier::default(),
        case.state_root,
        case.address,
        &case.response,
    )
    .is_err());
}
