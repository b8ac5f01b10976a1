//! Human readable verification reports.

use std::io::{self, Write};

use ethereum_types::H160;
use rsk_blocks::{
    proof_response::{ProofResponseVerification, StorageCheck},
    verify::BlockVerification,
};

fn verdict(ok: bool) -> &'static str {
    match ok {
        true => "ok",
        false => "MISMATCH",
    }
}

pub fn write_block_report<W: Write>(out: &mut W, v: &BlockVerification) -> io::Result<()> {
    let c = &v.config;
    writeln!(out, "Block {}", v.number)?;
    writeln!(
        out,
        "  rules: rskip92={} rskip126={} umm={} rskip144={} rskip351={} trie={:?}",
        c.rskip92,
        c.rskip126,
        c.rskip_umm,
        c.rskip144,
        c.rskip351,
        c.trie_format()
    )?;

    for (name, check) in v.checks() {
        writeln!(out, "  {:<18} {}", name, check)?;
    }
    if v.receipts_root.is_none() {
        writeln!(out, "  {:<18} not checked", "receipts root")?;
    }

    Ok(())
}

fn write_storage_line<W: Write>(out: &mut W, check: &StorageCheck) -> io::Result<()> {
    let slot = check.proof.storage_key;
    if let Some(e) = &check.proof.error {
        return writeln!(out, "    slot {:#x}: invalid proof: {}", slot, e);
    }

    let proven = match (&check.proof.value, check.proof.value_hash) {
        (Some(v), _) => format!("0x{}", hex::encode(v)),
        (None, Some(h)) => format!("long value with hash {:#x}", h),
        (None, None) => "absent".to_string(),
    };
    writeln!(
        out,
        "    slot {:#x}: {} (reported 0x{}) ({})",
        slot,
        proven,
        hex::encode(&check.reported_value),
        verdict(check.value_matches)
    )
}

pub fn write_proof_report<W: Write>(
    out: &mut W,
    address: H160,
    v: &ProofResponseVerification,
) -> io::Result<()> {
    writeln!(out, "Account {:#x}", address)?;

    match (&v.account.error, &v.account_state) {
        (Some(e), _) => writeln!(out, "  invalid proof: {}", e)?,
        (None, Some(state)) => writeln!(
            out,
            "  nonce {} balance {} ({})",
            state.nonce,
            state.balance,
            verdict(v.account_matches)
        )?,
        (None, None) => writeln!(out, "  absent ({})", verdict(v.account_matches))?,
    }

    if !v.storage.is_empty() {
        writeln!(out, "  storage:")?;
    }
    for check in &v.storage {
        write_storage_line(out, check)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ethereum_types::{H160, H256, U256};
    use rsk_blocks::{
        config::config_for_block_number,
        proof_response::{AccountState, ProofResponseVerification, StorageCheck},
        verify::{BlockVerification, HashCheck},
    };
    use rsk_trie::proof::{AccountProofResult, ProofError, StorageProofResult};

    use super::{write_block_report, write_proof_report};

    fn render<F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>>(f: F) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn block_reports_list_every_check() {
        let ok = HashCheck {
            expected: H256::repeat_byte(1),
            computed: H256::repeat_byte(1),
        };
        let v = BlockVerification {
            number: 800_000,
            config: config_for_block_number(800_000, "mainnet").unwrap(),
            block_hash: ok,
            transactions_root: HashCheck {
                computed: H256::repeat_byte(2),
                ..ok
            },
            receipts_root: None,
        };

        let text = render(|out| write_block_report(out, &v));
        assert!(text.starts_with("Block 800000\n"));
        assert!(text.contains("rskip92=true rskip126=true umm=false"));
        assert!(text.contains("trie=Rskip107"));
        assert!(text.contains("block hash"));
        assert!(text.contains("MISMATCH"));
        assert!(text.contains("receipts root      not checked"));
    }

    #[test]
    fn proof_reports_show_values_and_errors() {
        let address = H160::repeat_byte(0xaa);
        let slot = H256::from_low_u64_be(1);
        let v = ProofResponseVerification {
            account: AccountProofResult {
                valid: true,
                address,
                value: Some(vec![0xc2, 0x03, 0x80]),
                value_hash: None,
                error: None,
            },
            account_state: Some(AccountState {
                nonce: U256::from(3),
                balance: U256::zero(),
                state_flags: 0,
            }),
            account_matches: true,
            storage: vec![
                StorageCheck {
                    proof: StorageProofResult {
                        valid: true,
                        address,
                        storage_key: slot,
                        value: Some(vec![0x2a]),
                        value_hash: None,
                        error: None,
                    },
                    reported_value: vec![0x2b],
                    value_matches: false,
                },
                StorageCheck {
                    proof: StorageProofResult {
                        valid: false,
                        address,
                        storage_key: slot,
                        value: None,
                        value_hash: None,
                        error: Some(ProofError::EmptyProof),
                    },
                    reported_value: vec![],
                    value_matches: false,
                },
            ],
        };

        let text = render(|out| write_proof_report(out, address, &v));
        assert!(text.contains("nonce 3 balance 0 (ok)"));
        assert!(text.contains(": 0x2a (reported 0x2b) (MISMATCH)"));
        assert!(text.contains("invalid proof: Proof contains no nodes"));
    }
}
