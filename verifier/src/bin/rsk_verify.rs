use std::io::Write as _;

use anyhow::{bail, Result};
use clap::Parser;
use dotenvy::dotenv;
use rsk_blocks::{proof_response::verify_proof_response, verify::verify_block};
use rsk_trie::proof::ProofVerifier;
use rsk_verifier::{
    client::RskClient,
    fs::load_activation_schedule,
    report::{write_block_report, write_proof_report},
    retry::build_http_retry_provider,
};
use tracing::{error, info};

use self::rsk_verify::*;
mod rsk_verify {
    pub mod cli;
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    rsk_verifier::tracing::init();

    let args = cli::Cli::parse();
    let number = args.block_number;

    let schedule = load_activation_schedule(args.activations.as_deref())?;
    let config = schedule.config_for_block_number(number, &args.network)?;

    let client = RskClient::new(build_http_retry_provider(
        args.rpc_url.clone(),
        args.backoff,
        args.max_retries,
    ));

    let block = client.block_by_number(number).await?;
    let receipts = match args.skip_receipts {
        true => None,
        false => Some(client.receipts(&block.transactions.hashes()).await?),
    };

    let verification = verify_block(&block, receipts.as_deref(), &config)?;
    write_block_report(&mut std::io::stdout().lock(), &verification)?;
    let mut valid = verification.is_valid();

    let verifier = ProofVerifier::default();
    for address in args.accounts.iter().copied() {
        let response = client.proof(address, &args.slots, number).await?;
        let proofs = verify_proof_response(&verifier, block.state_root, address, &response)?;

        write_proof_report(&mut std::io::stdout().lock(), address, &proofs)?;
        valid &= proofs.is_valid();
    }
    std::io::stdout().flush()?;

    if !valid {
        error!("Block {} failed verification", number);
        bail!("verification failed");
    }

    info!("All checks passed");
    Ok(())
}
