use std::path::PathBuf;

use clap::{Parser, ValueHint};
use ethereum_types::{H160, H256};
use rsk_verifier::parsing::{parse_address, parse_slot};
use url::Url;

const RPC_HELP_HEADING: &str = "RPC options";

/// Recomputes an RSK block hash, its transaction and receipt trie roots, and
/// checks `eth_getProof` responses against the block's state root.
#[derive(Parser)]
#[command(version = rsk_verifier::version())]
pub(crate) struct Cli {
    /// The block to verify.
    #[arg(value_name = "BLOCK_NUMBER")]
    pub(crate) block_number: u64,

    /// The node RPC URL.
    #[arg(short = 'u', long, env = "RSK_RPC_URL", value_hint = ValueHint::Url, help_heading = RPC_HELP_HEADING)]
    pub(crate) rpc_url: Url,
    /// Backoff in milliseconds before the first retry of a failed request.
    #[arg(long, default_value_t = 0, help_heading = RPC_HELP_HEADING)]
    pub(crate) backoff: u64,
    /// The maximum number of retries.
    #[arg(long, default_value_t = 0, help_heading = RPC_HELP_HEADING)]
    pub(crate) max_retries: u32,

    /// Network name (mainnet, testnet, regtest) or chain id.
    #[arg(short = 'n', long, env = "RSK_NETWORK", default_value = "mainnet")]
    pub(crate) network: String,
    /// JSON file with activation heights, replacing the built-in heights of
    /// the networks it lists.
    #[arg(short = 'a', long, env = "RSK_ACTIVATIONS", value_hint = ValueHint::FilePath)]
    pub(crate) activations: Option<PathBuf>,
    /// Do not fetch receipts nor check the receipt root.
    #[arg(long)]
    pub(crate) skip_receipts: bool,

    /// Account whose `eth_getProof` response is checked. May be repeated.
    #[arg(long = "account", value_name = "ADDR", value_parser = parse_address)]
    pub(crate) accounts: Vec<H160>,
    /// Storage slot proven for every account. May be repeated.
    #[arg(long = "slot", value_name = "KEY", value_parser = parse_slot, requires = "accounts")]
    pub(crate) slots: Vec<H256>,
}
