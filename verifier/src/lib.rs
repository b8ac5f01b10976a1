//! Glue between an RSK JSON-RPC endpoint and the `rsk_blocks` checks: HTTP
//! transport with retries, request fan-out, input files and report output.

pub mod client;
pub mod fs;
pub mod parsing;
pub mod report;
pub mod retry;
pub mod tracing;

/// Common information for the `--version` CLI flags.
pub fn version() -> String {
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    format!("{pkg_name} {pkg_version}")
}
