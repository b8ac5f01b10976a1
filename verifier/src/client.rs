use std::marker::PhantomData;

use alloy::{providers::Provider, rpc::json_rpc::RpcParam, transports::Transport};
use anyhow::Context as _;
use ethereum_types::{H160, H256};
use futures::{stream, StreamExt as _, TryStreamExt as _};
use rsk_blocks::rpc::{from_value, RpcBlock, RpcProofResponse, RpcReceipt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

/// Receipts requested concurrently.
const MAX_NUMBER_OF_PARALLEL_REQUESTS: usize = 16;

fn block_tag(number: u64) -> String {
    format!("{number:#x}")
}

/// Issues the RSK JSON-RPC calls needed to verify a block and decodes their
/// results into the `rsk_blocks` input types.
pub struct RskClient<ProviderT, TransportT> {
    provider: ProviderT,
    _phantom: PhantomData<TransportT>,
}

impl<ProviderT, TransportT> RskClient<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    pub fn new(provider: ProviderT) -> Self {
        Self {
            provider,
            _phantom: PhantomData,
        }
    }

    /// Sends `method` and decodes its result, `None` if the node returned
    /// `null`.
    async fn request<P, R>(&self, method: &'static str, params: P) -> anyhow::Result<Option<R>>
    where
        P: RpcParam,
        R: DeserializeOwned,
    {
        let value: Value = self
            .provider
            .raw_request(method.into(), params)
            .await
            .with_context(|| format!("{method} request failed"))?;

        match value {
            Value::Null => Ok(None),
            value => Ok(Some(
                from_value(value).with_context(|| format!("invalid {method} result"))?,
            )),
        }
    }

    /// The block at height `number`, with full transaction objects.
    pub async fn block_by_number(&self, number: u64) -> anyhow::Result<RpcBlock> {
        let block: RpcBlock = self
            .request("eth_getBlockByNumber", (block_tag(number), true))
            .await?
            .with_context(|| format!("block {number} does not exist"))?;

        info!(
            "Fetched block {} ({:#x}) with {} transaction(s)",
            number,
            block.hash,
            block.transactions.len()
        );
        Ok(block)
    }

    /// The receipts of `tx_hashes`, in the same order.
    pub async fn receipts(&self, tx_hashes: &[H256]) -> anyhow::Result<Vec<RpcReceipt>> {
        let receipts: Vec<RpcReceipt> = stream::iter(tx_hashes.iter().copied())
            .map(|hash| async move {
                debug!("Fetching receipt of {:#x}", hash);
                self.request::<_, RpcReceipt>("eth_getTransactionReceipt", [hash])
                    .await?
                    .with_context(|| format!("receipt of {hash:#x} does not exist"))
            })
            .buffered(MAX_NUMBER_OF_PARALLEL_REQUESTS)
            .try_collect()
            .await?;

        info!("Fetched {} receipt(s)", receipts.len());
        Ok(receipts)
    }

    /// The `eth_getProof` response for `address` and `slots` at block
    /// `number`.
    pub async fn proof(
        &self,
        address: H160,
        slots: &[H256],
        number: u64,
    ) -> anyhow::Result<RpcProofResponse> {
        let response: RpcProofResponse = self
            .request("eth_getProof", (address, slots.to_vec(), block_tag(number)))
            .await?
            .with_context(|| format!("no proof for {address:#x} at block {number}"))?;

        debug!(
            "Fetched {} account proof node(s) for {:#x}",
            response.account_proof.len(),
            address
        );
        Ok(response)
    }
}
