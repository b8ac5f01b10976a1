//! A `tower` layer retrying failed JSON-RPC requests with exponential
//! backoff.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use alloy::{
    providers::{ProviderBuilder, RootProvider},
    rpc::{
        client::ClientBuilder,
        json_rpc::{RequestPacket, ResponsePacket},
    },
    transports::{http::ReqwestTransport, TransportError},
};
use tokio::time::Duration;
use tower::{retry::Policy, Layer, Service};
use tracing::warn;

/// Upper bound for the delay between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retries a request that failed at the transport level. JSON-RPC error
/// responses are successful transport results and are never retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    backoff: Duration,
    retries: u32,
    max_retries: u32,
}

impl RetryPolicy {
    pub const fn new(backoff: Duration, max_retries: u32) -> Self {
        Self {
            backoff,
            retries: 0,
            max_retries,
        }
    }

    /// Delay before the next attempt: `backoff * 2^retries`, capped.
    pub fn delay(&self) -> Duration {
        self.backoff
            .checked_mul(1 << self.retries.min(16))
            .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
    }

    /// The policy for the following attempt and the delay before it, or
    /// `None` once `max_retries` retries have been spent.
    pub fn next_attempt(&self) -> Option<(Self, Duration)> {
        (self.retries < self.max_retries).then(|| {
            let next = Self {
                retries: self.retries + 1,
                ..self.clone()
            };
            (next, self.delay())
        })
    }
}

impl Policy<RequestPacket, ResponsePacket, TransportError> for RetryPolicy {
    type Future = Pin<Box<dyn Future<Output = Self> + Send + 'static>>;

    fn retry(
        &self,
        _req: &RequestPacket,
        result: Result<&ResponsePacket, &TransportError>,
    ) -> Option<Self::Future> {
        let err = result.err()?;
        let (policy, delay) = self.next_attempt()?;
        warn!(
            "RPC request failed ({}), retry {}/{} in {:?}",
            err, policy.retries, policy.max_retries, delay
        );

        Some(Box::pin(async move {
            tokio::time::sleep(delay).await;
            policy
        }))
    }

    fn clone_request(&self, req: &RequestPacket) -> Option<RequestPacket> {
        Some(req.clone())
    }
}

/// Wraps the HTTP transport of an [`RskClient`](crate::client::RskClient).
pub struct RetryLayer {
    policy: RetryPolicy,
}

impl RetryLayer {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Service<RequestPacket> for RetryService<S>
where
    S: Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Send
        + 'static
        + Clone,
    S::Future: Send + 'static,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        // Hand the ready service to the future and keep a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let mut policy = self.policy.clone();

        Box::pin(async move {
            let mut res = inner.call(req.clone()).await;

            while let Some(next) = policy.retry(&req, res.as_ref()) {
                policy = next.await;
                res = inner.call(req.clone()).await;
            }

            res
        })
    }
}

/// An HTTP provider for `rpc_url` retrying up to `max_retries` times, waiting
/// `backoff_ms` before the first retry.
pub fn build_http_retry_provider(
    rpc_url: url::Url,
    backoff_ms: u64,
    max_retries: u32,
) -> RootProvider<RetryService<ReqwestTransport>> {
    let retry = RetryLayer::new(RetryPolicy::new(
        Duration::from_millis(backoff_ms),
        max_retries,
    ));
    let client = ClientBuilder::default().layer(retry).http(rpc_url);
    ProviderBuilder::new().on_client(client)
}
