use alloy::{
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::{
        client::RpcClient,
        types::{Filter, Log},
    },
    transports::{
        http::{Client, Http},
        TransportResult,
    },
};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    error::{FetchError, FetchResult},
    utils,
};

/// Anything that can answer the two RPC calls event fetching needs.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn block_number(&self) -> TransportResult<u64>;

    async fn logs(&self, filter: &Filter) -> TransportResult<Vec<Log>>;
}

/// HTTP JSON-RPC connection to one node.
#[derive(Debug)]
pub struct NodeConnection {
    url: Url,
    provider: RootProvider<Http<Client>>,
}

impl NodeConnection {
    /// Build the provider. No request is sent until [`Self::validate_connection`].
    pub fn connect(rpc_url: &str, timeout: Option<Duration>) -> FetchResult<Self> {
        let url: Url = rpc_url
            .trim()
            .parse()
            .map_err(|e| FetchError::Connection(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;

        let provider = Self::create_provider(url.clone(), timeout)?;
        Ok(Self { url, provider })
    }

    fn create_provider(
        url: Url,
        timeout: Option<Duration>,
    ) -> FetchResult<RootProvider<Http<Client>>> {
        let Some(timeout) = timeout else {
            return Ok(ProviderBuilder::new().on_http(url));
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connection(format!("Failed to build HTTP client: {}", e)))?;
        let transport = Http::with_client(client, url);
        let rpc_client = RpcClient::new(transport, false);

        Ok(ProviderBuilder::new().on_client(rpc_client))
    }

    /// Confirms the node answers and returns its current head block.
    pub async fn validate_connection(&self) -> FetchResult<u64> {
        match self.block_number().await {
            Ok(head) => {
                info!("Connected to Ethereum node at {}", self.redacted_url());
                debug!("Node head block: {}", head);
                Ok(head)
            }
            Err(e) => Err(FetchError::Connection(format!(
                "Cannot connect to {}: {}",
                self.redacted_url(),
                utils::interpret_rpc_error(&e.to_string())
            ))),
        }
    }

    /// Endpoint without its path, so API keys embedded in it stay out of logs.
    pub fn redacted_url(&self) -> String {
        match self.url.host_str() {
            Some(host) => format!("{}://{}", self.url.scheme(), host),
            None => self.url.scheme().to_string(),
        }
    }
}

#[async_trait]
impl LogSource for NodeConnection {
    async fn block_number(&self) -> TransportResult<u64> {
        self.provider.get_block_number().await
    }

    async fn logs(&self, filter: &Filter) -> TransportResult<Vec<Log>> {
        self.provider.get_logs(filter).await
    }
}
