use anyhow::Result;
use std::io::{self, Write};
use tracing::{info, warn};

use crate::{
    config::Config,
    ethereum::{
        abi::ContractInterface,
        contract::{extract_field, ContractHandle},
        provider::{LogSource, NodeConnection},
    },
    report::{self, ReportContext},
};

/// Counts from one completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub records: usize,
    pub unique_receivers: usize,
}

/// Fetches every occurrence of one event from one contract and prints them
/// together with the distinct receivers.
#[derive(Debug, Clone)]
pub struct EventFetcher {
    config: Config,
}

impl EventFetcher {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connect to the configured node and report to stdout.
    pub async fn run(&self) -> Result<FetchSummary> {
        let connection =
            NodeConnection::connect(&self.config.rpc_url, self.config.request_timeout())?;
        connection.validate_connection().await?;

        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with(&connection, &mut out).await
    }

    /// Load the interface, query `source` and write the report to `out`.
    pub async fn run_with<S: LogSource, W: Write>(
        &self,
        source: &S,
        out: &mut W,
    ) -> Result<FetchSummary> {
        let config = &self.config;

        let interface = ContractInterface::load(&config.abi_path).await?;
        let contract = ContractHandle::bind(source, &config.contract_address, interface)?;

        info!(
            "Querying {} events of {} from block {} to {}",
            config.event_name,
            contract.address().to_checksum(None),
            config.from_block,
            config.to_block
        );

        let records = contract
            .query_events(&config.event_name, config.from_block, config.to_block)
            .await?;
        let receivers = extract_field(&records, &config.receiver_field)?;
        if receivers.is_empty() {
            warn!(
                "No {} events in blocks {}..={}",
                config.event_name, config.from_block, config.to_block
            );
        }

        let context = ReportContext {
            contract: contract.address(),
            event_name: &config.event_name,
            field: &config.receiver_field,
            from_block: config.from_block,
            to_block: config.to_block,
        };
        report::present(out, config.output_format, &context, &records, &receivers)?;

        Ok(FetchSummary {
            records: records.len(),
            unique_receivers: receivers.len(),
        })
    }
}
