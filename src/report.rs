use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::str::FromStr;

use crate::ethereum::{utils::dyn_sol_value_to_json, BlockTarget, EventRecord, ReceiverSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format '{}'. Use 'text' or 'json'", other)),
        }
    }
}

/// The query a report describes.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub contract: Address,
    pub event_name: &'a str,
    pub field: &'a str,
    pub from_block: u64,
    pub to_block: BlockTarget,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    contract: String,
    event: &'a str,
    field: &'a str,
    from_block: u64,
    to_block: String,
    records: Vec<JsonRecord<'a>>,
    unique_receivers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    event: &'a str,
    args: Map<String, Value>,
    transaction_hash: String,
    block_number: u64,
    log_index: u64,
}

fn args_to_json(record: &EventRecord) -> Map<String, Value> {
    record
        .args
        .iter()
        .map(|arg| (arg.name.clone(), dyn_sol_value_to_json(&arg.value)))
        .collect()
}

/// Write every record, then the distinct receivers, in the chosen format.
pub fn present<W: Write>(
    out: &mut W,
    format: OutputFormat,
    context: &ReportContext<'_>,
    records: &[EventRecord],
    receivers: &ReceiverSet,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => present_text(out, context, records, receivers),
        OutputFormat::Json => present_json(out, context, records, receivers),
    }
}

fn present_text<W: Write>(
    out: &mut W,
    context: &ReportContext<'_>,
    records: &[EventRecord],
    receivers: &ReceiverSet,
) -> io::Result<()> {
    for record in records {
        let args = record
            .args
            .iter()
            .map(|arg| format!("\"{}\": {}", arg.name, dyn_sol_value_to_json(&arg.value)))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(out, "Event: {}", record.event)?;
        writeln!(out, "Args: {{{}}}", args)?;
        writeln!(out, "Transaction Hash: {}", record.transaction_hash_hex())?;
        writeln!(out, "Block Number: {}", record.block_number)?;
        writeln!(out)?;
    }

    let unique = receivers
        .to_checksummed()
        .into_iter()
        .map(|address| format!("\"{}\"", address))
        .collect::<Vec<_>>()
        .join(", ");

    writeln!(out, "List of all unique {} addresses:", context.field)?;
    writeln!(out, "[{}]", unique)?;
    out.flush()
}

fn present_json<W: Write>(
    out: &mut W,
    context: &ReportContext<'_>,
    records: &[EventRecord],
    receivers: &ReceiverSet,
) -> io::Result<()> {
    let report = JsonReport {
        contract: context.contract.to_checksum(None),
        event: context.event_name,
        field: context.field,
        from_block: context.from_block,
        to_block: context.to_block.to_string(),
        records: records
            .iter()
            .map(|record| JsonRecord {
                event: &record.event,
                args: args_to_json(record),
                transaction_hash: record.transaction_hash_hex(),
                block_number: record.block_number,
                log_index: record.log_index,
            })
            .collect(),
        unique_receivers: receivers.to_checksummed(),
    };

    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    out.flush()
}
