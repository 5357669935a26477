mod config;
mod ethereum;
mod fetcher;
mod report;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use config::Config;
use ethereum::BlockTarget;
use fetcher::EventFetcher;
use report::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn cli() -> Command {
    Command::new("unlock-events")
        .version("0.1.0")
        .about("Fetch historical contract events and list the unique receivers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("ADDRESS")
                .help("Contract address to query"),
        )
        .arg(
            Arg::new("abi")
                .long("abi")
                .value_name("FILE")
                .help("Path to the contract ABI JSON file"),
        )
        .arg(
            Arg::new("event")
                .short('e')
                .long("event")
                .value_name("NAME")
                .help("Event name to fetch"),
        )
        .arg(
            Arg::new("from-block")
                .long("from-block")
                .value_name("BLOCK")
                .value_parser(clap::value_parser!(u64))
                .help("First block of the range (inclusive)"),
        )
        .arg(
            Arg::new("to-block")
                .long("to-block")
                .value_name("BLOCK")
                .value_parser(|s: &str| s.parse::<BlockTarget>())
                .help("Last block of the range: a number, latest, safe or finalized"),
        )
        .arg(
            Arg::new("field")
                .short('f')
                .long("field")
                .value_name("NAME")
                .help("Address argument to collect unique values from"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .value_parser(|s: &str| s.parse::<OutputFormat>())
                .help("Output format (text, json)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("RPC request timeout in seconds"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Command line arguments win over the configuration file.
fn apply_overrides(config: &mut Config, matches: &ArgMatches) {
    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(address) = matches.get_one::<String>("address") {
        config.contract_address = address.clone();
    }
    if let Some(abi) = matches.get_one::<String>("abi") {
        config.abi_path = PathBuf::from(abi);
    }
    if let Some(event) = matches.get_one::<String>("event") {
        config.event_name = event.clone();
    }
    if let Some(from_block) = matches.get_one::<u64>("from-block") {
        config.from_block = *from_block;
    }
    if let Some(to_block) = matches.get_one::<BlockTarget>("to-block") {
        config.to_block = *to_block;
    }
    if let Some(field) = matches.get_one::<String>("field") {
        config.receiver_field = field.clone();
    }
    if let Some(format) = matches.get_one::<OutputFormat>("format") {
        config.output_format = *format;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.request_timeout_secs = Some(*timeout);
    }
}

async fn run(matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        println!("{}", Config::default_config_path()?.display());
        return Ok(());
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load(config_path).await?;
    apply_overrides(&mut config, matches);

    info!(
        "Fetching {} events from {}",
        config.event_name, config.contract_address
    );

    let summary = EventFetcher::new(config).run().await?;
    info!(
        "Done: {} records, {} unique receivers",
        summary.records, summary.unique_receivers
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the report, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
