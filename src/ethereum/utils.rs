use alloy::{dyn_abi::DynSolValue, primitives::Address};
use serde_json::Value;
use std::str::FromStr;

use super::{
    error::{FetchError, FetchResult},
    BlockTarget,
};

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> FetchResult<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(FetchError::InvalidAddress(
            "Address cannot be empty".to_string(),
        ));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(FetchError::InvalidAddress(format!(
            "'{}'. Ethereum addresses must start with '0x'",
            address
        )));
    }

    if address.len() != 42 {
        return Err(FetchError::InvalidAddress(format!(
            "'{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        )));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FetchError::InvalidAddress(format!(
            "'{}'. Contains non-hexadecimal characters",
            address
        )));
    }

    Address::from_str(address)
        .map_err(|e| FetchError::InvalidAddress(format!("'{}': {}", address, e)))
}

/// Validates an event name against Solidity identifier rules
pub fn validate_event_name(event_name: &str) -> FetchResult<()> {
    let mut chars = event_name.chars();
    let Some(first) = chars.next() else {
        return Err(FetchError::Query("Event name cannot be empty".to_string()));
    };

    if !first.is_ascii_alphabetic() && first != '_' && first != '$' {
        return Err(FetchError::Query(format!(
            "Invalid event name: '{}'. Event names must start with a letter or underscore",
            event_name
        )));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(FetchError::Query(format!(
            "Invalid event name: '{}'. Event names can only contain letters, numbers, and underscores",
            event_name
        )));
    }

    Ok(())
}

/// Rejects ranges whose explicit end lies before the start.
///
/// Symbolic ends are resolved by the node and cannot be checked here.
pub fn validate_block_range(from_block: u64, to_block: BlockTarget) -> FetchResult<()> {
    match to_block.as_number() {
        Some(to) if to < from_block => Err(FetchError::Query(format!(
            "Invalid block range: from_block {} is greater than to_block {}",
            from_block, to
        ))),
        _ => Ok(()),
    }
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    let lowered = error.to_ascii_lowercase();

    if lowered.contains("query returned more than")
        || lowered.contains("block range")
        || lowered.contains("range is too large")
        || lowered.contains("exceed maximum block range")
        || lowered.contains("response size exceeded")
    {
        format!(
            "Log query rejected: the node refused the requested block range. Narrow the range with --from-block/--to-block. ({})",
            error
        )
    } else if lowered.contains("connection refused")
        || lowered.contains("network unreachable")
        || lowered.contains("dns error")
    {
        "Network error: Cannot connect to RPC endpoint. Check your internet connection and RPC URL configuration.".to_string()
    } else if lowered.contains("timeout") || lowered.contains("timed out") {
        "Network error: Request timed out. The RPC endpoint may be overloaded or unreachable."
            .to_string()
    } else if lowered.contains("rate limit") || lowered.contains("429") {
        "Rate limit error: Too many requests to the RPC endpoint. Try again in a few moments or use a different endpoint.".to_string()
    } else if lowered.contains("401") || lowered.contains("unauthorized") {
        "Authentication error: The RPC endpoint rejected the request. Check the API key in your RPC URL or ALCHEMY_API_KEY.".to_string()
    } else if lowered.contains("method not found") {
        "RPC error: eth_getLogs is not supported by this RPC endpoint. Try using a different endpoint.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}

/// Convert a decoded Solidity value to JSON.
///
/// Addresses are checksummed, integers become decimal strings so that
/// 256-bit values survive.
pub fn dyn_sol_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => {
            Value::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Function(function) => Value::String(format!("0x{:x}", function)),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(dyn_sol_value_to_json).collect())
        }
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{:?}", other)),
    }
}
