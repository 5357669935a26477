use alloy::json_abi::{Event, JsonAbi};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::{FetchError, FetchResult};

/// Contract interface description loaded from a local JSON file.
///
/// Accepts either a bare ABI array or a compiler artifact carrying an `abi`
/// field (Hardhat, Foundry).
#[derive(Debug, Clone)]
pub struct ContractInterface {
    abi: JsonAbi,
}

impl ContractInterface {
    pub fn new(abi: JsonAbi) -> Self {
        Self { abi }
    }

    /// Load the interface description from disk
    pub async fn load<P: AsRef<Path>>(path: P) -> FetchResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            FetchError::InterfaceLoad(format!("Failed to read ABI file {:?}: {}", path, e))
        })?;

        let interface = Self::from_json(&content).map_err(|e| match e {
            FetchError::InterfaceLoad(msg) => {
                FetchError::InterfaceLoad(format!("{:?}: {}", path, msg))
            }
            other => other,
        })?;

        debug!(
            "Loaded ABI from {:?}: {} functions, {} events",
            path,
            interface.abi.functions().count(),
            interface.abi.events().count()
        );
        Ok(interface)
    }

    pub fn from_json(content: &str) -> FetchResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| FetchError::InterfaceLoad(format!("Invalid JSON: {}", e)))?;

        let abi_value = match value {
            Value::Object(mut artifact) => artifact.remove("abi").ok_or_else(|| {
                FetchError::InterfaceLoad(
                    "Expected an ABI array or an artifact object with an 'abi' field".to_string(),
                )
            })?,
            other => other,
        };

        let abi: JsonAbi = serde_json::from_value(abi_value)
            .map_err(|e| FetchError::InterfaceLoad(format!("Failed to parse ABI JSON: {}", e)))?;

        Ok(Self::new(abi))
    }

    /// Look up the single event declared under `name`.
    pub fn event(&self, name: &str) -> FetchResult<&Event> {
        match self.abi.events.get(name).map(Vec::as_slice) {
            Some([event]) => Ok(event),
            Some([]) | None => Err(FetchError::Query(format!(
                "Event '{}' not found in contract ABI. Available events: {}",
                name,
                self.event_names().join(", ")
            ))),
            Some(overloads) => Err(FetchError::Query(format!(
                "Event '{}' is declared {} times in the contract ABI; overloaded events are ambiguous",
                name,
                overloads.len()
            ))),
        }
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.abi.events.keys().map(String::as_str).collect()
    }
}
