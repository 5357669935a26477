pub mod abi;
pub mod contract;
pub mod error;
pub mod provider;
pub mod utils;

use alloy::{
    dyn_abi::DynSolValue,
    eips::BlockNumberOrTag,
    primitives::{Address, B256},
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Upper end of a log query range.
///
/// Config files and the command line share the [`FromStr`] parser, so
/// `"Latest"`, `"19000000"` and `19000000` are all accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTarget {
    Number(u64),
    Tag(BlockTag),
}

/// Symbolic block resolved by the node at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Safe,
    Finalized,
}

impl BlockTarget {
    pub const LATEST: Self = BlockTarget::Tag(BlockTag::Latest);

    pub fn as_number(&self) -> Option<u64> {
        match self {
            BlockTarget::Number(n) => Some(*n),
            BlockTarget::Tag(_) => None,
        }
    }
}

impl Default for BlockTarget {
    fn default() -> Self {
        Self::LATEST
    }
}

impl From<BlockTarget> for BlockNumberOrTag {
    fn from(target: BlockTarget) -> Self {
        match target {
            BlockTarget::Number(n) => BlockNumberOrTag::Number(n),
            BlockTarget::Tag(BlockTag::Latest) => BlockNumberOrTag::Latest,
            BlockTarget::Tag(BlockTag::Safe) => BlockNumberOrTag::Safe,
            BlockTarget::Tag(BlockTag::Finalized) => BlockNumberOrTag::Finalized,
        }
    }
}

impl FromStr for BlockTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(BlockTarget::Tag(BlockTag::Latest)),
            "safe" => Ok(BlockTarget::Tag(BlockTag::Safe)),
            "finalized" => Ok(BlockTarget::Tag(BlockTag::Finalized)),
            other => other.parse::<u64>().map(BlockTarget::Number).map_err(|_| {
                format!(
                    "Invalid block '{}'. Use a block number, 'latest', 'safe' or 'finalized'",
                    s
                )
            }),
        }
    }
}

impl fmt::Display for BlockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTarget::Number(n) => write!(f, "{}", n),
            BlockTarget::Tag(BlockTag::Latest) => f.write_str("latest"),
            BlockTarget::Tag(BlockTag::Safe) => f.write_str("safe"),
            BlockTarget::Tag(BlockTag::Finalized) => f.write_str("finalized"),
        }
    }
}

impl Serialize for BlockTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockTarget::Number(n) => serializer.serialize_u64(*n),
            BlockTarget::Tag(_) => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for BlockTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlockTargetVisitor;

        impl de::Visitor<'_> for BlockTargetVisitor {
            type Value = BlockTarget;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a block number or one of \"latest\", \"safe\", \"finalized\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(BlockTarget::Number(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(BlockTarget::Number)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(BlockTargetVisitor)
    }
}

/// One decoded event argument, named as in the interface description.
#[derive(Debug, Clone, PartialEq)]
pub struct EventArg {
    pub name: String,
    pub value: DynSolValue,
}

/// One decoded log entry.
///
/// `args` holds exactly the inputs declared for the event, in declaration
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: String,
    pub args: Vec<EventArg>,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl EventRecord {
    pub fn arg(&self, name: &str) -> Option<&DynSolValue> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    pub fn transaction_hash_hex(&self) -> String {
        format!("0x{:x}", self.transaction_hash)
    }
}

/// Distinct addresses collected from one argument across a query result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverSet(BTreeSet<Address>);

impl ReceiverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the address was already present.
    pub fn insert(&mut self, address: Address) -> bool {
        self.0.insert(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    /// EIP-55 checksummed hex of every address.
    pub fn to_checksummed(&self) -> Vec<String> {
        self.iter().map(|address| address.to_checksum(None)).collect()
    }
}
