use alloy::{
    dyn_abi::{DynSolValue, EventExt},
    eips::BlockNumberOrTag,
    json_abi::Event,
    primitives::Address,
    rpc::types::{Filter, Log},
};
use tracing::{debug, info, trace};

use super::{
    abi::ContractInterface,
    error::{FetchError, FetchResult},
    provider::LogSource,
    utils, BlockTarget, EventArg, EventRecord, ReceiverSet,
};

/// A deployed contract address paired with its interface description.
#[derive(Debug)]
pub struct ContractHandle<'a, S: LogSource> {
    source: &'a S,
    address: Address,
    interface: ContractInterface,
}

impl<'a, S: LogSource> ContractHandle<'a, S> {
    /// Pure construction; only the address format is checked.
    pub fn bind(source: &'a S, address: &str, interface: ContractInterface) -> FetchResult<Self> {
        let address = utils::validate_address(address)?;
        Ok(Self {
            source,
            address,
            interface,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Fetch every `event_name` log in `[from_block, to_block]` with a single
    /// `eth_getLogs` call.
    ///
    /// Records come back in node order. With a symbolic `to_block` the result
    /// depends on the node's head at call time.
    pub async fn query_events(
        &self,
        event_name: &str,
        from_block: u64,
        to_block: BlockTarget,
    ) -> FetchResult<Vec<EventRecord>> {
        utils::validate_event_name(event_name)?;
        let event = self.interface.event(event_name)?;
        utils::validate_block_range(from_block, to_block)?;

        let filter = self.build_filter(event, from_block, to_block)?;
        debug!(
            "Requesting {} logs from {:?} in blocks {}..={}",
            event_name, self.address, from_block, to_block
        );

        let logs = self.source.logs(&filter).await.map_err(|e| {
            FetchError::Query(format!(
                "eth_getLogs for '{}' failed: {}",
                event_name,
                utils::interpret_rpc_error(&e.to_string())
            ))
        })?;

        let records = logs
            .iter()
            .map(|log| decode_log(event, log))
            .collect::<FetchResult<Vec<_>>>()?;

        info!(
            "Fetched {} {} events from {:?}",
            records.len(),
            event_name,
            self.address
        );
        Ok(records)
    }

    fn build_filter(
        &self,
        event: &Event,
        from_block: u64,
        to_block: BlockTarget,
    ) -> FetchResult<Filter> {
        if event.anonymous {
            return Err(FetchError::Query(format!(
                "Event '{}' is anonymous and has no signature topic to filter on",
                event.name
            )));
        }

        Ok(Filter::new()
            .address(self.address)
            .event_signature(event.selector())
            .from_block(BlockNumberOrTag::Number(from_block))
            .to_block(BlockNumberOrTag::from(to_block)))
    }
}

/// Decode one mined log against its declared event.
fn decode_log(event: &Event, log: &Log) -> FetchResult<EventRecord> {
    let transaction_hash = log.transaction_hash.ok_or_else(|| {
        FetchError::Query(format!(
            "{} log has no transaction hash; pending logs cannot be attributed",
            event.name
        ))
    })?;
    let block_number = log.block_number.ok_or_else(|| {
        FetchError::Query(format!(
            "{} log in tx 0x{:x} has no block number; pending logs cannot be attributed",
            event.name, transaction_hash
        ))
    })?;
    let log_index = log.log_index.unwrap_or_default();

    let decoded = event.decode_log(log.data(), true).map_err(|e| {
        FetchError::Query(format!(
            "Failed to decode {} log in tx 0x{:x}: {}",
            event.name, transaction_hash, e
        ))
    })?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();

    let args = event
        .inputs
        .iter()
        .enumerate()
        .map(|(position, param)| {
            let value = if param.indexed {
                indexed.next()
            } else {
                body.next()
            };
            let name = if param.name.is_empty() {
                format!("arg{}", position)
            } else {
                param.name.clone()
            };
            value.map(|value| EventArg { name, value }).ok_or_else(|| {
                FetchError::Schema(format!(
                    "{} log in tx 0x{:x} is missing a value for parameter {}",
                    event.name, transaction_hash, position
                ))
            })
        })
        .collect::<FetchResult<Vec<_>>>()?;

    Ok(EventRecord {
        event: event.name.clone(),
        args,
        transaction_hash,
        block_number,
        log_index,
    })
}

/// Collect the distinct addresses found under `field` across `records`.
///
/// Every record must carry the field as an address; anything else means the
/// address or interface file is wrong.
pub fn extract_field(records: &[EventRecord], field: &str) -> FetchResult<ReceiverSet> {
    let mut receivers = ReceiverSet::new();

    for record in records {
        match record.arg(field) {
            Some(DynSolValue::Address(address)) => {
                if !receivers.insert(*address) {
                    trace!("Duplicate {} {:?} in block {}", field, address, record.block_number);
                }
            }
            Some(other) => {
                return Err(FetchError::Schema(format!(
                    "Field '{}' of {} in tx {} is not an address: {:?}",
                    field,
                    record.event,
                    record.transaction_hash_hex(),
                    other
                )));
            }
            None => {
                let declared: Vec<&str> = record.args.iter().map(|a| a.name.as_str()).collect();
                return Err(FetchError::Schema(format!(
                    "{} in tx {} (block {}) has no field '{}'. Declared fields: {}",
                    record.event,
                    record.transaction_hash_hex(),
                    record.block_number,
                    field,
                    declared.join(", ")
                )));
            }
        }
    }

    debug!(
        "Extracted {} unique '{}' values from {} records",
        receivers.len(),
        field,
        records.len()
    );
    Ok(receivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::abi::tests::UNLOCK_ABI;
    use crate::ethereum::provider::mock::{mined_log, StaticLogSource};
    use alloy::primitives::{LogData, B256, U256};
    use alloy::sol;
    use alloy::sol_types::SolEvent;

    sol! {
        event UnlockRequested(address indexed receiver, uint256 amount);
        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    const CONTRACT: &str = "0x8668a15b7b023Dc77B372a740FCb8939E15257Cf";

    fn contract() -> Address {
        CONTRACT.parse().unwrap()
    }

    fn receiver_a() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn receiver_b() -> Address {
        Address::repeat_byte(0xbb)
    }

    fn unlock(receiver: Address, amount: u64) -> LogData {
        UnlockRequested {
            receiver,
            amount: U256::from(amount),
        }
        .encode_log_data()
    }

    fn interface() -> ContractInterface {
        ContractInterface::from_json(UNLOCK_ABI).unwrap()
    }

    /// AAA, AAA, BBB unlocks plus noise: a Transfer from the same contract and
    /// an unlock from another contract.
    fn history() -> StaticLogSource {
        let other_contract = Address::repeat_byte(0x11);
        StaticLogSource::new(
            100,
            vec![
                mined_log(contract(), unlock(receiver_a(), 5), 10, 0, B256::repeat_byte(1)),
                mined_log(
                    contract(),
                    Transfer {
                        from: receiver_a(),
                        to: receiver_b(),
                        value: U256::from(1),
                    }
                    .encode_log_data(),
                    11,
                    0,
                    B256::repeat_byte(2),
                ),
                mined_log(contract(), unlock(receiver_a(), 7), 12, 3, B256::repeat_byte(3)),
                mined_log(other_contract, unlock(receiver_b(), 9), 12, 4, B256::repeat_byte(4)),
                mined_log(contract(), unlock(receiver_b(), 11), 12, 5, B256::repeat_byte(5)),
            ],
        )
    }

    #[test]
    fn test_abi_selector_matches_solidity_signature() {
        let interface = interface();
        let event = interface.event("UnlockRequested").unwrap();
        assert_eq!(event.selector(), UnlockRequested::SIGNATURE_HASH);
    }

    #[test]
    fn test_bind_rejects_invalid_address() {
        let source = StaticLogSource::default();
        let result = ContractHandle::bind(&source, "0x1234", interface());
        assert!(matches!(result, Err(FetchError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_unlock_scenario() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let records = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.event == "UnlockRequested"));
        assert_eq!(
            records.iter().map(|r| r.block_number).collect::<Vec<_>>(),
            vec![10, 12, 12]
        );
        assert_eq!(
            records[1].arg("amount"),
            Some(&DynSolValue::Uint(U256::from(7), 256))
        );
        assert_eq!(records[2].transaction_hash, B256::repeat_byte(5));

        let receivers = extract_field(&records, "receiver").unwrap();
        assert_eq!(
            receivers.iter().copied().collect::<Vec<_>>(),
            vec![receiver_a(), receiver_b()]
        );
    }

    #[tokio::test]
    async fn test_records_follow_declared_fields_and_node_order() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let records = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await
            .unwrap();

        for record in &records {
            let names: Vec<&str> = record.args.iter().map(|a| a.name.as_str()).collect();
            assert_eq!(names, vec!["receiver", "amount"]);
        }
        assert!(records
            .windows(2)
            .all(|w| (w[0].block_number, w[0].log_index) <= (w[1].block_number, w[1].log_index)));
    }

    #[tokio::test]
    async fn test_filter_targets_contract_topic_and_range() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        handle
            .query_events("UnlockRequested", 5, BlockTarget::LATEST)
            .await
            .unwrap();

        let filters = source.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        let filter = &filters[0];
        assert!(filter.address.matches(&contract()));
        assert!(!filter.address.matches(&Address::repeat_byte(0x11)));
        assert!(filter.topics[0].matches(&UnlockRequested::SIGNATURE_HASH));
        assert_eq!(filter.get_from_block(), Some(5));
        assert_eq!(filter.get_to_block(), None);
    }

    #[tokio::test]
    async fn test_fixed_range_is_idempotent() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let first = handle
            .query_events("UnlockRequested", 10, BlockTarget::Number(11))
            .await
            .unwrap();
        let second = handle
            .query_events("UnlockRequested", 10, BlockTarget::Number(11))
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let records = handle
            .query_events("UnlockRequested", 50, BlockTarget::Number(60))
            .await
            .unwrap();
        assert!(records.is_empty());

        let receivers = extract_field(&records, "receiver").unwrap();
        assert!(receivers.is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_event_fails_without_rpc() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let result = handle
            .query_events("UnlockCompleted", 0, BlockTarget::LATEST)
            .await;
        assert!(matches!(result, Err(FetchError::Query(_))));
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_inverted_range_fails_without_rpc() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let result = handle
            .query_events("UnlockRequested", 20, BlockTarget::Number(10))
            .await;
        assert!(matches!(result, Err(FetchError::Query(_))));
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rpc_rejection_is_a_query_error() {
        let source = StaticLogSource::failing("query returned more than 10000 results");
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let err = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await
            .unwrap_err();
        match err {
            FetchError::Query(msg) => assert!(msg.contains("Log query rejected")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_log_is_rejected() {
        let mut log = mined_log(contract(), unlock(receiver_a(), 1), 10, 0, B256::repeat_byte(1));
        log.block_number = None;
        let source = StaticLogSource::new(100, vec![log]);
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let result = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await;
        assert!(matches!(result, Err(FetchError::Query(_))));
    }

    #[tokio::test]
    async fn test_undecodable_log_is_rejected() {
        let truncated = LogData::new_unchecked(
            vec![
                UnlockRequested::SIGNATURE_HASH,
                receiver_a().into_word(),
            ],
            vec![0u8; 4].into(),
        );
        let source = StaticLogSource::new(
            100,
            vec![mined_log(contract(), truncated, 10, 0, B256::repeat_byte(1))],
        );
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();

        let result = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await;
        assert!(matches!(result, Err(FetchError::Query(_))));
    }

    #[test]
    fn test_extract_field_dedup_bound() {
        let record = |receiver: Address, block: u64| EventRecord {
            event: "UnlockRequested".to_string(),
            args: vec![
                EventArg {
                    name: "receiver".to_string(),
                    value: DynSolValue::Address(receiver),
                },
                EventArg {
                    name: "amount".to_string(),
                    value: DynSolValue::Uint(U256::from(block), 256),
                },
            ],
            transaction_hash: B256::repeat_byte(block as u8),
            block_number: block,
            log_index: 0,
        };

        let distinct: Vec<_> = (1..=4u8)
            .map(|i| record(Address::repeat_byte(i), i as u64))
            .collect();
        assert_eq!(extract_field(&distinct, "receiver").unwrap().len(), distinct.len());

        let repeated = vec![
            record(receiver_a(), 1),
            record(receiver_b(), 2),
            record(receiver_a(), 3),
        ];
        assert!(extract_field(&repeated, "receiver").unwrap().len() < repeated.len());
    }

    #[tokio::test]
    async fn test_extract_field_schema_errors() {
        let source = history();
        let handle = ContractHandle::bind(&source, CONTRACT, interface()).unwrap();
        let records = handle
            .query_events("UnlockRequested", 0, BlockTarget::LATEST)
            .await
            .unwrap();

        assert!(matches!(
            extract_field(&records, "owner"),
            Err(FetchError::Schema(_))
        ));
        assert!(matches!(
            extract_field(&records, "amount"),
            Err(FetchError::Schema(_))
        ));
    }
}
