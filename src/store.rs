//! Persistence of trace sets keyed by transaction hash
//!
//! Writing is best effort: a failed write is logged and dropped, the traced
//! transaction is never affected. Reading distinguishes a missing trace from
//! an empty one.

use crate::codec::{decode_storage, encode_storage, to_api_traces, ApiTrace};
use crate::errors::{StoreError, TraceError};
use crate::traits::TraceStore;
use crate::types::{TraceSet, B256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Encodes `set` and writes it under its transaction hash
///
/// Failures are logged and swallowed.
pub fn persist<S: TraceStore + ?Sized>(store: &S, set: &TraceSet) {
    let bytes = encode_storage(set);
    let len = bytes.len();
    match store.write_trace(set.transaction_hash, bytes) {
        Ok(()) => debug!(tx_hash = %set.transaction_hash, bytes = len, "Persisted transaction trace"),
        Err(err) => error!(tx_hash = %set.transaction_hash, error = %err, "Failed to persist transaction trace"),
    }
}

/// Runs [`persist`] on the blocking pool
///
/// Must be called from within a tokio runtime.
pub fn spawn_persist<S>(store: Arc<S>, set: TraceSet) -> JoinHandle<()>
where
    S: TraceStore + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || persist(store.as_ref(), &set))
}

/// Loads and decodes the trace set stored under `tx_hash`
pub fn read<S: TraceStore + ?Sized>(store: &S, tx_hash: B256) -> Result<TraceSet, TraceError> {
    match store.read_trace(tx_hash)? {
        Some(bytes) if !bytes.is_empty() => Ok(decode_storage(&bytes)?),
        _ => Err(TraceError::NotFound(tx_hash)),
    }
}

/// Loads the trace set stored under `tx_hash` in its API form
pub fn read_api_traces<S: TraceStore + ?Sized>(store: &S, tx_hash: B256) -> Result<Vec<ApiTrace>, TraceError> {
    read(store, tx_hash).map(|set| to_api_traces(&set))
}

/// In-process trace store
#[derive(Debug, Default)]
pub struct MemoryStore {
    traces: RwLock<HashMap<B256, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored traces, still counted after a writer panicked
    pub fn len(&self) -> usize {
        self.traces.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TraceStore for MemoryStore {
    fn write_trace(&self, tx_hash: B256, trace: Vec<u8>) -> Result<(), StoreError> {
        let mut traces = self
            .traces
            .write()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        traces.insert(tx_hash, trace);
        Ok(())
    }

    fn read_trace(&self, tx_hash: B256) -> Result<Option<Vec<u8>>, StoreError> {
        let traces = self
            .traces
            .read()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(traces.get(&tx_hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, ActionResult, CallAction, CallKind, Outcome, TraceNode, TxContext};
    use alloy::primitives::{b256, Address, Bytes, U256};

    const TX: B256 = b256!("00000000000000000000000000000000000000000000000000000000000000aa");

    fn trace_set() -> TraceSet {
        let mut set = TraceSet::new(TxContext {
            transaction_hash: TX,
            ..Default::default()
        });
        set.traces.push(TraceNode {
            action: Action::Call(CallAction {
                call_type: CallKind::Call,
                from: Address::ZERO,
                to: Address::repeat_byte(1),
                value: U256::from(1),
                gas: 50_000,
                input: Bytes::new(),
            }),
            outcome: Some(Outcome::Success(ActionResult::Call {
                gas_used: 21_000,
                output: Bytes::new(),
            })),
            trace_address: Vec::new(),
            subtraces: 0,
        });
        set
    }

    struct FailingStore;

    impl TraceStore for FailingStore {
        fn write_trace(&self, _tx_hash: B256, _trace: Vec<u8>) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }

        fn read_trace(&self, _tx_hash: B256) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Backend("disk gone".to_string()))
        }
    }

    #[test]
    fn test_persist_then_read() {
        let store = MemoryStore::new();
        let set = trace_set();
        persist(&store, &set);
        assert_eq!(read(&store, TX).unwrap(), set);
        assert_eq!(read_api_traces(&store, TX).unwrap(), to_api_traces(&set));
    }

    #[test]
    fn test_missing_and_empty_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(read(&store, TX), Err(TraceError::NotFound(hash)) if hash == TX));

        store.write_trace(TX, Vec::new()).unwrap();
        assert!(matches!(read(&store, TX), Err(TraceError::NotFound(_))));
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        persist(&FailingStore, &trace_set());
        assert!(matches!(read(&FailingStore, TX), Err(TraceError::Store(_))));
    }

    #[test]
    fn test_corrupt_value_is_codec_error() {
        let store = MemoryStore::new();
        store.write_trace(TX, vec![0xc3, 0x01]).unwrap();
        assert!(matches!(read(&store, TX), Err(TraceError::Codec(_))));
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let store = Arc::new(MemoryStore::new());
        store.write_trace(TX, vec![0x01]).unwrap();

        let writer = store.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = writer.traces.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(panicked.is_err());
        assert!(store.traces.is_poisoned());

        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_persist_writes_in_background() {
        let store = Arc::new(MemoryStore::new());
        spawn_persist(store.clone(), trace_set()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(read(store.as_ref(), TX).unwrap().traces.len(), 1);
    }
}
