//! Trait definitions at the seams of the tracer
//!
//! This module provides traits for:
//! - Driving a trace builder from an execution engine (`CallTracer`)
//! - Resetting and reading out tracer state (`Reset`, `TraceOutput`)
//! - Querying the engine during pre-check synthesis (`ExecutionScope`, `StateQuery`)
//! - Persisting encoded traces (`TraceStore`)

use crate::errors::StoreError;
use crate::types::{Address, Bytes, CallFrame, FrameExit, TxContext, B256, U256};

/// Event interface consumed by the trace builders
///
/// Engines call these in execution order for one transaction. Every
/// `start`/`enter` must be matched by exactly one `exit`.
pub trait CallTracer {
    /// Opens the root frame of the transaction
    fn start(&mut self, frame: CallFrame);

    /// Opens a nested frame one level below the innermost open frame
    fn enter(&mut self, frame: CallFrame);

    /// Closes the innermost open frame
    ///
    /// # Panics
    /// If no frame is open. This means the engine broke the enter/exit
    /// pairing and the trace can no longer be trusted.
    fn exit(&mut self, exit: FrameExit);

    /// Observes an opcode about to execute
    fn opcode(&mut self, step: &OpcodeStep<'_>);

    /// Faults are reported through `exit`; nothing to do here
    fn fault(&mut self, _step: &OpcodeStep<'_>) {}
}

/// One opcode observation
///
/// `scope` and `state` are only supplied by engines that reject call-like
/// opcodes before announcing a frame; the builders then synthesize the
/// missing frame.
#[derive(Clone, Copy)]
pub struct OpcodeStep<'a> {
    pub pc: u64,
    pub opcode: u8,
    /// Gas remaining before the opcode
    pub gas: u64,
    pub cost: u64,
    /// Depth of the executing frame, 1 for the root frame
    pub depth: usize,
    /// Error the engine already attached to this step
    pub error: Option<&'a str>,
    pub scope: Option<&'a dyn ExecutionScope>,
    pub state: Option<&'a dyn StateQuery>,
}

impl<'a> OpcodeStep<'a> {
    /// Plain observation without scope access
    pub fn new(pc: u64, opcode: u8, gas: u64, depth: usize) -> Self {
        Self {
            pc,
            opcode,
            gas,
            cost: 0,
            depth,
            error: None,
            scope: None,
            state: None,
        }
    }

    /// Attaches the executing frame's scope and a state view
    pub fn with_scope(mut self, scope: &'a dyn ExecutionScope, state: &'a dyn StateQuery) -> Self {
        self.scope = Some(scope);
        self.state = Some(state);
        self
    }

    /// Attaches an error already raised by the engine
    pub fn with_error(mut self, error: &'a str) -> Self {
        self.error = Some(error);
        self
    }
}

/// Read access to the executing frame
pub trait ExecutionScope {
    /// Address of the contract whose code is running
    fn contract_address(&self) -> Address;

    /// Stack item `n` positions below the top (0 is the top)
    fn stack_back(&self, n: usize) -> Option<U256>;

    /// Copy of `size` bytes of memory starting at `offset`
    fn memory_copy(&self, offset: usize, size: usize) -> Bytes;
}

/// Account queries the engine answers during pre-check synthesis
pub trait StateQuery {
    /// Whether `from` holds at least `value`
    fn can_transfer(&self, from: Address, value: U256) -> bool;

    /// Current nonce of `address`
    fn nonce(&self, address: Address) -> u64;

    /// Whether `address` already has a non-zero nonce or non-empty code
    fn is_occupied(&self, address: Address) -> bool;
}

/// Trait for resetting tracer state between transactions
///
/// Implementors should drop all accumulated state:
/// - Trace nodes
/// - Open frame stacks
/// - Per-depth markers
pub trait Reset {
    /// Clears all accumulated state and binds the tracer to a new transaction
    fn reset(&mut self, ctx: TxContext);
}

/// Trait for reading the collected output of a tracer
pub trait TraceOutput {
    type Output;

    fn get_output(&self) -> Self::Output;
}

/// Key-value store holding encoded traces by transaction hash
pub trait TraceStore {
    /// Stores `trace` under `tx_hash`
    fn write_trace(&self, tx_hash: B256, trace: Vec<u8>) -> Result<(), StoreError>;

    /// Loads the bytes stored under `tx_hash`, `None` if absent
    fn read_trace(&self, tx_hash: B256) -> Result<Option<Vec<u8>>, StoreError>;
}
