//! Core types for call tracing
//!
//! This module defines the trace record shared by both builders and the codec:
//! - Per-kind actions (call family, create, selfdestruct)
//! - Results and failures of a traced frame
//! - Trace nodes with their position in the call tree
//! - The per-transaction trace set
//! - Engine-facing frame descriptions used by the event interface

pub use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;

/// Flavour of a message call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CallKind {
    /// Regular `CALL`
    Call,
    /// `CALLCODE`
    CallCode,
    /// `DELEGATECALL`
    DelegateCall,
    /// `STATICCALL`
    StaticCall,
}

impl CallKind {
    /// Lowercase opcode name, as rendered in `action.callType`
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Call => "call",
            CallKind::CallCode => "callcode",
            CallKind::DelegateCall => "delegatecall",
            CallKind::StaticCall => "staticcall",
        }
    }
}

/// Message call action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallAction {
    pub call_type: CallKind,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: u64,
    pub input: Bytes,
}

/// Contract creation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAction {
    pub from: Address,
    pub value: U256,
    pub gas: u64,
    pub init: Bytes,
    /// Address of the new contract, once known
    pub address: Option<Address>,
}

/// Self-destruct action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfDestructAction {
    /// Contract being destroyed
    pub address: Address,
    /// Beneficiary of the remaining balance
    pub refund_address: Address,
    pub balance: U256,
}

/// What a trace node did, one case per kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    Call(CallAction),
    Create(CreateAction),
    SelfDestruct(SelfDestructAction),
}

impl Action {
    /// Gas attached to the action (always zero for self-destructs)
    pub fn gas(&self) -> u64 {
        match self {
            Action::Call(call) => call.gas,
            Action::Create(create) => create.gas,
            Action::SelfDestruct(_) => 0,
        }
    }

    /// Overwrites the attached gas; a no-op for self-destructs
    pub fn set_gas(&mut self, gas: u64) {
        match self {
            Action::Call(call) => call.gas = gas,
            Action::Create(create) => create.gas = gas,
            Action::SelfDestruct(_) => {}
        }
    }

    /// Kind label: one of `call`, `callcode`, `delegatecall`,
    /// `staticcall`, `create`, `suicide`
    pub fn kind_label(&self) -> &'static str {
        match self {
            Action::Call(call) => call.call_type.as_str(),
            Action::Create(_) => "create",
            Action::SelfDestruct(_) => "suicide",
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Action::Create(_))
    }

    pub fn is_selfdestruct(&self) -> bool {
        matches!(self, Action::SelfDestruct(_))
    }
}

/// Successful result of a traced frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionResult {
    /// Message call result
    Call { gas_used: u64, output: Bytes },
    /// Contract creation result
    Create {
        gas_used: u64,
        address: Option<Address>,
        code: Bytes,
    },
    /// Self-destructs carry no result payload
    SelfDestruct,
}

impl ActionResult {
    pub fn gas_used(&self) -> u64 {
        match self {
            ActionResult::Call { gas_used, .. } | ActionResult::Create { gas_used, .. } => {
                *gas_used
            }
            ActionResult::SelfDestruct => 0,
        }
    }
}

/// Final state of a closed trace node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success(ActionResult),
    Failure(String),
}

/// One call, create or selfdestruct occurrence
///
/// A node is open while `outcome` is `None`. Closing it always sets exactly
/// one of result or error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceNode {
    pub action: Action,
    pub outcome: Option<Outcome>,
    /// Position in the call tree, empty for the root
    pub trace_address: Vec<u32>,
    /// Number of direct children
    pub subtraces: u32,
}

impl TraceNode {
    /// Creates an open node at the given position
    pub fn new(action: Action, trace_address: Vec<u32>) -> Self {
        Self {
            action,
            outcome: None,
            trace_address,
            subtraces: 0,
        }
    }

    pub fn result(&self) -> Option<&ActionResult> {
        match &self.outcome {
            Some(Outcome::Success(result)) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failure(error)) => Some(error),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Per-transaction identifiers stamped on every rendered trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TxContext {
    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_position: u64,
}

/// All trace nodes of one transaction, in discovery (preorder) order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSet {
    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_position: u64,
    pub traces: Vec<TraceNode>,
}

impl TraceSet {
    /// Creates an empty trace set for the given transaction
    pub fn new(ctx: TxContext) -> Self {
        Self {
            block_hash: ctx.block_hash,
            block_number: ctx.block_number,
            transaction_hash: ctx.transaction_hash,
            transaction_position: ctx.transaction_position,
            traces: Vec::new(),
        }
    }

    pub fn context(&self) -> TxContext {
        TxContext {
            block_hash: self.block_hash,
            block_number: self.block_number,
            transaction_hash: self.transaction_hash,
            transaction_position: self.transaction_position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

/// Kind of frame announced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Call(CallKind),
    Create,
    SelfDestruct,
}

/// Frame description carried by `start`/`enter` events
///
/// For creations `to` is the new contract address when the engine already
/// knows it. For self-destructs `from` is the destroyed contract, `to` the
/// beneficiary and `value` the transferred balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub kind: FrameKind,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub gas: u64,
    pub value: U256,
}

impl CallFrame {
    /// Message call frame
    pub fn call(kind: CallKind, from: Address, to: Address, input: Bytes, gas: u64, value: U256) -> Self {
        Self {
            kind: FrameKind::Call(kind),
            from,
            to: Some(to),
            input,
            gas,
            value,
        }
    }

    /// Contract creation frame
    pub fn create(from: Address, address: Option<Address>, init: Bytes, gas: u64, value: U256) -> Self {
        Self {
            kind: FrameKind::Create,
            from,
            to: address,
            input: init,
            gas,
            value,
        }
    }

    /// Self-destruct frame
    pub fn selfdestruct(contract: Address, beneficiary: Address, balance: U256) -> Self {
        Self {
            kind: FrameKind::SelfDestruct,
            from: contract,
            to: Some(beneficiary),
            input: Bytes::new(),
            gas: 0,
            value: balance,
        }
    }

    /// Converts the frame into the action recorded on the trace node
    pub fn into_action(self) -> Action {
        match self.kind {
            FrameKind::Call(call_type) => Action::Call(CallAction {
                call_type,
                from: self.from,
                to: self.to.unwrap_or_default(),
                value: self.value,
                gas: self.gas,
                input: self.input,
            }),
            FrameKind::Create => Action::Create(CreateAction {
                from: self.from,
                value: self.value,
                gas: self.gas,
                init: self.input,
                address: self.to,
            }),
            FrameKind::SelfDestruct => Action::SelfDestruct(SelfDestructAction {
                address: self.from,
                refund_address: self.to.unwrap_or_default(),
                balance: self.value,
            }),
        }
    }
}

/// Frame completion carried by `exit` events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameExit {
    /// Return data, or deployed code for creations
    pub output: Bytes,
    pub gas_used: u64,
    /// Failure message if the frame failed
    pub error: Option<String>,
    /// Created contract address, for engines that learn it only at exit
    pub created: Option<Address>,
}

impl FrameExit {
    /// Successful completion
    pub fn success(output: Bytes, gas_used: u64) -> Self {
        Self {
            output,
            gas_used,
            error: None,
            created: None,
        }
    }

    /// Failed completion
    pub fn failure(error: impl Into<String>, gas_used: u64) -> Self {
        Self {
            output: Bytes::new(),
            gas_used,
            error: Some(error.into()),
            created: None,
        }
    }

    /// Attaches the created contract address
    pub fn with_created(mut self, address: Address) -> Self {
        self.created = Some(address);
        self
    }
}
