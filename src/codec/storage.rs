//! Compact persisted form of a trace set
//!
//! Traces are stored as RLP. Every optional field is wrapped in [`Maybe`],
//! an RLP list holding zero or one item, so an absent value never collides
//! with a zero value. The node kind is a single tag byte.

use crate::errors::CodecError;
use crate::types::{
    Action, ActionResult, Address, Bytes, CallAction, CallKind, CreateAction, Outcome,
    SelfDestructAction, TraceNode, TraceSet, B256, U256,
};
use alloy_rlp::{length_of_length, BufMut, Decodable, Encodable, Header, RlpDecodable, RlpEncodable};

pub const KIND_CREATE: u8 = 0;
pub const KIND_CALL: u8 = 1;
pub const KIND_CALLCODE: u8 = 2;
pub const KIND_DELEGATECALL: u8 = 3;
pub const KIND_STATICCALL: u8 = 4;
pub const KIND_SELFDESTRUCT: u8 = 5;

/// Optional value with an explicit absent marker
///
/// Encoded as an RLP list: empty when absent, one item when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maybe<T>(pub Option<T>);

impl<T> Maybe<T> {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn some(value: T) -> Self {
        Self(Some(value))
    }

    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T: Encodable> Maybe<T> {
    fn payload_length(&self) -> usize {
        self.0.as_ref().map_or(0, Encodable::length)
    }
}

impl<T: Encodable> Encodable for Maybe<T> {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        if let Some(value) = &self.0 {
            value.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl<T: Decodable> Decodable for Maybe<T> {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if header.payload_length == 0 {
            return Ok(Self(None));
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let mut payload = &buf[..header.payload_length];
        let value = T::decode(&mut payload)?;
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - payload.len(),
            });
        }
        *buf = &buf[header.payload_length..];
        Ok(Self(Some(value)))
    }
}

/// Stored action; which fields are set depends on `call_type`
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StoredAction {
    pub call_type: u8,
    pub from: Maybe<Address>,
    pub to: Maybe<Address>,
    pub value: Maybe<U256>,
    pub gas: u64,
    pub init: Bytes,
    pub input: Bytes,
    /// Destroyed contract for self-destructs, new contract for creations
    pub address: Maybe<Address>,
    pub refund_address: Maybe<Address>,
    pub balance: Maybe<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StoredResult {
    pub gas_used: u64,
    pub output: Bytes,
    pub code: Bytes,
    pub address: Maybe<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StoredTrace {
    pub action: StoredAction,
    pub result: Maybe<StoredResult>,
    pub error: Maybe<String>,
    pub trace_address: Vec<u32>,
    pub subtraces: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StoredTraceSet {
    pub traces: Vec<StoredTrace>,
    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_position: u64,
}

/// Encodes a trace set into its persisted form
pub fn encode_storage(set: &TraceSet) -> Vec<u8> {
    let stored = StoredTraceSet {
        traces: set.traces.iter().map(StoredTrace::from).collect(),
        block_hash: set.block_hash,
        block_number: set.block_number,
        transaction_hash: set.transaction_hash,
        transaction_position: set.transaction_position,
    };
    alloy_rlp::encode(&stored)
}

/// Decodes a persisted trace set
pub fn decode_storage(mut buf: &[u8]) -> Result<TraceSet, CodecError> {
    let stored = StoredTraceSet::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(CodecError::TrailingBytes(buf.len()));
    }
    Ok(TraceSet {
        block_hash: stored.block_hash,
        block_number: stored.block_number,
        transaction_hash: stored.transaction_hash,
        transaction_position: stored.transaction_position,
        traces: stored
            .traces
            .into_iter()
            .map(TraceNode::try_from)
            .collect::<Result<_, _>>()?,
    })
}

fn call_kind_tag(kind: CallKind) -> u8 {
    match kind {
        CallKind::Call => KIND_CALL,
        CallKind::CallCode => KIND_CALLCODE,
        CallKind::DelegateCall => KIND_DELEGATECALL,
        CallKind::StaticCall => KIND_STATICCALL,
    }
}

impl From<&Action> for StoredAction {
    fn from(action: &Action) -> Self {
        let empty = StoredAction {
            call_type: KIND_CALL,
            from: Maybe::none(),
            to: Maybe::none(),
            value: Maybe::none(),
            gas: 0,
            init: Bytes::new(),
            input: Bytes::new(),
            address: Maybe::none(),
            refund_address: Maybe::none(),
            balance: Maybe::none(),
        };
        match action {
            Action::Call(call) => StoredAction {
                call_type: call_kind_tag(call.call_type),
                from: Maybe::some(call.from),
                to: Maybe::some(call.to),
                value: Maybe::some(call.value),
                gas: call.gas,
                input: call.input.clone(),
                ..empty
            },
            Action::Create(create) => StoredAction {
                call_type: KIND_CREATE,
                from: Maybe::some(create.from),
                value: Maybe::some(create.value),
                gas: create.gas,
                init: create.init.clone(),
                address: create.address.into(),
                ..empty
            },
            Action::SelfDestruct(destruct) => StoredAction {
                call_type: KIND_SELFDESTRUCT,
                address: Maybe::some(destruct.address),
                refund_address: Maybe::some(destruct.refund_address),
                balance: Maybe::some(destruct.balance),
                ..empty
            },
        }
    }
}

impl From<&ActionResult> for StoredResult {
    fn from(result: &ActionResult) -> Self {
        match result {
            ActionResult::Call { gas_used, output } => StoredResult {
                gas_used: *gas_used,
                output: output.clone(),
                code: Bytes::new(),
                address: Maybe::none(),
            },
            ActionResult::Create {
                gas_used,
                address,
                code,
            } => StoredResult {
                gas_used: *gas_used,
                output: Bytes::new(),
                code: code.clone(),
                address: (*address).into(),
            },
            // present but empty, so a finished self-destruct is not read back as open
            ActionResult::SelfDestruct => StoredResult {
                gas_used: 0,
                output: Bytes::new(),
                code: Bytes::new(),
                address: Maybe::none(),
            },
        }
    }
}

impl From<&TraceNode> for StoredTrace {
    fn from(node: &TraceNode) -> Self {
        let (result, error) = match &node.outcome {
            Some(Outcome::Success(result)) => (Maybe::some(StoredResult::from(result)), Maybe::none()),
            Some(Outcome::Failure(error)) => (Maybe::none(), Maybe::some(error.clone())),
            None => (Maybe::none(), Maybe::none()),
        };
        StoredTrace {
            action: StoredAction::from(&node.action),
            result,
            error,
            trace_address: node.trace_address.clone(),
            subtraces: node.subtraces,
        }
    }
}

fn required<T>(value: Maybe<T>, kind: &'static str, field: &'static str) -> Result<T, CodecError> {
    value.into_inner().ok_or(CodecError::MissingField { kind, field })
}

impl TryFrom<StoredAction> for Action {
    type Error = CodecError;

    fn try_from(stored: StoredAction) -> Result<Self, Self::Error> {
        let call_type = match stored.call_type {
            KIND_CREATE => {
                return Ok(Action::Create(CreateAction {
                    from: required(stored.from, "create", "from")?,
                    value: stored.value.into_inner().unwrap_or_default(),
                    gas: stored.gas,
                    init: stored.init,
                    address: stored.address.into_inner(),
                }))
            }
            KIND_SELFDESTRUCT => {
                return Ok(Action::SelfDestruct(SelfDestructAction {
                    address: required(stored.address, "suicide", "address")?,
                    refund_address: required(stored.refund_address, "suicide", "refundAddress")?,
                    balance: stored.balance.into_inner().unwrap_or_default(),
                }))
            }
            KIND_CALL => CallKind::Call,
            KIND_CALLCODE => CallKind::CallCode,
            KIND_DELEGATECALL => CallKind::DelegateCall,
            KIND_STATICCALL => CallKind::StaticCall,
            other => return Err(CodecError::UnknownKind(other)),
        };
        let kind = call_type.as_str();
        Ok(Action::Call(CallAction {
            call_type,
            from: required(stored.from, kind, "from")?,
            to: required(stored.to, kind, "to")?,
            value: stored.value.into_inner().unwrap_or_default(),
            gas: stored.gas,
            input: stored.input,
        }))
    }
}

impl TryFrom<StoredTrace> for TraceNode {
    type Error = CodecError;

    fn try_from(stored: StoredTrace) -> Result<Self, Self::Error> {
        let action = Action::try_from(stored.action)?;
        let outcome = match (stored.result.into_inner(), stored.error.into_inner()) {
            (_, Some(error)) => Some(Outcome::Failure(error)),
            (Some(result), None) => Some(Outcome::Success(match &action {
                Action::Call(_) => ActionResult::Call {
                    gas_used: result.gas_used,
                    output: result.output,
                },
                Action::Create(_) => ActionResult::Create {
                    gas_used: result.gas_used,
                    address: result.address.into_inner(),
                    code: result.code,
                },
                Action::SelfDestruct(_) => ActionResult::SelfDestruct,
            })),
            (None, None) => None,
        };
        Ok(TraceNode {
            action,
            outcome,
            trace_address: stored.trace_address,
            subtraces: stored.subtraces,
        })
    }
}
