//! Descriptive API form of a trace set
//!
//! Renders trace nodes as Parity/OpenEthereum `trace_*` entries. Addresses
//! and hashes are fixed-width hex, gas and byte strings are `0x` hex, and
//! every entry repeats the transaction identifiers.

use crate::types::{Action, ActionResult, Address, Bytes, Outcome, TraceNode, TraceSet, TxContext, B256, U256};
use serde::{Deserialize, Serialize};

/// One rendered trace entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrace {
    pub action: ApiAction,
    pub block_hash: B256,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ApiResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub subtraces: u32,
    pub trace_address: Vec<u32>,
    pub transaction_hash: B256,
    pub transaction_position: u64,
    /// `call`, `create` or `suicide`
    #[serde(rename = "type")]
    pub trace_type: String,
}

/// Rendered action
///
/// `from` and `value` are rendered as `null` for self-destructs; the other
/// optional fields are omitted when they do not apply to the kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub value: Option<U256>,
    #[serde(with = "alloy_serde::quantity")]
    pub gas: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Renders every node of `set`, in order
pub fn to_api_traces(set: &TraceSet) -> Vec<ApiTrace> {
    let ctx = set.context();
    set.traces.iter().map(|node| ApiTrace::from_node(node, &ctx)).collect()
}

impl ApiTrace {
    /// Renders a single node within its transaction
    pub fn from_node(node: &TraceNode, ctx: &TxContext) -> Self {
        let (result, error) = match &node.outcome {
            Some(Outcome::Success(result)) => (ApiResult::from_result(result), None),
            Some(Outcome::Failure(error)) => (None, Some(error.clone())),
            None => (None, None),
        };
        let trace_type = match node.action {
            Action::Call(_) => "call",
            Action::Create(_) => "create",
            Action::SelfDestruct(_) => "suicide",
        };
        Self {
            action: ApiAction::from(&node.action),
            block_hash: ctx.block_hash,
            block_number: ctx.block_number,
            result,
            error,
            subtraces: node.subtraces,
            trace_address: node.trace_address.clone(),
            transaction_hash: ctx.transaction_hash,
            transaction_position: ctx.transaction_position,
            trace_type: trace_type.to_string(),
        }
    }
}

impl ApiResult {
    /// Self-destructs have no result payload
    fn from_result(result: &ActionResult) -> Option<Self> {
        match result {
            ActionResult::Call { gas_used, output } => Some(Self {
                gas_used: *gas_used,
                output: Some(output.clone()),
                code: None,
                address: None,
            }),
            ActionResult::Create {
                gas_used,
                address,
                code,
            } => Some(Self {
                gas_used: *gas_used,
                output: None,
                code: Some(code.clone()),
                address: *address,
            }),
            ActionResult::SelfDestruct => None,
        }
    }
}

impl From<&Action> for ApiAction {
    fn from(action: &Action) -> Self {
        let empty = ApiAction {
            call_type: None,
            from: None,
            to: None,
            value: None,
            gas: 0,
            init: None,
            input: None,
            address: None,
            refund_address: None,
            balance: None,
        };
        match action {
            Action::Call(call) => ApiAction {
                call_type: Some(call.call_type.as_str().to_string()),
                from: Some(call.from),
                to: Some(call.to),
                value: Some(call.value),
                gas: call.gas,
                input: Some(call.input.clone()),
                ..empty
            },
            Action::Create(create) => ApiAction {
                from: Some(create.from),
                value: Some(create.value),
                gas: create.gas,
                init: Some(create.init.clone()),
                ..empty
            },
            Action::SelfDestruct(destruct) => ApiAction {
                address: Some(destruct.address),
                refund_address: Some(destruct.refund_address),
                balance: Some(destruct.balance),
                ..empty
            },
        }
    }
}
