//! Synthesis of frames rejected before they start
//!
//! Some engines reject a call-like opcode during its cheap pre-checks and
//! never announce a frame for it. This module detects those rejections from
//! the opcode step and replays them as an `enter` immediately followed by a
//! failing `exit`, so the builder records them like any other failed call.
//!
//! Checks run in a fixed order and the first failure wins:
//! 1. Error already raised by the engine
//! 2. Call depth limit
//! 3. Balance for the value transfer
//! 4. Sender nonce overflow (creations only)
//! 5. Address collision at the new contract address (creations only)

use crate::traits::{CallTracer, ExecutionScope, OpcodeStep, StateQuery};
use crate::tracer::scope::{memory_operand, stack_peek};
use crate::types::{Address, CallFrame, CallKind, FrameExit, B256, U256};
use revm::bytecode::opcode;
use thiserror::Error;
use tracing::debug;

/// Reason a call-like opcode was rejected before execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightFailure {
    /// Error the engine attached to the step
    #[error("{0}")]
    Upstream(String),

    #[error("max call depth exceeded")]
    DepthLimit,

    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    #[error("nonce uint64 overflow")]
    NonceOverflow,

    #[error("contract address collision")]
    AddressCollision,
}

/// Frame the engine would have entered, together with why it did not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFrame {
    pub frame: CallFrame,
    pub failure: PreflightFailure,
}

/// Inspects a step and reports a rejected frame, if any
///
/// Returns `None` for steps without scope access, for opcodes that are not
/// call-like, and when every check passes.
pub fn detect(step: &OpcodeStep<'_>, max_call_depth: usize) -> Option<RejectedFrame> {
    let (scope, state) = (step.scope?, step.state?);
    match step.opcode {
        opcode::CREATE | opcode::CREATE2 => detect_create(step, scope, state, max_call_depth),
        opcode::CALL | opcode::CALLCODE => {
            let kind = if step.opcode == opcode::CALL {
                CallKind::Call
            } else {
                CallKind::CallCode
            };
            let from = scope.contract_address();
            let value = stack_peek(scope, 2);
            let failure = upstream(step)
                .or_else(|| depth_limit(step, max_call_depth))
                .or_else(|| insufficient_balance(state, from, value))?;
            let frame = CallFrame::call(
                kind,
                from,
                word_to_address(stack_peek(scope, 1)),
                memory_operand(scope, 3, 4),
                step.gas,
                value,
            );
            Some(RejectedFrame { frame, failure })
        }
        opcode::DELEGATECALL | opcode::STATICCALL => {
            let kind = if step.opcode == opcode::DELEGATECALL {
                CallKind::DelegateCall
            } else {
                CallKind::StaticCall
            };
            let failure = upstream(step).or_else(|| depth_limit(step, max_call_depth))?;
            let frame = CallFrame::call(
                kind,
                scope.contract_address(),
                word_to_address(stack_peek(scope, 1)),
                memory_operand(scope, 2, 3),
                step.gas,
                U256::ZERO,
            );
            Some(RejectedFrame { frame, failure })
        }
        _ => None,
    }
}

fn detect_create(
    step: &OpcodeStep<'_>,
    scope: &dyn ExecutionScope,
    state: &dyn StateQuery,
    max_call_depth: usize,
) -> Option<RejectedFrame> {
    let from = scope.contract_address();
    let value = stack_peek(scope, 0);
    let init = memory_operand(scope, 1, 2);

    // The new address is only known once the collision check is reached
    let (failure, address) = match upstream(step)
        .or_else(|| depth_limit(step, max_call_depth))
        .or_else(|| insufficient_balance(state, from, value))
    {
        Some(failure) => (failure, None),
        None => {
            let nonce = state.nonce(from);
            if nonce == u64::MAX {
                (PreflightFailure::NonceOverflow, None)
            } else {
                let address = if step.opcode == opcode::CREATE2 {
                    from.create2_from_code(B256::from(stack_peek(scope, 3)), &init)
                } else {
                    from.create(nonce)
                };
                if !state.is_occupied(address) {
                    return None;
                }
                (PreflightFailure::AddressCollision, Some(address))
            }
        }
    };

    let frame = CallFrame::create(from, address, init, step.gas, value);
    Some(RejectedFrame { frame, failure })
}

/// Replays a rejected frame as an enter/exit pair on `tracer`
pub fn synthesize<T: CallTracer + ?Sized>(tracer: &mut T, rejected: RejectedFrame) {
    debug!(
        failure = %rejected.failure,
        from = %rejected.frame.from,
        "Synthesizing frame rejected before execution"
    );
    tracer.enter(rejected.frame);
    tracer.exit(FrameExit::failure(rejected.failure.to_string(), 0));
}

fn upstream(step: &OpcodeStep<'_>) -> Option<PreflightFailure> {
    step.error.map(|error| PreflightFailure::Upstream(error.to_string()))
}

fn depth_limit(step: &OpcodeStep<'_>, max_call_depth: usize) -> Option<PreflightFailure> {
    (step.depth > max_call_depth).then_some(PreflightFailure::DepthLimit)
}

fn insufficient_balance(state: &dyn StateQuery, from: Address, value: U256) -> Option<PreflightFailure> {
    (!value.is_zero() && !state.can_transfer(from, value)).then_some(PreflightFailure::InsufficientBalance)
}

fn word_to_address(word: U256) -> Address {
    Address::from_word(B256::from(word))
}
