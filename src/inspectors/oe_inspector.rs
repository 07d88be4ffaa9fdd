//! revm binding for the trace builders
//!
//! [`OeInspector`] implements revm's `Inspector` hooks and forwards them to
//! any [`CallTracer`] as `start`/`enter`/`exit`/`opcode` events:
//! - `call`/`create` open a frame (the first one opens the root)
//! - `call_end`/`create_end` close it, mapping the instruction result to an
//!   error message
//! - `selfdestruct` is recorded as an immediately closed frame
//! - `step` reports every opcode, so `REVERT` reaches the builder
//!
//! revm already runs its pre-checks (depth, balance, nonce, collision) inside
//! a `call`/`call_end` pair, so opcode steps are forwarded without a scope and
//! no frames are synthesized.

use crate::errors::EXECUTION_REVERTED;
use crate::traits::{CallTracer, OpcodeStep, Reset, TraceOutput};
use crate::tracer::PreflightFailure;
use crate::types::{CallFrame, CallKind, FrameExit, TxContext};
use alloy::primitives::{Address, U256};
use revm::{
    context::ContextTr,
    context_interface::result::HaltReason,
    interpreter::{
        interpreter_types::{Jumps, LoopControl},
        CallInputs, CallOutcome, CallScheme, CreateInputs, CreateOutcome,
        InstructionResult, Interpreter, InterpreterTypes, SuccessOrHalt,
    },
    Inspector,
};

/// revm inspector driving a trace builder
#[derive(Debug, Clone, Default)]
pub struct OeInspector<T> {
    tracer: T,
    /// Number of frames currently open
    depth: usize,
}

impl<T: CallTracer> OeInspector<T> {
    pub fn new(tracer: T) -> Self {
        Self { tracer, depth: 0 }
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut T {
        &mut self.tracer
    }

    /// Consumes the inspector and returns the wrapped builder
    pub fn into_tracer(self) -> T {
        self.tracer
    }

    /// Opens a frame, as the root if nothing is open yet
    pub fn open_frame(&mut self, frame: CallFrame) {
        if self.depth == 0 {
            self.tracer.start(frame);
        } else {
            self.tracer.enter(frame);
        }
        self.depth += 1;
    }

    /// Closes the innermost frame with the engine's instruction result
    pub fn close_frame(&mut self, result: InstructionResult, exit: FrameExit) {
        let exit = match error_message(result) {
            Some(error) => FrameExit {
                error: Some(error),
                ..exit
            },
            None => exit,
        };
        self.depth = self.depth.saturating_sub(1);
        self.tracer.exit(exit);
    }

    /// Records a self-destruct of `contract` in favour of `target`
    pub fn record_selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        self.open_frame(CallFrame::selfdestruct(contract, target, value));
        self.close_frame(InstructionResult::SelfDestruct, FrameExit::default());
    }
}

/// Maps a revm instruction result to the trace error message
///
/// Returns `None` for successful results.
pub fn error_message(result: InstructionResult) -> Option<String> {
    match SuccessOrHalt::<HaltReason>::from(result) {
        SuccessOrHalt::Success(_) | SuccessOrHalt::Internal(_) => None,
        SuccessOrHalt::Revert => Some(EXECUTION_REVERTED.to_string()),
        SuccessOrHalt::Halt(reason) => Some(halt_message(reason)),
        SuccessOrHalt::FatalExternalError => Some("fatal external error".to_string()),
    }
}

fn halt_message(reason: HaltReason) -> String {
    let message = match reason {
        HaltReason::CallTooDeep => return PreflightFailure::DepthLimit.to_string(),
        HaltReason::OutOfFunds => return PreflightFailure::InsufficientBalance.to_string(),
        HaltReason::NonceOverflow => return PreflightFailure::NonceOverflow.to_string(),
        HaltReason::CreateCollision => return PreflightFailure::AddressCollision.to_string(),
        HaltReason::OutOfGas(_) => "out of gas",
        HaltReason::OpcodeNotFound | HaltReason::InvalidFEOpcode => "invalid opcode",
        HaltReason::InvalidJump => "invalid jump destination",
        HaltReason::StackUnderflow => "stack underflow",
        HaltReason::StackOverflow => "stack overflow",
        HaltReason::OutOfOffset => "return data out of bounds",
        HaltReason::StateChangeDuringStaticCall | HaltReason::CallNotAllowedInsideStatic => {
            "write protection"
        }
        HaltReason::CreateContractSizeLimit => "max code size exceeded",
        HaltReason::CreateContractStartingWithEF => "invalid code: must not begin with 0xef",
        HaltReason::CreateInitCodeSizeLimit => "max initcode size exceeded",
        other => return format!("{other:?}"),
    };
    message.to_string()
}

fn call_kind(scheme: CallScheme) -> CallKind {
    match scheme {
        CallScheme::CallCode => CallKind::CallCode,
        CallScheme::DelegateCall => CallKind::DelegateCall,
        CallScheme::StaticCall => CallKind::StaticCall,
        _ => CallKind::Call,
    }
}

impl<CTX, INTR, T> Inspector<CTX, INTR> for OeInspector<T>
where
    CTX: ContextTr,
    INTR: InterpreterTypes,
    T: CallTracer,
{
    fn step(&mut self, interp: &mut Interpreter<INTR>, _context: &mut CTX) {
        let step = OpcodeStep::new(
            interp.bytecode.pc() as u64,
            interp.bytecode.opcode(),
            interp.control.gas().remaining(),
            self.depth,
        );
        self.tracer.opcode(&step);
    }

    /// Delegate calls run in the caller's context: the frame is attributed to
    /// the contract issuing it and targets the code address
    fn call(&mut self, context: &mut CTX, inputs: &mut CallInputs) -> Option<CallOutcome> {
        let kind = call_kind(inputs.scheme);
        let (from, to, value) = match kind {
            CallKind::DelegateCall => (inputs.target_address, inputs.bytecode_address, U256::ZERO),
            CallKind::CallCode => (inputs.caller, inputs.bytecode_address, inputs.call_value()),
            CallKind::StaticCall => (inputs.caller, inputs.target_address, U256::ZERO),
            CallKind::Call => (inputs.caller, inputs.target_address, inputs.call_value()),
        };
        let input = inputs.input.bytes(context);
        self.open_frame(CallFrame::call(kind, from, to, input, inputs.gas_limit, value));
        None
    }

    fn call_end(&mut self, _context: &mut CTX, _inputs: &CallInputs, outcome: &mut CallOutcome) {
        self.close_frame(
            outcome.result.result,
            FrameExit::success(outcome.result.output.clone(), outcome.result.gas.spent()),
        );
    }

    fn create(&mut self, _context: &mut CTX, inputs: &mut CreateInputs) -> Option<CreateOutcome> {
        self.open_frame(CallFrame::create(
            inputs.caller,
            None,
            inputs.init_code.clone(),
            inputs.gas_limit,
            inputs.value,
        ));
        None
    }

    fn create_end(&mut self, _context: &mut CTX, _inputs: &CreateInputs, outcome: &mut CreateOutcome) {
        let mut exit = FrameExit::success(outcome.result.output.clone(), outcome.result.gas.spent());
        if let Some(address) = outcome.address {
            exit = exit.with_created(address);
        }
        self.close_frame(outcome.result.result, exit);
    }

    fn selfdestruct(&mut self, contract: Address, target: Address, value: U256) {
        self.record_selfdestruct(contract, target, value);
    }
}

impl<T: Reset> Reset for OeInspector<T> {
    fn reset(&mut self, ctx: TxContext) {
        self.tracer.reset(ctx);
        self.depth = 0;
    }
}

impl<T: TraceOutput> TraceOutput for OeInspector<T> {
    type Output = T::Output;

    fn get_output(&self) -> Self::Output {
        self.tracer.get_output()
    }
}
