//! Streaming trace builder
//!
//! Builds the flat, preorder trace list in a single pass over the engine's
//! event stream. Open frames live on an explicit stack of indices into the
//! output list; a node is appended to the output as soon as it is entered,
//! so in-flight state is observable at any point.

use crate::config::TracerConfig;
use crate::errors::EXECUTION_REVERTED;
use crate::traits::{CallTracer, OpcodeStep, Reset, TraceOutput};
use crate::tracer::{address, preflight};
use crate::types::{
    Action, ActionResult, Bytes, CallFrame, FrameExit, Outcome, TraceNode, TraceSet, TxContext,
};
use revm::bytecode::opcode;
use tracing::warn;

/// Single-pass, stack-based trace builder
#[derive(Debug, Clone, Default)]
pub struct StackTracer {
    config: TracerConfig,
    /// Sealed output, in discovery order
    output: TraceSet,
    /// Indices into `output.traces` of the open frames, innermost last
    open: Vec<usize>,
}

impl StackTracer {
    /// Creates a tracer for one transaction with default configuration
    pub fn new(ctx: TxContext) -> Self {
        Self::with_config(ctx, TracerConfig::default())
    }

    pub fn with_config(ctx: TxContext, config: TracerConfig) -> Self {
        Self {
            config,
            output: TraceSet::new(ctx),
            open: Vec::new(),
        }
    }

    /// Trace nodes discovered so far, closed or not
    pub fn traces(&self) -> &[TraceNode] {
        &self.output.traces
    }

    /// Number of frames currently open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Consumes the tracer and returns the trace set
    pub fn into_trace_set(self) -> TraceSet {
        self.output
    }

    /// Marks the innermost open frame as reverted, discarding any result
    pub fn revert(&mut self) {
        match self.open.last() {
            Some(&index) => {
                self.output.traces[index].outcome = Some(Outcome::Failure(EXECUTION_REVERTED.to_string()));
            }
            None => warn!("REVERT observed with no open frame"),
        }
    }

    fn push(&mut self, frame: CallFrame) {
        let trace_address = match self.open.last() {
            Some(&index) => address::allocate(Some(&mut self.output.traces[index])),
            None => address::allocate(None),
        };
        self.output.traces.push(TraceNode::new(frame.into_action(), trace_address));
        self.open.push(self.output.traces.len() - 1);
    }
}

impl CallTracer for StackTracer {
    fn start(&mut self, frame: CallFrame) {
        self.push(frame);
    }

    fn enter(&mut self, frame: CallFrame) {
        self.push(frame);
    }

    fn exit(&mut self, exit: FrameExit) {
        let Some(index) = self.open.pop() else {
            panic!("exit event without a matching enter");
        };
        close_node(&mut self.output.traces[index], exit);
    }

    fn opcode(&mut self, step: &OpcodeStep<'_>) {
        if step.opcode == opcode::REVERT {
            self.revert();
            return;
        }
        if self.config.synthesize_preflight {
            if let Some(rejected) = preflight::detect(step, self.config.max_call_depth) {
                preflight::synthesize(self, rejected);
            }
        }
    }
}

/// Attaches the exit outcome to a node
///
/// An error recorded while the frame was running (REVERT) takes precedence
/// over whatever the exit reports.
fn close_node(node: &mut TraceNode, exit: FrameExit) {
    if let (Some(created), Action::Create(create)) = (exit.created, &mut node.action) {
        create.address = Some(created);
    }
    if matches!(node.outcome, Some(Outcome::Failure(_))) {
        return;
    }
    node.outcome = Some(match exit.error {
        Some(error) => Outcome::Failure(error),
        None => Outcome::Success(success_result(&node.action, exit.output, exit.gas_used)),
    });
}

fn success_result(action: &Action, output: Bytes, gas_used: u64) -> ActionResult {
    match action {
        Action::Call(_) => ActionResult::Call { gas_used, output },
        Action::Create(create) => ActionResult::Create {
            gas_used,
            address: create.address,
            code: output,
        },
        Action::SelfDestruct(_) => ActionResult::SelfDestruct,
    }
}

impl Reset for StackTracer {
    fn reset(&mut self, ctx: TxContext) {
        self.output = TraceSet::new(ctx);
        self.open = Vec::new();
    }
}

impl TraceOutput for StackTracer {
    type Output = TraceSet;

    fn get_output(&self) -> Self::Output {
        self.output.clone()
    }
}
