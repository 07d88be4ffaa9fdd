//! Tree-first trace builder
//!
//! Frames are linked parent to children as they are discovered. Once the
//! root frame closes, a flattening pass walks the tree in preorder, fills in
//! subtrace counts from the final child lists and re-attributes gas top-down:
//! - A child with a result gets `parent.gas - child.gas_used`, or its own
//!   `gas_used` when that difference would not be positive
//! - Self-destructs get no gas and no result payload
//!
//! A per-depth marker travels alongside the open-frame stack and tells the
//! exit handler whether the frame is a creation (fill `code`) or a call
//! (fill `output`), and whether a `REVERT` was observed in it.

use crate::config::TracerConfig;
use crate::errors::EXECUTION_REVERTED;
use crate::traits::{CallTracer, OpcodeStep, Reset, TraceOutput};
use crate::tracer::{address, preflight};
use crate::types::{
    Action, ActionResult, CallFrame, FrameExit, FrameKind, Outcome, TraceNode, TraceSet, TxContext,
};
use revm::bytecode::opcode;
use tracing::warn;

/// Tree node: a trace node plus arena indices of its direct children
#[derive(Debug, Clone)]
struct TreeNode {
    node: TraceNode,
    children: Vec<usize>,
}

/// Per-depth state pushed alongside each open frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DepthMarker {
    level: usize,
    is_create: bool,
    reverted: bool,
}

/// Tree-building trace builder with post-hoc gas redistribution
#[derive(Debug, Clone, Default)]
pub struct TreeTracer {
    config: TracerConfig,
    arena: Vec<TreeNode>,
    root: Option<usize>,
    /// Arena indices of the open frames, innermost last
    open: Vec<usize>,
    markers: Vec<DepthMarker>,
    /// Flattened output, filled when the root closes
    output: TraceSet,
}

impl TreeTracer {
    /// Creates a tracer for one transaction with default configuration
    pub fn new(ctx: TxContext) -> Self {
        Self::with_config(ctx, TracerConfig::default())
    }

    pub fn with_config(ctx: TxContext, config: TracerConfig) -> Self {
        Self {
            config,
            output: TraceSet::new(ctx),
            ..Default::default()
        }
    }

    /// Flattened traces; empty until the root frame has closed
    pub fn traces(&self) -> &[TraceNode] {
        &self.output.traces
    }

    /// Whether the root frame has closed and the tree was flattened
    pub fn is_finished(&self) -> bool {
        self.root.is_some() && self.open.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Consumes the tracer and returns the trace set
    pub fn into_trace_set(self) -> TraceSet {
        self.output
    }

    /// Flags the innermost open frame as reverted
    pub fn revert(&mut self) {
        match self.markers.last_mut() {
            Some(marker) => marker.reverted = true,
            None => warn!("REVERT observed with no open frame"),
        }
    }

    fn push(&mut self, frame: CallFrame) {
        let is_create = frame.kind == FrameKind::Create;
        let parent = self.open.last().copied();
        let trace_address = match parent {
            Some(index) => address::allocate(Some(&mut self.arena[index].node)),
            None => address::allocate(None),
        };

        let index = self.arena.len();
        self.arena.push(TreeNode {
            node: TraceNode::new(frame.into_action(), trace_address),
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.arena[parent].children.push(index),
            None => self.root = Some(index),
        }
        self.open.push(index);
        self.markers.push(DepthMarker {
            level: self.open.len(),
            is_create,
            reverted: false,
        });
    }

    /// Builds the flat preorder list from the finished tree
    fn flatten(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let mut flat = Vec::with_capacity(self.arena.len());
        self.arena[root].node.subtraces = self.arena[root].children.len() as u32;
        flat.push(self.arena[root].node.clone());
        self.flatten_children(root, &mut flat);
        self.output.traces = flat;
    }

    fn flatten_children(&mut self, parent: usize, flat: &mut Vec<TraceNode>) {
        let parent_gas = self.arena[parent].node.action.gas();
        for position in 0..self.arena[parent].children.len() {
            let child = self.arena[parent].children[position];
            let subtraces = self.arena[child].children.len() as u32;

            let node = &mut self.arena[child].node;
            node.subtraces = subtraces;
            if let Some(gas_used) = node.result().map(ActionResult::gas_used) {
                let gas = if parent_gas > gas_used {
                    parent_gas - gas_used
                } else {
                    gas_used
                };
                node.action.set_gas(gas);
            }
            if node.action.is_selfdestruct() {
                node.action.set_gas(0);
                if node.result().is_some() {
                    node.outcome = Some(Outcome::Success(ActionResult::SelfDestruct));
                }
            }

            flat.push(node.clone());
            self.flatten_children(child, flat);
        }
    }
}

impl CallTracer for TreeTracer {
    fn start(&mut self, frame: CallFrame) {
        self.push(frame);
    }

    fn enter(&mut self, frame: CallFrame) {
        self.push(frame);
    }

    fn exit(&mut self, exit: FrameExit) {
        let (Some(index), Some(marker)) = (self.open.pop(), self.markers.pop()) else {
            panic!("exit event without a matching enter");
        };
        debug_assert_eq!(marker.level, self.open.len() + 1);

        let node = &mut self.arena[index].node;
        if let (Some(created), Action::Create(create)) = (exit.created, &mut node.action) {
            create.address = Some(created);
        }
        node.outcome = Some(if marker.reverted {
            Outcome::Failure(EXECUTION_REVERTED.to_string())
        } else if let Some(error) = exit.error {
            Outcome::Failure(error)
        } else if node.action.is_selfdestruct() {
            Outcome::Success(ActionResult::SelfDestruct)
        } else if marker.is_create {
            let address = match &node.action {
                Action::Create(create) => create.address,
                _ => None,
            };
            Outcome::Success(ActionResult::Create {
                gas_used: exit.gas_used,
                address,
                code: exit.output,
            })
        } else {
            Outcome::Success(ActionResult::Call {
                gas_used: exit.gas_used,
                output: exit.output,
            })
        });

        if self.open.is_empty() {
            if exit.gas_used > 0 {
                node.action.set_gas(exit.gas_used);
            }
            self.flatten();
        }
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

impl Reset for TreeTracer {
    fn reset(&mut self, ctx: TxContext) {
        self.arena = Vec::new();
        self.root = None;
        self.open = Vec::new();
        self.markers = Vec::new();
        self.output = TraceSet::new(ctx);
    }
}

impl TraceOutput for TreeTracer {
    type Output = TraceSet;

    fn get_output(&self) -> Self::Output {
        self.output.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bytes, CallKind, U256};
    use alloy::primitives::{address, Address};

    const EOA: Address = address!("00000000000000000000000000000000000000e0");
    const A: Address = address!("00000000000000000000000000000000000000a0");
    const B: Address = address!("00000000000000000000000000000000000000b0");

    fn call(from: Address, to: Address, gas: u64) -> CallFrame {
        CallFrame::call(CallKind::Call, from, to, Bytes::new(), gas, U256::ZERO)
    }

    #[test]
    fn test_output_appears_only_after_root_closes() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 1000));
        tracer.enter(call(A, B, 500));
        tracer.exit(FrameExit::success(Bytes::new(), 100));
        assert!(tracer.traces().is_empty());
        assert!(!tracer.is_finished());

        tracer.exit(FrameExit::success(Bytes::new(), 300));
        assert!(tracer.is_finished());
        assert_eq!(tracer.traces().len(), 2);
    }

    #[test]
    fn test_gas_is_redistributed_top_down() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 100_000));
        tracer.enter(call(A, B, 60_000));
        tracer.enter(call(B, A, 20_000));
        tracer.exit(FrameExit::success(Bytes::new(), 5_000));
        tracer.exit(FrameExit::success(Bytes::new(), 10_000));
        tracer.enter(call(A, B, 30_000));
        tracer.exit(FrameExit::success(Bytes::new(), 50_000));
        tracer.exit(FrameExit::success(Bytes::new(), 40_000));

        let traces = tracer.traces();
        // root gas becomes the transaction's gas used
        assert_eq!(traces[0].action.gas(), 40_000);
        assert_eq!(traces[0].subtraces, 2);
        // 40_000 - 10_000
        assert_eq!(traces[1].action.gas(), 30_000);
        assert_eq!(traces[1].trace_address, vec![0]);
        // 30_000 - 5_000, using the already redistributed parent gas
        assert_eq!(traces[2].action.gas(), 25_000);
        assert_eq!(traces[2].trace_address, vec![0, 0]);
        // 40_000 - 50_000 would be negative, so the child keeps its gas used
        assert_eq!(traces[3].action.gas(), 50_000);
        assert_eq!(traces[3].trace_address, vec![1]);
    }

    #[test]
    fn test_failed_child_keeps_original_gas() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 100_000));
        tracer.enter(call(A, B, 7_000));
        tracer.exit(FrameExit::failure("out of gas", 7_000));
        tracer.exit(FrameExit::success(Bytes::new(), 20_000));
        assert_eq!(tracer.traces()[1].action.gas(), 7_000);
        assert_eq!(tracer.traces()[1].error(), Some("out of gas"));
    }

    #[test]
    fn test_marker_selects_code_for_creations() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 100_000));
        tracer.enter(CallFrame::create(A, None, Bytes::from(vec![0x60]), 50_000, U256::ZERO));
        tracer.exit(FrameExit::success(Bytes::from(vec![0xfe]), 1_000).with_created(B));
        tracer.exit(FrameExit::success(Bytes::from(vec![0x01]), 2_000));
        assert_eq!(
            tracer.traces()[1].result(),
            Some(&ActionResult::Create {
                gas_used: 1_000,
                address: Some(B),
                code: Bytes::from(vec![0xfe])
            })
        );
        assert_eq!(
            tracer.traces()[0].result(),
            Some(&ActionResult::Call {
                gas_used: 2_000,
                output: Bytes::from(vec![0x01])
            })
        );
    }

    #[test]
    fn test_selfdestruct_has_no_gas_or_payload() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 100_000));
        tracer.enter(CallFrame::selfdestruct(A, EOA, U256::from(3)));
        tracer.exit(FrameExit::default());
        tracer.exit(FrameExit::success(Bytes::new(), 30_000));
        let destruct = &tracer.traces()[1];
        assert_eq!(destruct.action.gas(), 0);
        assert_eq!(destruct.result(), Some(&ActionResult::SelfDestruct));
        assert_eq!(destruct.error(), None);
    }

    #[test]
    fn test_revert_marks_only_innermost_frame() {
        let mut tracer = TreeTracer::new(TxContext::default());
        tracer.start(call(EOA, A, 100_000));
        tracer.enter(call(A, B, 50_000));
        tracer.exit(FrameExit::success(Bytes::new(), 1_000));
        tracer.opcode(&OpcodeStep::new(0, opcode::REVERT, 10, 1));
        tracer.exit(FrameExit::success(Bytes::new(), 2_000));
        assert_eq!(tracer.traces()[0].error(), Some(EXECUTION_REVERTED));
        assert!(tracer.traces()[1].result().is_some());
    }
}
