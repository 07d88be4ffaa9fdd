//! Owned execution scope and bounds-checked operand reads
//!
//! Engines that hand the tracer a snapshot of the executing frame can use
//! [`ScopeSnapshot`] directly. Reads never panic: an operand missing from the
//! stack reads as zero and a memory range outside the buffer reads as empty,
//! both with a warning.

use crate::traits::ExecutionScope;
use crate::types::{Address, Bytes, U256};
use tracing::warn;

/// Snapshot of a frame's stack and memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSnapshot {
    pub contract: Address,
    /// Stack items, bottom first
    pub stack: Vec<U256>,
    pub memory: Vec<u8>,
}

impl ScopeSnapshot {
    pub fn new(contract: Address, stack: Vec<U256>, memory: Vec<u8>) -> Self {
        Self {
            contract,
            stack,
            memory,
        }
    }
}

impl ExecutionScope for ScopeSnapshot {
    fn contract_address(&self) -> Address {
        self.contract
    }

    fn stack_back(&self, n: usize) -> Option<U256> {
        self.stack.iter().rev().nth(n).copied()
    }

    fn memory_copy(&self, offset: usize, size: usize) -> Bytes {
        memory_slice(&self.memory, offset, size)
    }
}

/// Copies `memory[offset..offset + size]`, or returns empty bytes when the
/// range does not fit
pub fn memory_slice(memory: &[u8], offset: usize, size: usize) -> Bytes {
    if size == 0 {
        return Bytes::new();
    }
    let Some(end) = offset.checked_add(size) else {
        warn!(offset, size, "Tracer accessed out of bound memory");
        return Bytes::new();
    };
    match memory.get(offset..end) {
        Some(slice) => Bytes::copy_from_slice(slice),
        None => {
            warn!(available = memory.len(), offset, size, "Tracer accessed out of bound memory");
            Bytes::new()
        }
    }
}

/// Stack item `n` below the top, zero if the stack is too short
pub(crate) fn stack_peek(scope: &dyn ExecutionScope, n: usize) -> U256 {
    scope.stack_back(n).unwrap_or_else(|| {
        warn!(index = n, "Tracer accessed out of bound stack");
        U256::ZERO
    })
}

/// Reads the memory range whose offset and size sit at the given stack
/// positions
pub(crate) fn memory_operand(scope: &dyn ExecutionScope, offset_pos: usize, size_pos: usize) -> Bytes {
    let offset = word_to_usize(stack_peek(scope, offset_pos));
    let size = word_to_usize(stack_peek(scope, size_pos));
    scope.memory_copy(offset, size)
}

fn word_to_usize(word: U256) -> usize {
    usize::try_from(word.saturating_to::<u64>()).unwrap_or(usize::MAX)
}
