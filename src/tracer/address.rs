//! Trace address allocation
//!
//! A child's trace address is its parent's address followed by the parent's
//! child count at the moment the child is discovered. The count is bumped
//! eagerly, so addresses are handed out in discovery order and never reused,
//! even for children that later fail.

use crate::types::TraceNode;

/// Returns the trace address for a new child of `parent`
///
/// Increments `parent.subtraces` as a side effect. Without a parent the new
/// node is the root and gets the empty address.
pub fn allocate(parent: Option<&mut TraceNode>) -> Vec<u32> {
    match parent {
        Some(parent) => {
            let mut trace_address = Vec::with_capacity(parent.trace_address.len() + 1);
            trace_address.extend_from_slice(&parent.trace_address);
            trace_address.push(parent.subtraces);
            parent.subtraces += 1;
            trace_address
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, SelfDestructAction};
    use alloy::primitives::{Address, U256};

    fn node(trace_address: Vec<u32>) -> TraceNode {
        TraceNode::new(
            Action::SelfDestruct(SelfDestructAction {
                address: Address::ZERO,
                refund_address: Address::ZERO,
                balance: U256::ZERO,
            }),
            trace_address,
        )
    }

    #[test]
    fn test_root_gets_empty_address() {
        assert!(allocate(None).is_empty());
    }

    #[test]
    fn test_children_are_numbered_in_discovery_order() {
        let mut parent = node(vec![2, 0]);
        assert_eq!(allocate(Some(&mut parent)), vec![2, 0, 0]);
        assert_eq!(allocate(Some(&mut parent)), vec![2, 0, 1]);
        assert_eq!(allocate(Some(&mut parent)), vec![2, 0, 2]);
        assert_eq!(parent.subtraces, 3);
        assert_eq!(parent.trace_address, vec![2, 0]);
    }
}
