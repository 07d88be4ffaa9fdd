//! Trace builders
//!
//! Two builders consume the same event stream and produce the same flat,
//! preorder trace list:
//! - [`StackTracer`]: single pass, nodes visible as soon as they are entered
//! - [`TreeTracer`]: builds a tree, flattens it when the root closes and
//!   re-attributes gas from parent to child
//!
//! Both share trace address allocation ([`address`]) and synthesis of frames
//! an engine rejects before announcing them ([`preflight`]).

pub mod address;
pub mod preflight;
pub mod scope;
mod stack;
mod tree;

pub use preflight::{PreflightFailure, RejectedFrame};
pub use scope::ScopeSnapshot;
pub use stack::StackTracer;
pub use tree::TreeTracer;
