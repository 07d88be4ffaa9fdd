//! Execution engine bindings
//!
//! - `oe_inspector`: revm `Inspector` that feeds any [`CallTracer`](crate::traits::CallTracer)

pub mod oe_inspector;

pub use oe_inspector::{error_message, OeInspector};
