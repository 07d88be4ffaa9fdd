//! # OpenEthereum-style Transaction Call Tracing
//!
//! A library for recording the nested call structure of a transaction and
//! rendering it as Parity/OpenEthereum `trace_*` entries.
//!
//! ## Core Features
//!
//! - **Trace Construction**
//!   - Event-driven builders fed with enter/exit/opcode events
//!   - Trace addresses assigned in discovery order
//!   - Frames rejected by pre-checks recorded as failed calls
//!   - Streaming (`StackTracer`) or tree-first (`TreeTracer`) strategy
//!
//! - **Encoding**
//!   - Compact RLP storage form
//!   - Parity-compatible JSON API form
//!
//! - **Persistence**
//!   - Pluggable key-value store keyed by transaction hash
//!   - Best-effort writes, optionally on tokio's blocking pool
//!
//! ## Example Usage
//!
//! ```rust
//! use oe_trace::{
//!     codec::to_api_traces,
//!     traits::{CallTracer, TraceOutput},
//!     types::{Bytes, CallFrame, CallKind, FrameExit, TxContext, U256},
//!     StackTracer,
//! };
//! use alloy::primitives::address;
//!
//! let sender = address!("C255fC198eEdAC7AF8aF0f6e0ca781794B094A61");
//! let token = address!("d878229c9c3575F224784DE610911B5607a3ad15");
//!
//! let mut tracer = StackTracer::new(TxContext::default());
//! tracer.start(CallFrame::call(CallKind::Call, sender, token, Bytes::new(), 50_000, U256::ZERO));
//! tracer.enter(CallFrame::call(CallKind::StaticCall, token, sender, Bytes::new(), 10_000, U256::ZERO));
//! tracer.exit(FrameExit::success(Bytes::new(), 2_600));
//! tracer.exit(FrameExit::success(Bytes::new(), 24_000));
//!
//! let traces = to_api_traces(&tracer.get_output());
//! assert_eq!(traces.len(), 2);
//! assert_eq!(traces[1].trace_address, vec![0]);
//! ```
//!
//! With revm, wrap a builder in [`OeInspector`] and pass it as the inspector.
//!
//! ## Module Structure
//!
//! - `tracer`: Trace builders, address allocation and pre-check synthesis
//! - `codec`: Storage and API encodings
//! - `store`: Persistence helpers and an in-memory store
//! - `inspectors`: revm binding
//! - `types`: Core data structures
//! - `traits`: Trait definitions at the seams
//! - `config`: Tracer configuration
//! - `errors`: Error types

pub mod codec;
pub mod config;
pub mod errors;
pub mod inspectors;
pub mod store;
pub mod tracer;
pub mod traits;
pub mod types;

// Re-export only the essential types and functions
pub use codec::{decode_storage, encode_storage, to_api_traces, ApiTrace};
pub use config::TracerConfig;
pub use errors::{CodecError, StoreError, TraceError};
pub use inspectors::OeInspector;
pub use store::{persist, read, read_api_traces, spawn_persist, MemoryStore};
pub use tracer::{StackTracer, TreeTracer};
pub use traits::{CallTracer, Reset, TraceOutput, TraceStore};
pub use types::{TraceNode, TraceSet, TxContext};
