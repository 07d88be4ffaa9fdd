//! Encodings of a finished trace set
//!
//! - [`storage`]: compact RLP form written to the trace store
//! - [`api`]: Parity-style JSON form served to clients

pub mod api;
pub mod storage;

pub use api::{to_api_traces, ApiAction, ApiResult, ApiTrace};
pub use storage::{decode_storage, encode_storage, Maybe};
