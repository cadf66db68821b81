//! Provider-agnostic chat layer for conflux
//!
//! Sends a conversation to `OpenAI`-compatible, Anthropic or Google vendors
//! through one contract and collapses their three streaming wire shapes into
//! ordered callbacks: visible tokens, reasoning tokens, completed tool calls
//! and exactly one terminal event. Also resolves which tunable parameters are
//! forwarded to each call.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod accumulator;
pub mod catalog;
pub mod client;
pub mod convert;
pub mod decode;
pub mod error;
pub mod fallback;
pub mod params;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod think;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::HttpTransport;
pub use decode::{StreamCallbacks, StreamOutcome};
pub use error::LlmError;
pub use provider::{Adapter, ProviderAdapter, RequestConfig};
pub use registry::AdapterRegistry;
pub use transport::{ResponseShape, Transport, WireRequest};
pub use types::{LlmResponse, Message, ModelMetadata, ProviderMetadata, Role, ToolCall, ToolDefinition};
