//! Provider-agnostic types shared by every vendor family

pub mod message;
pub mod metadata;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{Message, Role};
pub use metadata::{ModelMetadata, ProviderMetadata, VendorFamily};
pub use request::ChatRequest;
pub use response::{DroppedToolCall, LlmResponse, ResponseMetadata, Usage};
pub use tool::{FunctionCall, ToolCall, ToolDefinition, synthesize_tool_call_id};
