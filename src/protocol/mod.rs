// Wire protocol: JSON-RPC 2.0 envelopes and the MCP tool surface

pub mod jsonrpc;
pub mod tools;

pub use jsonrpc::{codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use tools::{decode_tool_response, methods, ToolCallResult, FILE_PROCESS_TOOL, PROTOCOL_VERSION};
