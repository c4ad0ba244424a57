//! MCP (Model Context Protocol) implementation.

mod bibtex_tools;
mod crossref_tools;
pub mod server;
mod tools;

pub use server::McpServer;
pub use tools::{Tool, ToolError, ToolHandler, ToolRegistry, Toolset};
