//! MCP tool implementations.
//!
//! This module contains all tools exposed by the siteprofile server.

pub mod cache;
pub mod scrape;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use siteprofile_core::Error;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::Serialization)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn result_text(result: &CallToolResult) -> String {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
