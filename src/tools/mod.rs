pub mod knowledge;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub result: Value,
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(result: Value) -> Self {
        Self { success: true, result, metadata: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, result: Value::String(message.into()), metadata: None }
    }

    /// `{"status": "success"|"error", ...}` as printed by the CLI.
    pub fn to_payload(&self) -> Value {
        let status = if self.success { "success" } else { "error" };
        match &self.result {
            Value::Object(fields) => {
                let mut payload = fields.clone();
                payload.insert("status".to_string(), json!(status));
                Value::Object(payload)
            }
            other => json!({ "status": status, "message": other }),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn available_functions(&self) -> Vec<String>;
    async fn execute(&self, function: &str, args: Value) -> Result<ToolResult>;
}

pub use knowledge::KnowledgeTool;
