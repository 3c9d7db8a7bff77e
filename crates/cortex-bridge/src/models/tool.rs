use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool that can be called by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input
    pub input_schema: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool declaration in the Cortex inference API shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CortexToolSpec {
    pub tool_spec: ToolSpecification,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpecification {
    #[serde(rename = "type")]
    pub spec_type: String,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<Tool> for CortexToolSpec {
    fn from(tool: Tool) -> Self {
        CortexToolSpec {
            tool_spec: ToolSpecification {
                spec_type: "generic".to_string(),
                name: tool.name,
                description: tool.description,
                input_schema: tool.input_schema,
            },
        }
    }
}
