//! Types for the MCP tool-calling system.
//!
//! A [`Tool`] is the descriptor a server returns from `tools/list`. Its
//! optional [`ToolOutputSchema`] is what the client validates
//! `structuredContent` against after a `tools/call`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{content::ContentBlock, core::Cursor};

fn object_type() -> String {
    "object".to_string()
}

/// Optional metadata hints about a tool's behavior.
///
/// All properties are hints from a possibly untrusted server and must not
/// drive security decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolAnnotations {
    /// A user-friendly title for display in UIs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The tool may perform destructive updates
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Repeated calls with the same arguments have no additional effect
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// The tool may interact with external systems
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
    /// The tool does not modify its environment
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
}

/// Descriptor of a tool exposed by an MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// The programmatic name of the tool, used in `tools/call`.
    pub name: String,

    /// An optional, user-friendly title for the tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// A human-readable description of what the tool does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The JSON Schema object defining the parameters the tool accepts.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: ToolInputSchema,

    /// JSON Schema for `structuredContent` in the tool's results.
    ///
    /// When absent, results are passed through without validation.
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<ToolOutputSchema>,

    /// Optional hints about the tool's behavior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,

    /// A general-purpose metadata field for custom data.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

impl Tool {
    /// Creates a new `Tool` with a given name and an empty input schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            input_schema: ToolInputSchema::default(),
            output_schema: None,
            annotations: None,
            meta: None,
        }
    }

    /// Sets the description for this tool.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the input schema for this tool.
    pub fn with_input_schema(mut self, schema: ToolInputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the output schema for this tool.
    pub fn with_output_schema(mut self, schema: ToolOutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Whether results of this tool are checked against a declared schema
    pub fn declares_output_schema(&self) -> bool {
        self.output_schema.is_some()
    }
}

/// Defines the arguments a tool accepts. Opaque to the client: it is carried,
/// never validated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// The type of the schema, "object" for tool inputs.
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    /// A map defining the properties (parameters) the tool accepts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    /// A list of property names that are required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Any other JSON Schema keywords
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for ToolInputSchema {
    /// Creates a default `ToolInputSchema` that accepts an empty object.
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: None,
            required: None,
            extra: HashMap::new(),
        }
    }
}

/// Defines the structure of a tool's `structuredContent`, as a JSON Schema object.
///
/// The common keywords are typed fields; every other keyword (`$defs`,
/// `description`, `additionalProperties`, ...) is kept in `extra` so the
/// schema survives a round trip unchanged and validates as the server wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutputSchema {
    /// The type of the schema, "object" for tool outputs.
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    /// A map defining the properties of the output object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    /// A list of property names in the output that are required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Any other JSON Schema keywords
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for ToolOutputSchema {
    fn default() -> Self {
        Self {
            schema_type: object_type(),
            properties: None,
            required: None,
            extra: HashMap::new(),
        }
    }
}

impl ToolOutputSchema {
    /// Adds a property to the schema using a builder pattern.
    pub fn add_property(mut self, name: impl Into<String>, property: Value) -> Self {
        self.properties
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), property);
        self
    }

    /// Marks a property as required using a builder pattern.
    pub fn require_property(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.contains(&name) {
            required.push(name);
        }
        self
    }

    /// The schema as a JSON document, as handed to a validator
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Parameters of `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListToolsRequest {
    /// Continue listing after this cursor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

/// The result of `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListToolsResult {
    /// The tools on this page, in server order.
    pub tools: Vec<Tool>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
    /// Optional metadata for the result.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub _meta: Option<Value>,
}

/// Parameters of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallToolRequest {
    /// The programmatic name of the tool to call.
    pub name: String,

    /// The arguments to pass to the tool, conforming to its input schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<HashMap<String, Value>>,

    /// Optional metadata for the request.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub _meta: Option<Value>,
}

/// The result of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CallToolResult {
    /// The output of the tool as ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// Whether the tool execution itself failed.
    ///
    /// A tool-level failure is still a successful JSON-RPC response; the
    /// content blocks describe the error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Optional structured output, checked against the tool's `outputSchema`.
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Optional metadata for the result.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub _meta: Option<Value>,
}

impl CallToolResult {
    /// `true` if the server flagged the result as a tool-level error
    pub fn has_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text of the first text block
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }

    /// All text blocks joined with newlines
    pub fn all_text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
