// Static catalog of the statistics tools

use crate::protocol::ToolSchema;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Prefix of the tool names published by earlier releases
pub const LEGACY_PREFIX: &str = "scb_";

/// The closed set of tools this server exposes.
///
/// Variant order is the listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    BrowseMetadata,
    SearchTables,
    GetTableMetadata,
    FetchData,
    GetTableInfo,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::BrowseMetadata,
        ToolName::SearchTables,
        ToolName::GetTableMetadata,
        ToolName::FetchData,
        ToolName::GetTableInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::BrowseMetadata => "browse_metadata",
            ToolName::SearchTables => "search_tables",
            ToolName::GetTableMetadata => "get_table_metadata",
            ToolName::FetchData => "fetch_data",
            ToolName::GetTableInfo => "get_table_info",
        }
    }

    pub fn descriptor(&self) -> &'static ToolDescriptor {
        &TOOLS[*self as usize]
    }

    /// Arguments echoed back next to a provider error
    pub fn echoed_arguments(&self) -> &'static [&'static str] {
        match self {
            ToolName::BrowseMetadata => &["path"],
            ToolName::SearchTables => &["query"],
            ToolName::GetTableMetadata | ToolName::GetTableInfo => &["table_id"],
            ToolName::FetchData => &["table_id", "query"],
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name matches no tool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tool: {0}")]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    /// Accepts the canonical names and their `scb_`-prefixed aliases
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let bare = name.strip_prefix(LEGACY_PREFIX).unwrap_or(name);
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == bare)
            .ok_or_else(|| UnknownTool(name.to_string()))
    }
}

/// JSON type of a tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    String,
    Object,
}

impl ArgumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentType::String => "string",
            ArgumentType::Object => "object",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgumentType::String => value.is_string(),
            ArgumentType::Object => value.is_object(),
        }
    }
}

/// One declared argument of a tool
#[derive(Debug)]
pub struct ArgumentSpec {
    pub name: &'static str,
    pub ty: ArgumentType,
    pub required: bool,
    /// Advertised as a JSON Schema `enum`; not enforced
    pub allowed_values: Option<&'static [&'static str]>,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl ArgumentSpec {
    fn json_schema(&self) -> Value {
        let mut schema = match self.ty {
            ArgumentType::String => json_schema_string(self.description),
            ArgumentType::Object => json_schema_map(self.description),
        };
        if let Some(fields) = schema.as_object_mut() {
            if let Some(values) = self.allowed_values {
                fields.insert("enum".to_string(), Value::from(values.to_vec()));
            }
            if let Some(default) = self.default {
                fields.insert("default".to_string(), Value::from(default));
            }
        }
        schema
    }
}

/// Immutable description of one tool
#[derive(Debug)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub arguments: &'static [ArgumentSpec],
}

impl ToolDescriptor {
    pub fn required(&self) -> impl Iterator<Item = &'static ArgumentSpec> {
        self.arguments.iter().filter(|arg| arg.required)
    }

    /// MCP rendering of the descriptor
    pub fn schema(&self) -> ToolSchema {
        let properties: Map<String, Value> = self
            .arguments
            .iter()
            .map(|arg| (arg.name.to_string(), arg.json_schema()))
            .collect();
        let required: Vec<&str> = self.required().map(|arg| arg.name).collect();

        ToolSchema {
            name: self.name.as_str().to_string(),
            description: self.description.to_string(),
            input_schema: json_schema_object(Value::Object(properties), required),
        }
    }
}

const LANGUAGE: ArgumentSpec = ArgumentSpec {
    name: "language",
    ty: ArgumentType::String,
    required: false,
    allowed_values: Some(&["sv", "en"]),
    default: Some("sv"),
    description: "Language for results: 'sv' (Swedish) or 'en' (English)",
};

const TABLE_ID: ArgumentSpec = ArgumentSpec {
    name: "table_id",
    ty: ArgumentType::String,
    required: true,
    allowed_values: None,
    default: None,
    description: "Table identifier, e.g. 'BE0101N1', or its full catalog path",
};

static TOOLS: [ToolDescriptor; 5] = [
    ToolDescriptor {
        name: ToolName::BrowseMetadata,
        description: "Browse the SCB statistical database structure. Use an empty path for the top level.",
        arguments: &[
            ArgumentSpec {
                name: "path",
                ty: ArgumentType::String,
                required: false,
                allowed_values: None,
                default: Some(""),
                description: "Path in the database hierarchy, e.g. 'BE' or 'BE/BE0101'",
            },
            LANGUAGE,
        ],
    },
    ToolDescriptor {
        name: ToolName::SearchTables,
        description: "Search for statistical tables whose title contains the given text",
        arguments: &[
            ArgumentSpec {
                name: "query",
                ty: ArgumentType::String,
                required: true,
                allowed_values: None,
                default: None,
                description: "Search text, matched case-insensitively against table titles",
            },
            LANGUAGE,
        ],
    },
    ToolDescriptor {
        name: ToolName::GetTableMetadata,
        description: "Get the variables and value codes of a statistical table",
        arguments: &[TABLE_ID, LANGUAGE],
    },
    ToolDescriptor {
        name: ToolName::FetchData,
        description: "Fetch data from a statistical table. Use [\"*\"] to select every value of a variable.",
        arguments: &[
            TABLE_ID,
            ArgumentSpec {
                name: "query",
                ty: ArgumentType::Object,
                required: true,
                allowed_values: None,
                default: None,
                description: "Variable codes mapped to value codes, e.g. {\"Region\": [\"00\"], \"Tid\": [\"*\"]}",
            },
            LANGUAGE,
        ],
    },
    ToolDescriptor {
        name: ToolName::GetTableInfo,
        description: "Check that a table exists and get its API URL",
        arguments: &[TABLE_ID, LANGUAGE],
    },
];

/// Every tool, in declaration order
pub fn list_tools() -> &'static [ToolDescriptor] {
    &TOOLS
}

/// MCP schemas of every tool, in declaration order
pub fn tool_schemas() -> Vec<ToolSchema> {
    TOOLS.iter().map(ToolDescriptor::schema).collect()
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_map(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "description": description,
        "additionalProperties": {
            "type": "array",
            "items": {"type": "string"}
        }
    })
}
