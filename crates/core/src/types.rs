use crate::query::DimensionDomains;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language of a provider client.
///
/// The provider publishes every catalog twice, in Swedish and English.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Sv,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Sv, Language::En];

    /// Parse a caller-supplied language code.
    ///
    /// Anything that is not `en` (case-insensitive) selects Swedish. There is
    /// no rejection path for this field.
    pub fn from_lenient(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("en") {
            Language::En
        } else {
            Language::Sv
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Sv => "sv",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of a catalog node, using the provider's one-letter codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A level in the catalog tree ("l")
    #[serde(rename = "l")]
    Folder,
    /// A statistical table ("t")
    #[serde(rename = "t")]
    Table,
}

/// A node of the provider's catalog tree.
///
/// Serializes to the projected `{id, text, type}` shape; any other field the
/// provider returns is dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: String,
    #[serde(rename = "text")]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl CatalogNode {
    pub fn folder(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Folder,
        }
    }

    pub fn table(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: NodeKind::Table,
        }
    }

    /// Case-insensitive substring match against the label
    pub fn label_contains(&self, needle: &str) -> bool {
        self.label.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// A table resolved by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHandle {
    pub table_id: String,
    /// Canonical URL of the table
    pub locator: String,
}

/// Variable (dimension) declaration of a table, as published by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableVariable {
    pub code: String,
    pub text: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub value_texts: Vec<String>,
    #[serde(default)]
    pub elimination: bool,
    #[serde(default)]
    pub time: bool,
}

/// Table metadata: title plus variable declarations in published order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    #[serde(default)]
    pub title: String,
    pub variables: Vec<TableVariable>,
}

impl TableMetadata {
    /// Full domain of every dimension, keyed by code, in declaration order
    pub fn dimension_domains(&self) -> DimensionDomains {
        self.variables
            .iter()
            .map(|v| (v.code.clone(), v.values.clone()))
            .collect()
    }
}
