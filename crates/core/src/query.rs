// Translation of caller selections into provider-native queries

use crate::error::{ProviderError, ProviderResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Token selecting every value of a dimension
pub const WILDCARD: &str = "*";

/// Caller-supplied selection: dimension code -> value codes or [`WILDCARD`]
pub type SelectionQuery = IndexMap<String, Vec<String>>;

/// Declared domain of every dimension of a table, in metadata order
pub type DimensionDomains = IndexMap<String, Vec<String>>;

/// Selection understood by the provider: concrete value codes only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeQuery(pub IndexMap<String, Vec<String>>);

impl NativeQuery {
    pub fn get(&self, dimension: &str) -> Option<&Vec<String>> {
        self.0.get(dimension)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Verify every selected value against the table's declared domains.
    ///
    /// Sequences must be non-empty and may only contain declared codes.
    pub fn check_against(&self, domains: &DimensionDomains) -> ProviderResult<()> {
        for (dimension, values) in &self.0 {
            let domain = domains.get(dimension).ok_or_else(|| {
                ProviderError::InvalidSelection(format!("unknown dimension '{}'", dimension))
            })?;

            if values.is_empty() {
                return Err(ProviderError::InvalidSelection(format!(
                    "no values selected for '{}'",
                    dimension
                )));
            }

            if let Some(value) = values.iter().find(|v| !domain.contains(v)) {
                return Err(ProviderError::InvalidSelection(format!(
                    "value '{}' is not declared for '{}'",
                    value, dimension
                )));
            }
        }
        Ok(())
    }
}

/// Rewrite a selection into the provider's native form.
///
/// A sequence holding the wildcard is replaced by the full declared domain
/// of that dimension, in declaration order. Any other sequence passes through
/// untouched, and dimensions missing from `selection` stay missing. Pure; no
/// domain membership check happens here.
pub fn translate(domains: &DimensionDomains, selection: &SelectionQuery) -> NativeQuery {
    let native = selection
        .iter()
        .map(|(dimension, values)| {
            let values = match domains.get(dimension) {
                Some(domain) if values.iter().any(|v| v == WILDCARD) => domain.clone(),
                _ => values.clone(),
            };
            (dimension.clone(), values)
        })
        .collect();

    NativeQuery(native)
}
