use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Variants keyed by variant identifier, in discovery order.
pub type VariantMap = IndexMap<String, Variant>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Variant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limited_quantity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_currency: Option<String>,
}

impl Variant {
    pub fn with_dimensions(dimensions: Option<serde_json::Value>) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }
}
