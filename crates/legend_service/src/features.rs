use serde::Deserialize;
use serde_json::Value;

/// WFS `GetFeature` JSON response.
///
/// A server-side error arrives as an `exceptions` payload instead of a
/// feature list; callers must check it before reading features.
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub exceptions: Option<Value>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One feature carrying the projected attribute values.
#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// Collects the given attribute's value from every feature, as strings.
///
/// Non-string values are stringified; features missing the attribute or
/// carrying a null are skipped.
#[must_use]
pub fn property_values(collection: &FeatureCollection, property: &str) -> Vec<String> {
    collection
        .features
        .iter()
        .filter_map(|feature| feature.properties.get(property))
        .filter_map(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}
