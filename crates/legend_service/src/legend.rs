use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Symbol kinds a legend rule may render as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Point,
    Polygon,
    Line,
    Raster,
}

impl SymbolKind {
    /// Maps a symbolizer key to its kind, case-insensitively.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "point" => Some(Self::Point),
            "polygon" => Some(Self::Polygon),
            "line" => Some(Self::Line),
            "raster" => Some(Self::Raster),
            _ => None,
        }
    }
}

/// Top-level `GetLegendGraphic` JSON response.
#[derive(Debug, Deserialize)]
pub struct LegendGraphicResponse {
    #[serde(rename = "Legend", default)]
    pub legends: Vec<Legend>,
}

/// One legend of the response; only the first is consumed.
#[derive(Debug, Deserialize)]
pub struct Legend {
    #[serde(default)]
    pub rules: Vec<LegendRule>,
}

/// One style rule within a legend.
#[derive(Debug, Deserialize)]
pub struct LegendRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Optional single-attribute equality filter, e.g. `[CAT = 'A']`.
    #[serde(default)]
    pub filter: Option<String>,
    /// Symbolizer definitions keyed by kind (`Point`, `Line`, `Text`, ...).
    #[serde(default)]
    pub symbolizers: Vec<serde_json::Map<String, Value>>,
}

/// Extracts the first `[attr = 'value']` pair from a rule filter.
///
/// Only the single-quoted equality form is recognized; anything else yields
/// `None`. The attribute name is trimmed, the value must be non-empty and the
/// closing bracket must follow the closing quote.
#[must_use]
pub fn extract_equality(filter: &str) -> Option<(&str, &str)> {
    let open = filter.find('[')?;
    let rest = &filter[open + 1..];
    let eq = rest.find('=')?;
    let attribute = rest[..eq].trim();
    if attribute.is_empty() {
        return None;
    }
    let after = &rest[eq + 1..];
    let quote = after.find('\'')?;
    let quoted = &after[quote + 1..];
    let end = quoted.find('\'')?;
    let value = &quoted[..end];
    if value.is_empty() {
        return None;
    }
    quoted[end + 1..]
        .starts_with(']')
        .then_some((attribute, value))
}

/// The parts of a rule that survive symbolizer selection.
#[derive(Debug)]
pub struct RuleSummary<'rule> {
    pub name: &'rule str,
    pub label: &'rule str,
    /// Parsed `(attribute, value)` equality pair, when the rule carries one.
    pub filter_pair: Option<(&'rule str, &'rule str)>,
    /// The point symbolizer's own icon URL, when it carries one.
    pub icon_url: Option<&'rule str>,
    pub kind: Option<SymbolKind>,
    /// The selected symbolizer is a raster one.
    pub raster: bool,
}

/// Selects a rule's symbolizer and summarizes it for symbol construction.
///
/// The first symbolizer whose key set is entirely drawn from the known kinds
/// wins; rules with only other symbolizers (text labels, for example) yield
/// `None` and are dropped from the legend.
#[must_use]
pub fn summarize_rule(rule: &LegendRule) -> Option<RuleSummary<'_>> {
    let symbolizer = rule
        .symbolizers
        .iter()
        .find(|candidate| candidate.keys().all(|key| SymbolKind::from_key(key).is_some()))?;
    let icon_url = symbolizer
        .get("Point")
        .and_then(|point| point.get("url"))
        .and_then(Value::as_str);
    Some(RuleSummary {
        name: &rule.name,
        label: rule
            .title
            .as_deref()
            .filter(|title| !title.is_empty())
            .unwrap_or(&rule.name),
        filter_pair: rule.filter.as_deref().and_then(extract_equality),
        icon_url,
        kind: symbolizer.keys().find_map(|key| SymbolKind::from_key(key)),
        raster: symbolizer.contains_key("Raster"),
    })
}
