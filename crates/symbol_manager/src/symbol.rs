use serde::Serialize;

use legend_service::legend::SymbolKind;

/// One legend entry as tracked per layer and exposed to the UI panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SymbolDescriptor {
    /// Unique within one layer's symbol list, namespaced as
    /// `{layer_id}_{filter_value}`. Layers sharing an id deliberately merge
    /// into one entry of the global view.
    pub id: String,
    /// Display name.
    pub label: String,
    pub icon_url: Option<String>,
    /// The raw attribute value this symbol represents.
    pub filter_value: String,
    pub is_checked: bool,
    /// True when the value is absent from the layer's current data.
    pub disabled: bool,
    /// Whether the UI may toggle this symbol.
    pub show_check_box: bool,
    pub kind: Option<SymbolKind>,
}

/// Snapshot handed to update listeners after every settled recompute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SymbolUpdate {
    /// All merged symbols across visible layers.
    pub total_symbols: Vec<SymbolDescriptor>,
    /// The filtered view the panel shows: unconditional entries plus enabled
    /// toggleable ones (or all of them under the show-all override).
    pub current_symbols: Vec<SymbolDescriptor>,
}
