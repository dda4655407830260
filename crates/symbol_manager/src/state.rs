use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use legend_service::discovery::RuleSymbol;
use legend_service::legend::SymbolKind;

use crate::layer::{Layer, SubscriptionId, SymbolSpec};
use crate::symbol::SymbolDescriptor;

/// Per-layer cache entry.
pub struct LayerState {
    /// The visibility the layer had before/outside symbol-driven changes.
    pub current_visible: bool,
    /// Formatted symbols; empty while discovery is still in flight.
    pub symbols: Vec<SymbolDescriptor>,
    /// Token of the visibility observer installed at registration.
    pub visibility_subscription: SubscriptionId,
}

/// Bidirectional index over registered layers.
///
/// A primary map from layer id to [`LayerState`] plus a registration-ordered
/// layer list used for id-to-layer resolution and for deterministic merge
/// order. Entries can disappear between the time an async callback is
/// scheduled and the time it runs, so every accessor treats a missing id as
/// "not registered" rather than an error.
#[derive(Default)]
pub struct LayerStateTable {
    states: HashMap<String, LayerState>,
    layers: Vec<Arc<dyn Layer>>,
}

impl LayerStateTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, layer_id: &str) -> bool {
        self.states.contains_key(layer_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn insert(&mut self, layer_id: String, layer: Arc<dyn Layer>, state: LayerState) {
        self.layers.push(layer);
        self.states.insert(layer_id, state);
    }

    /// Removes a layer's entry, dropping it from the resolution list as well.
    pub fn remove(&mut self, layer_id: &str) -> Option<LayerState> {
        let state = self.states.remove(layer_id)?;
        self.layers
            .retain(|layer| layer.id().as_deref() != Some(layer_id));
        Some(state)
    }

    #[must_use]
    pub fn state(&self, layer_id: &str) -> Option<&LayerState> {
        self.states.get(layer_id)
    }

    pub fn state_mut(&mut self, layer_id: &str) -> Option<&mut LayerState> {
        self.states.get_mut(layer_id)
    }

    /// Resolves a registered legend layer by id.
    #[must_use]
    pub fn layer_by_id(&self, layer_id: &str) -> Option<Arc<dyn Layer>> {
        self.layers
            .iter()
            .find(|layer| layer.is_legend_layer() && layer.id().as_deref() == Some(layer_id))
            .map(Arc::clone)
    }

    /// Registered layer ids in registration order.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().filter_map(|layer| layer.id()).collect()
    }

    /// States in registration order, for merging.
    #[must_use]
    pub fn states_in_order(&self) -> Vec<&LayerState> {
        self.layers
            .iter()
            .filter_map(|layer| layer.id())
            .filter_map(|layer_id| self.states.get(&layer_id))
            .collect()
    }

    /// Empties the table, yielding each layer paired with its state so the
    /// caller can tear subscriptions down and restore visibilities.
    pub fn drain(&mut self) -> Vec<(Arc<dyn Layer>, LayerState)> {
        let layers = std::mem::take(&mut self.layers);
        let mut states = std::mem::take(&mut self.states);
        layers
            .into_iter()
            .filter_map(|layer| {
                let layer_id = layer.id()?;
                let state = states.remove(&layer_id)?;
                Some((layer, state))
            })
            .collect()
    }
}

/// A symbol before per-layer formatting, from either discovery or presets.
pub struct RawSymbol {
    pub filter_value: String,
    pub label: String,
    pub icon_url: Option<String>,
    pub kind: Option<SymbolKind>,
}

impl From<&RuleSymbol> for RawSymbol {
    fn from(symbol: &RuleSymbol) -> Self {
        Self {
            filter_value: symbol.filter_value.clone(),
            label: symbol.label.clone(),
            icon_url: symbol.icon_url.clone(),
            kind: symbol.kind,
        }
    }
}

impl From<&SymbolSpec> for RawSymbol {
    fn from(spec: &SymbolSpec) -> Self {
        Self {
            filter_value: spec.filter_value().to_owned(),
            label: spec.name.clone(),
            icon_url: spec.icon_url.clone(),
            kind: spec.kind,
        }
    }
}

/// Formats raw symbols into the descriptors stored in a layer's state.
///
/// Checked state is seeded from the layer's current visibility; `disabled`
/// marks values absent from `present_values`; ids are namespaced with the
/// layer id so equal filter values on different layers stay distinct until a
/// caller deliberately shares ids across layers.
#[must_use]
pub fn format_symbols(
    layer: &dyn Layer,
    layer_id: &str,
    raw: &[RawSymbol],
    present_values: &[String],
) -> Vec<SymbolDescriptor> {
    if raw.is_empty() {
        warn!("layer {layer_id} has no legend symbols to format");
        return Vec::new();
    }
    let is_checked = layer.visible();
    let show_check_box = layer.show_check_box().unwrap_or(true);
    raw.iter()
        .map(|symbol| SymbolDescriptor {
            id: format!("{layer_id}_{}", symbol.filter_value),
            label: symbol.label.clone(),
            icon_url: symbol.icon_url.clone(),
            filter_value: symbol.filter_value.clone(),
            is_checked,
            disabled: !present_values
                .iter()
                .any(|value| value == &symbol.filter_value),
            show_check_box,
            kind: symbol.kind,
        })
        .collect()
}
