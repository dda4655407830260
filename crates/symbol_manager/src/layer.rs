//! Collaborator contracts for the map objects this crate observes.
//!
//! The manager never owns layers; it consumes them through these traits so
//! any map stack (or a test fixture) can plug in. Implementations are shared
//! as `Arc<dyn Layer>` and must be safe to call from spawned discovery tasks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use legend_service::legend::SymbolKind;

/// Opaque subscription token returned by the notification methods.
pub type SubscriptionId = u64;

/// Why a visibility change happened.
///
/// Changes the translator itself causes are tagged `SymbolDriven` so the
/// manager's observer does not reinterpret them as an external visibility
/// flip.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisibilityOrigin {
    External,
    SymbolDriven,
}

/// Callback invoked when a layer's visibility changes.
pub type VisibilityCallback = Box<dyn Fn(bool, VisibilityOrigin) + Send + Sync>;

/// A host-provided preset symbol for layers that carry their own legend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SymbolSpec {
    /// Raw attribute value; falls back to `name` when absent.
    pub id: Option<String>,
    pub name: String,
    pub icon_url: Option<String>,
    pub kind: Option<SymbolKind>,
}

impl SymbolSpec {
    /// The attribute value this spec stands for.
    #[must_use]
    pub fn filter_value(&self) -> &str {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.name)
    }
}

/// A map display layer, as far as symbol management is concerned.
///
/// Subscription methods must not invoke the callback synchronously from
/// within `subscribe_visibility` itself; notifications are delivered on later
/// visibility changes only.
pub trait Layer: Send + Sync {
    /// Stable identity, once assigned.
    fn id(&self) -> Option<String>;
    /// Stores an identity on the layer. May be ignored by layers that cannot
    /// accept one; callers re-read [`Self::id`] afterwards.
    fn assign_id(&self, id: &str);

    /// Whether the layer participates in legend management at all.
    fn is_legend_layer(&self) -> bool;

    /// The published name used for legend and feature requests.
    fn legend_name(&self) -> Option<String>;
    fn set_legend_name(&self, name: &str);

    /// Host-provided symbols, when the layer carries its own legend.
    fn preset_symbols(&self) -> Option<Vec<SymbolSpec>>;

    /// The attribute whose value distinguishes this layer's symbols.
    fn filter_property(&self) -> Option<String>;
    fn set_filter_property(&self, property: &str);

    /// Whether the UI may toggle this layer's symbols. `None` when the host
    /// never configured it; the manager then defaults it to `true`.
    fn show_check_box(&self) -> Option<bool>;
    fn set_show_check_box(&self, on: bool);

    /// Per-symbol visibility map governing fine-grained rendering of
    /// multi-symbol vector layers, keyed by filter value.
    fn symbol_visibility(&self) -> Option<HashMap<String, bool>>;
    fn set_symbol_visibility(&self, map: HashMap<String, bool>);

    fn visible(&self) -> bool;
    fn set_visible(&self, visible: bool, origin: VisibilityOrigin);

    /// Requests a redraw after out-of-band style state changed.
    fn changed(&self);

    fn subscribe_visibility(&self, callback: VisibilityCallback) -> SubscriptionId;
    fn unsubscribe_visibility(&self, subscription: SubscriptionId);

    /// The server-backed data source, when the layer has one.
    fn source(&self) -> Option<Arc<dyn LayerSource>>;
}

/// A layer's server-backed data source.
pub trait LayerSource: Send + Sync {
    /// Base service URL.
    fn url(&self) -> Option<Url>;
    /// Current server-side query parameters.
    fn params(&self) -> HashMap<String, String>;
    /// Merges the given parameters into the server-side query, triggering a
    /// re-request.
    fn update_params(&self, params: HashMap<String, String>);
}

/// A layer collection membership change.
pub enum CollectionEvent {
    Added(Arc<dyn Layer>),
    Removed(Arc<dyn Layer>),
}

/// Callback invoked on collection membership changes.
pub type CollectionCallback = Box<dyn Fn(CollectionEvent) + Send + Sync>;

/// An ordered, observable set of layers (one map's layer stack).
pub trait LayerCollection: Send + Sync {
    /// Snapshot of the current members in stack order.
    fn snapshot(&self) -> Vec<Arc<dyn Layer>>;
    fn subscribe(&self, callback: CollectionCallback) -> SubscriptionId;
    fn unsubscribe(&self, subscription: SubscriptionId);
}
