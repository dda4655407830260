use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::runtime::Handle;

use legend_service::discovery::{DiscoveredLegend, discover};
use legend_service::requests::type_name_from_url;
use legend_service::transport::Transport;

use crate::layer::{CollectionEvent, Layer, LayerCollection, SubscriptionId, VisibilityOrigin};
use crate::merge::{current_view, merge_symbols};
use crate::scheduler::{SettledCallback, UpdateScheduler};
use crate::state::{LayerState, LayerStateTable, RawSymbol, format_symbols};
use crate::symbol::{SymbolDescriptor, SymbolUpdate};
use crate::translate;

/// Token identifying a registered update listener.
pub type ListenerToken = u64;

type UpdateListener = Arc<dyn Fn(&SymbolUpdate) + Send + Sync>;

/// Tuning knobs for the manager.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Debounce interval: a recompute fires only after triggers stop arriving
    /// for this long.
    pub quiescence_window: Duration,
    /// Initial state of the show-all override (disabled symbols stay listed).
    pub show_all_symbols: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            quiescence_window: Duration::from_millis(200),
            show_all_symbols: false,
        }
    }
}

struct ManagerInner {
    table: LayerStateTable,
    collection: Option<Arc<dyn LayerCollection>>,
    collection_subscription: Option<SubscriptionId>,
    show_all_symbols: bool,
    total_symbols: Vec<SymbolDescriptor>,
    current_symbols: Vec<SymbolDescriptor>,
    listeners: HashMap<ListenerToken, UpdateListener>,
    next_listener_token: ListenerToken,
    next_layer_id: u64,
    initialized: bool,
}

struct ManagerCore<T: Transport> {
    inner: Mutex<ManagerInner>,
    transport: Arc<T>,
    handle: Handle,
    scheduler: UpdateScheduler,
}

/// Keeps map layers and their legend symbols in sync.
///
/// Bound to one layer collection via [`SymbolManager::init`]; from then on it
/// tracks membership changes, discovers symbols for new layers, merges
/// per-layer symbol state into a global view after every settled burst of
/// changes, and translates checkbox toggles back into layer mutations.
pub struct SymbolManager<T: Transport + 'static> {
    core: Arc<ManagerCore<T>>,
}

impl<T: Transport + 'static> SymbolManager<T> {
    /// Creates an unbound manager running its tasks on the given runtime.
    #[must_use]
    pub fn new(handle: &Handle, transport: T, config: ManagerConfig) -> Self {
        let core = Arc::new_cyclic(|weak: &Weak<ManagerCore<T>>| {
            let weak = Weak::clone(weak);
            let on_settled: SettledCallback = Arc::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.recompute();
                }
            });
            ManagerCore {
                inner: Mutex::new(ManagerInner {
                    table: LayerStateTable::new(),
                    collection: None,
                    collection_subscription: None,
                    show_all_symbols: config.show_all_symbols,
                    total_symbols: Vec::new(),
                    current_symbols: Vec::new(),
                    listeners: HashMap::new(),
                    next_listener_token: 0,
                    next_layer_id: 0,
                    initialized: false,
                }),
                transport: Arc::new(transport),
                handle: handle.clone(),
                scheduler: UpdateScheduler::new(
                    handle.clone(),
                    config.quiescence_window,
                    on_settled,
                ),
            }
        });
        Self { core }
    }

    /// Binds the manager to a layer collection: registers every layer already
    /// present and subscribes to add/remove changes.
    pub fn init(&self, collection: Arc<dyn LayerCollection>) {
        {
            let Ok(mut inner) = self.core.inner.lock() else {
                return;
            };
            if inner.initialized {
                warn!("symbol manager is already initialized");
                return;
            }
            inner.initialized = true;
            inner.collection = Some(Arc::clone(&collection));
        }
        for layer in collection.snapshot() {
            self.core.register_layer(&layer);
        }
        let weak = Arc::downgrade(&self.core);
        let subscription = collection.subscribe(Box::new(move |event| {
            let Some(core) = weak.upgrade() else { return };
            match event {
                CollectionEvent::Added(layer) => core.register_layer(&layer),
                CollectionEvent::Removed(layer) => core.unregister_layer(&layer),
            }
        }));
        if let Ok(mut inner) = self.core.inner.lock() {
            inner.collection_subscription = Some(subscription);
        }
    }

    /// Registers a layer outside of collection change notifications.
    pub fn add_layer(&self, layer: &Arc<dyn Layer>) {
        self.core.register_layer(layer);
    }

    /// Unregisters a layer, restoring its pre-registration visibility when
    /// that value was truthy.
    pub fn remove_layer(&self, layer: &Arc<dyn Layer>) {
        self.core.unregister_layer(layer);
    }

    /// Applies a checkbox toggle.
    ///
    /// With `symbol_id` only the one matching symbol changes; without it
    /// every symbol of every layer does. Eligible layers (those the UI may
    /// toggle) get the change pushed into their backing representation.
    /// Returns `false` when the manager is not initialized.
    pub fn set_checked(&self, is_checked: bool, symbol_id: Option<&str>) -> bool {
        self.core.set_checked(is_checked, symbol_id)
    }

    /// All merged symbols from the last settled recompute.
    #[must_use]
    pub fn total_symbols(&self) -> Vec<SymbolDescriptor> {
        self.core
            .inner
            .lock()
            .map(|inner| inner.total_symbols.clone())
            .unwrap_or_default()
    }

    /// The filtered panel view from the last settled recompute.
    #[must_use]
    pub fn current_symbols(&self) -> Vec<SymbolDescriptor> {
        self.core
            .inner
            .lock()
            .map(|inner| inner.current_symbols.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn show_all_symbols(&self) -> bool {
        self.core
            .inner
            .lock()
            .map(|inner| inner.show_all_symbols)
            .unwrap_or_default()
    }

    /// Toggles the show-all override, scheduling a recompute on change.
    pub fn set_show_all_symbols(&self, show_all: bool) {
        {
            let Ok(mut inner) = self.core.inner.lock() else {
                return;
            };
            if inner.show_all_symbols == show_all {
                return;
            }
            inner.show_all_symbols = show_all;
        }
        self.core.scheduler.request_recompute();
    }

    /// Registers an update listener called after every settled recompute.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SymbolUpdate) + Send + Sync + 'static,
    ) -> ListenerToken {
        let Ok(mut inner) = self.core.inner.lock() else {
            return 0;
        };
        inner.next_listener_token += 1;
        let token = inner.next_listener_token;
        inner.listeners.insert(token, Arc::new(listener));
        token
    }

    pub fn unsubscribe(&self, token: ListenerToken) {
        if let Ok(mut inner) = self.core.inner.lock() {
            inner.listeners.remove(&token);
        }
    }

    /// Reverses all registrations: unsubscribes every observer, restores
    /// original layer visibilities and clears the cached views.
    pub fn teardown(&self) {
        self.core.teardown();
    }
}

impl<T: Transport + 'static> ManagerCore<T> {
    /// One settled recompute: merge, refresh the cached views, notify.
    fn recompute(&self) {
        let (update, listeners) = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if !inner.initialized {
                return;
            }
            let total = merge_symbols(inner.table.states_in_order());
            let current = current_view(&total, inner.show_all_symbols);
            inner.total_symbols = total;
            inner.current_symbols = current;
            let update = SymbolUpdate {
                total_symbols: inner.total_symbols.clone(),
                current_symbols: inner.current_symbols.clone(),
            };
            let listeners: Vec<UpdateListener> =
                inner.listeners.values().map(Arc::clone).collect();
            (update, listeners)
        };
        for listener in listeners {
            listener(&update);
        }
    }

    /// Fills in the layer properties registration relies on. Returns `false`
    /// when the layer cannot participate in legend management.
    fn prepare_layer(&self, layer: &Arc<dyn Layer>) -> bool {
        if !layer.is_legend_layer() {
            debug!("skipping layer without the legend marker");
            return false;
        }
        if layer.legend_name().is_none() && layer.preset_symbols().is_none() {
            let Some(source) = layer.source() else {
                warn!("legend layer has no source; cannot resolve a published name");
                return false;
            };
            let Some(url) = source.url() else {
                warn!("legend layer has no service url; cannot resolve a published name");
                return false;
            };
            let Some(type_name) = type_name_from_url(url.as_str()) else {
                warn!("cannot derive a published name from {url}");
                return false;
            };
            layer.set_legend_name(&type_name);
        }
        if layer.show_check_box().is_none() {
            layer.set_show_check_box(true);
        }
        if layer.symbol_visibility().is_none() {
            layer.set_symbol_visibility(HashMap::new());
        }
        true
    }

    fn register_layer(self: &Arc<Self>, layer: &Arc<dyn Layer>) {
        if !self.prepare_layer(layer) {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let layer_id = match layer.id() {
            Some(layer_id) => layer_id,
            None => {
                inner.next_layer_id += 1;
                layer.assign_id(&format!("legend-layer-{}", inner.next_layer_id));
                let Some(layer_id) = layer.id() else {
                    warn!("layer did not accept an identity; skipping registration");
                    return;
                };
                layer_id
            }
        };
        if inner.table.contains(&layer_id) {
            warn!("layer {layer_id} is already registered");
            return;
        }

        let subscription = {
            let weak = Arc::downgrade(self);
            let observed_id = layer_id.clone();
            layer.subscribe_visibility(Box::new(move |visible, origin| {
                if let Some(core) = weak.upgrade() {
                    core.on_visibility_changed(&observed_id, visible, origin);
                }
            }))
        };
        inner.table.insert(
            layer_id.clone(),
            Arc::clone(layer),
            LayerState {
                current_visible: layer.visible(),
                symbols: Vec::new(),
                visibility_subscription: subscription,
            },
        );

        // Layers carrying their own symbol list skip discovery entirely; the
        // preset values are all considered present.
        let preset = layer.preset_symbols().filter(|specs| !specs.is_empty());
        if let Some(specs) = preset {
            let raw: Vec<RawSymbol> = specs.iter().map(RawSymbol::from).collect();
            let present: Vec<String> = raw
                .iter()
                .map(|symbol| symbol.filter_value.clone())
                .collect();
            let symbols = format_symbols(layer.as_ref(), &layer_id, &raw, &present);
            if let Some(state) = inner.table.state_mut(&layer_id) {
                state.symbols = symbols;
            }
            drop(inner);
            self.scheduler.request_recompute();
            return;
        }
        drop(inner);
        self.spawn_discovery(layer, layer_id);
        self.scheduler.request_recompute();
    }

    /// Visibility observer installed at registration.
    ///
    /// Symbol-driven changes only schedule a recompute; external flips also
    /// update the recorded visibility. A missing table entry means the layer
    /// was unregistered after the notification was scheduled: ignore it.
    fn on_visibility_changed(&self, layer_id: &str, visible: bool, origin: VisibilityOrigin) {
        if origin == VisibilityOrigin::External {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            let Some(state) = inner.table.state_mut(layer_id) else {
                return;
            };
            state.current_visible = visible;
        }
        self.scheduler.request_recompute();
    }

    fn spawn_discovery(self: &Arc<Self>, layer: &Arc<dyn Layer>, layer_id: String) {
        let Some(source) = layer.source() else {
            error!("layer {layer_id} has no source; cannot discover its legend");
            return;
        };
        let Some(base) = source.url() else {
            error!("layer {layer_id} has no service url; cannot discover its legend");
            return;
        };
        let Some(name) = layer.legend_name() else {
            error!("layer {layer_id} has no published name; cannot discover its legend");
            return;
        };
        let existing_filter = source
            .params()
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("cql_filter"))
            .map(|(_, value)| value.clone());

        let core = Arc::clone(self);
        let layer = Arc::clone(layer);
        self.handle.spawn(async move {
            let result = discover(
                core.transport.as_ref(),
                &base,
                &name,
                existing_filter.as_deref(),
            )
            .await;
            match result {
                Ok(Some(found)) => core.finish_discovery(&layer, &layer_id, &found),
                Ok(None) => warn!("no legend symbols discovered for layer {layer_id}"),
                Err(err) => error!("legend discovery failed for layer {layer_id}: {err}"),
            }
        });
    }

    /// Lands an asynchronous discovery result in the state table.
    fn finish_discovery(&self, layer: &Arc<dyn Layer>, layer_id: &str, found: &DiscoveredLegend) {
        let raw: Vec<RawSymbol> = found.symbols.iter().map(RawSymbol::from).collect();
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if !inner.table.contains(layer_id) {
            // The layer was unregistered while the requests were in flight.
            debug!("discovery for layer {layer_id} resolved after unregistration; ignoring");
            return;
        }
        if let Some(property) = &found.filter_property {
            layer.set_filter_property(property);
        }
        let symbols = format_symbols(layer.as_ref(), layer_id, &raw, &found.present_values);
        if let Some(state) = inner.table.state_mut(layer_id) {
            state.symbols = symbols;
        }
        drop(inner);
        self.scheduler.request_recompute();
    }

    fn unregister_layer(&self, layer: &Arc<dyn Layer>) {
        let Some(layer_id) = layer.id() else {
            return;
        };
        let state = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            let Some(state) = inner.table.remove(&layer_id) else {
                return;
            };
            state
        };
        layer.unsubscribe_visibility(state.visibility_subscription);
        // Restored only when the recorded visibility was truthy; a layer
        // hidden before registration keeps whatever the last toggle set.
        if state.current_visible {
            layer.set_visible(true, VisibilityOrigin::SymbolDriven);
        }
        self.scheduler.request_recompute();
    }

    fn set_checked(&self, is_checked: bool, symbol_id: Option<&str>) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if !inner.initialized {
            error!("symbol manager is not initialized");
            return false;
        }
        let mut touched: Vec<String> = Vec::new();
        for layer_id in inner.table.layer_ids() {
            let Some(state) = inner.table.state_mut(&layer_id) else {
                continue;
            };
            if state.symbols.is_empty() {
                warn!("layer {layer_id} has no symbols to toggle");
                continue;
            }
            let mut needs_update = symbol_id.is_none();
            if let Some(symbol_id) = symbol_id {
                if let Some(symbol) = state
                    .symbols
                    .iter_mut()
                    .find(|symbol| symbol.id == symbol_id)
                {
                    symbol.is_checked = is_checked;
                    needs_update = true;
                }
            } else {
                for symbol in &mut state.symbols {
                    symbol.is_checked = is_checked;
                }
            }
            if needs_update {
                touched.push(layer_id);
            }
        }
        for layer_id in touched {
            let Some(layer) = inner.table.layer_by_id(&layer_id) else {
                continue;
            };
            if !layer.show_check_box().unwrap_or(false) {
                continue;
            }
            let Some(state) = inner.table.state(&layer_id) else {
                continue;
            };
            translate::apply(layer.as_ref(), state, is_checked, symbol_id);
        }
        drop(inner);
        self.scheduler.request_recompute();
        true
    }

    fn teardown(&self) {
        let entries = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if let (Some(collection), Some(subscription)) =
                (inner.collection.take(), inner.collection_subscription.take())
            {
                collection.unsubscribe(subscription);
            }
            inner.total_symbols.clear();
            inner.current_symbols.clear();
            inner.listeners.clear();
            inner.initialized = false;
            inner.table.drain()
        };
        for (layer, state) in entries {
            layer.unsubscribe_visibility(state.visibility_subscription);
            if state.current_visible {
                layer.set_visible(true, VisibilityOrigin::SymbolDriven);
            }
        }
    }
}
