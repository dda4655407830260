//! Hand-rolled fakes for the collaborator traits and the transport.
#![allow(dead_code, reason = "shared across test binaries; not every binary uses every fake")]
#![allow(clippy::unwrap_used, reason = "Test code may use unwrap for simplicity")]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Error, anyhow};
use tokio::sync::Semaphore;
use url::Url;

use legend_service::transport::Transport;
use symbol_manager::layer::{
    CollectionCallback, CollectionEvent, Layer, LayerCollection, LayerSource, SubscriptionId,
    SymbolSpec, VisibilityCallback, VisibilityOrigin,
};

pub const SERVICE_URL: &str = "http://host/geoserver/topp/states/wms";

pub fn spec(id: &str) -> SymbolSpec {
    SymbolSpec {
        id: Some(id.to_owned()),
        name: id.to_owned(),
        icon_url: None,
        kind: None,
    }
}

pub struct FakeSource {
    url: Option<Url>,
    pub params: Mutex<HashMap<String, String>>,
}

impl FakeSource {
    pub fn new(url: &str) -> Self {
        Self {
            url: Some(Url::parse(url).unwrap()),
            params: Mutex::new(HashMap::new()),
        }
    }

    pub fn cql_filter(&self) -> Option<String> {
        self.params.lock().unwrap().get("CQL_FILTER").cloned()
    }
}

impl LayerSource for FakeSource {
    fn url(&self) -> Option<Url> {
        self.url.clone()
    }

    fn params(&self) -> HashMap<String, String> {
        self.params.lock().unwrap().clone()
    }

    fn update_params(&self, params: HashMap<String, String>) {
        self.params.lock().unwrap().extend(params);
    }
}

#[derive(Default)]
pub struct FakeLayer {
    id: Mutex<Option<String>>,
    legend_layer: bool,
    legend_name: Mutex<Option<String>>,
    preset: Mutex<Option<Vec<SymbolSpec>>>,
    filter_property: Mutex<Option<String>>,
    show_check_box: Mutex<Option<bool>>,
    symbol_visibility: Mutex<Option<HashMap<String, bool>>>,
    visible: Mutex<bool>,
    pub changed_count: AtomicU64,
    source: Option<Arc<FakeSource>>,
    subscribers: Mutex<HashMap<SubscriptionId, VisibilityCallback>>,
    next_subscription: AtomicU64,
}

impl FakeLayer {
    /// A visible legend layer with a preset identity.
    pub fn legend(id: &str) -> Self {
        Self {
            id: Mutex::new(Some(id.to_owned())),
            legend_layer: true,
            visible: Mutex::new(true),
            ..Self::default()
        }
    }

    /// A layer without the legend marker; must be skipped at registration.
    pub fn plain() -> Self {
        Self {
            visible: Mutex::new(true),
            ..Self::default()
        }
    }

    pub fn with_preset(self, specs: Vec<SymbolSpec>) -> Self {
        *self.preset.lock().unwrap() = Some(specs);
        self
    }

    pub fn with_source(mut self, url: &str) -> Self {
        self.source = Some(Arc::new(FakeSource::new(url)));
        self
    }

    pub fn with_show_check_box(self, on: bool) -> Self {
        *self.show_check_box.lock().unwrap() = Some(on);
        self
    }

    pub fn hidden(self) -> Self {
        *self.visible.lock().unwrap() = false;
        self
    }

    pub fn fake_source(&self) -> &Arc<FakeSource> {
        self.source.as_ref().unwrap()
    }

    pub fn visibility_map(&self) -> HashMap<String, bool> {
        self.symbol_visibility.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl Layer for FakeLayer {
    fn id(&self) -> Option<String> {
        self.id.lock().unwrap().clone()
    }

    fn assign_id(&self, id: &str) {
        *self.id.lock().unwrap() = Some(id.to_owned());
    }

    fn is_legend_layer(&self) -> bool {
        self.legend_layer
    }

    fn legend_name(&self) -> Option<String> {
        self.legend_name.lock().unwrap().clone()
    }

    fn set_legend_name(&self, name: &str) {
        *self.legend_name.lock().unwrap() = Some(name.to_owned());
    }

    fn preset_symbols(&self) -> Option<Vec<SymbolSpec>> {
        self.preset.lock().unwrap().clone()
    }

    fn filter_property(&self) -> Option<String> {
        self.filter_property.lock().unwrap().clone()
    }

    fn set_filter_property(&self, property: &str) {
        *self.filter_property.lock().unwrap() = Some(property.to_owned());
    }

    fn show_check_box(&self) -> Option<bool> {
        *self.show_check_box.lock().unwrap()
    }

    fn set_show_check_box(&self, on: bool) {
        *self.show_check_box.lock().unwrap() = Some(on);
    }

    fn symbol_visibility(&self) -> Option<HashMap<String, bool>> {
        self.symbol_visibility.lock().unwrap().clone()
    }

    fn set_symbol_visibility(&self, map: HashMap<String, bool>) {
        *self.symbol_visibility.lock().unwrap() = Some(map);
    }

    fn visible(&self) -> bool {
        *self.visible.lock().unwrap()
    }

    fn set_visible(&self, visible: bool, origin: VisibilityOrigin) {
        {
            let mut current = self.visible.lock().unwrap();
            if *current == visible {
                return;
            }
            *current = visible;
        }
        for callback in self.subscribers.lock().unwrap().values() {
            callback(visible, origin);
        }
    }

    fn changed(&self) {
        self.changed_count.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe_visibility(&self, callback: VisibilityCallback) -> SubscriptionId {
        let subscription = self.next_subscription.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscribers.lock().unwrap().insert(subscription, callback);
        subscription
    }

    fn unsubscribe_visibility(&self, subscription: SubscriptionId) {
        self.subscribers.lock().unwrap().remove(&subscription);
    }

    fn source(&self) -> Option<Arc<dyn LayerSource>> {
        self.source
            .as_ref()
            .map(|source| Arc::clone(source) as Arc<dyn LayerSource>)
    }
}

#[derive(Default)]
pub struct FakeCollection {
    layers: Mutex<Vec<Arc<dyn Layer>>>,
    subscribers: Mutex<HashMap<SubscriptionId, CollectionCallback>>,
    next_subscription: AtomicU64,
}

impl FakeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, layer: Arc<dyn Layer>) {
        self.layers.lock().unwrap().push(Arc::clone(&layer));
        for callback in self.subscribers.lock().unwrap().values() {
            callback(CollectionEvent::Added(Arc::clone(&layer)));
        }
    }

    pub fn remove(&self, layer: &Arc<dyn Layer>) {
        let target = layer.id();
        self.layers
            .lock()
            .unwrap()
            .retain(|member| member.id() != target);
        for callback in self.subscribers.lock().unwrap().values() {
            callback(CollectionEvent::Removed(Arc::clone(layer)));
        }
    }
}

impl LayerCollection for FakeCollection {
    fn snapshot(&self) -> Vec<Arc<dyn Layer>> {
        self.layers.lock().unwrap().clone()
    }

    fn subscribe(&self, callback: CollectionCallback) -> SubscriptionId {
        let subscription = self.next_subscription.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscribers.lock().unwrap().insert(subscription, callback);
        subscription
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.subscribers.lock().unwrap().remove(&subscription);
    }
}

/// Transport answering from (url substring, body) pairs.
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<Vec<(String, String)>>,
}

impl CannedTransport {
    pub fn new(responses: &[(&str, &str)]) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .iter()
                    .map(|(needle, body)| ((*needle).to_owned(), (*body).to_owned()))
                    .collect(),
            ),
        }
    }
}

impl Transport for CannedTransport {
    async fn get_text(&self, url: &Url) -> Result<String, Error> {
        let url_text = url.to_string();
        let responses = self.responses.lock().unwrap();
        responses
            .iter()
            .find(|(needle, _)| url_text.contains(needle))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| anyhow!("no canned response for {url_text}"))
    }
}

/// Transport that answers only once permits are released, for exercising
/// responses that land after the requesting layer is gone.
pub struct GatedTransport {
    pub gate: Arc<Semaphore>,
    inner: CannedTransport,
}

impl GatedTransport {
    pub fn new(responses: &[(&str, &str)]) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            inner: CannedTransport::new(responses),
        }
    }
}

impl Transport for GatedTransport {
    async fn get_text(&self, url: &Url) -> Result<String, Error> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| anyhow!("gate closed: {err}"))?;
        permit.forget();
        self.inner.get_text(url).await
    }
}
