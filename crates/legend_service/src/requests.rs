use url::Url;

use crate::params::{feature_query_options, legend_graphic_options};

/// Builds a `GetLegendGraphic` request URL for a published layer.
///
/// With `json` the URL asks for the JSON legend description; without it a PNG
/// icon is requested, optionally narrowed to a single named rule.
#[must_use]
pub fn legend_graphic_url(base: &Url, layer: &str, json: bool, rule: Option<&str>) -> Url {
    let mut options = legend_graphic_options(json).with("layer", layer);
    if let Some(rule) = rule {
        options.set("rule", rule);
    }
    let mut url = base.clone();
    url.set_query(Some(&options.format(false, false)));
    url
}

/// Builds a WFS `GetFeature` request URL.
///
/// The query is scoped by the layer's existing attribute filter when one is
/// given, and projected to a single attribute via `property`. The request is
/// marked no-cache since the attribute presence it reports changes with the
/// data.
#[must_use]
pub fn feature_query_url(
    base: &Url,
    type_name: &str,
    filter: Option<&str>,
    property: Option<&str>,
) -> Url {
    let mut options = feature_query_options(None)
        .with("request", "GetFeature")
        .with("typename", type_name);
    if let Some(filter) = filter {
        options.set("cql_filter", filter);
    }
    if let Some(property) = property {
        options.set("propertyName", property);
    }
    let mut url = base.clone();
    url.set_query(Some(&options.format(false, true)));
    url
}

/// Derives a `workspace:layer` published name from a service URL.
///
/// Server URLs place the workspace and layer as the last path segments before
/// the service endpoint, e.g. `http://host/geoserver/topp/states/wms` yields
/// `topp:states`.
#[must_use]
pub fn type_name_from_url(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 3 {
        return None;
    }
    let workspace = parts[parts.len() - 3];
    let layer = parts[parts.len() - 2];
    if workspace.is_empty() || layer.is_empty() {
        return None;
    }
    Some(format!("{workspace}:{layer}"))
}
