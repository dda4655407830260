use anyhow::{Error, anyhow};
use log::{debug, warn};
use url::Url;

use crate::features::{FeatureCollection, property_values};
use crate::legend::{LegendGraphicResponse, SymbolKind, summarize_rule};
use crate::requests::{feature_query_url, legend_graphic_url};
use crate::transport::Transport;

/// One symbol parsed out of the legend description, prior to per-layer
/// formatting (no namespacing, no checked/disabled state yet).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSymbol {
    /// The raw attribute value this symbol represents; the rule name when the
    /// legend has no attribute filter.
    pub filter_value: String,
    pub label: String,
    pub icon_url: Option<String>,
    pub kind: Option<SymbolKind>,
}

/// Result of a successful legend discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredLegend {
    pub symbols: Vec<RuleSymbol>,
    /// The single data attribute distinguishing the symbols, when one exists.
    pub filter_property: Option<String>,
    /// Attribute values actually present in the layer's data right now.
    pub present_values: Vec<String>,
}

/// Discovers a layer's legend symbols from the remote services.
///
/// Fetches the JSON legend description for `layer_name`, parses its rules
/// into symbols, and — when the rules establish an attribute-filter property
/// — issues a feature query (scoped by `existing_filter`) to learn which
/// attribute values are present in the data. Without a filter property the
/// layer is a single-legend layer and only the first symbol is kept.
///
/// Malformed or empty legend responses resolve to `Ok(None)`: the layer
/// simply has no discoverable symbols.
///
/// # Errors
///
/// Returns `Err` when either request fails, when the feature response cannot
/// be parsed, or when the feature service answers with an exceptions payload.
pub async fn discover<T: Transport>(
    transport: &T,
    base: &Url,
    layer_name: &str,
    existing_filter: Option<&str>,
) -> Result<Option<DiscoveredLegend>, Error> {
    let request = legend_graphic_url(base, layer_name, true, None);
    let body = transport.get_text(&request).await?;
    let response: LegendGraphicResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("malformed legend response for {layer_name}: {err}");
            return Ok(None);
        }
    };
    let Some(legend) = response.legends.first() else {
        warn!("legend response for {layer_name} has no legends");
        return Ok(None);
    };
    if legend.rules.is_empty() {
        warn!("legend for {layer_name} has no rules");
        return Ok(None);
    }

    let mut filter_property: Option<String> = None;
    let mut symbols = Vec::new();
    for rule in &legend.rules {
        let Some(summary) = summarize_rule(rule) else {
            continue;
        };
        if summary.raster {
            // Raster colormap entries are not collected; raster rules
            // contribute nothing to the symbol list.
            debug!("skipping raster rule {} for {layer_name}", summary.name);
            continue;
        }
        // All rules of one legend are assumed to share a single attribute.
        let filter_value = summary.filter_pair.map(|(attribute, value)| {
            filter_property = Some(attribute.to_owned());
            value.to_owned()
        });
        let filter_value = match (&filter_property, filter_value) {
            (Some(_), Some(value)) => value,
            (Some(_), None) => String::new(),
            (None, _) => summary.name.to_owned(),
        };
        let icon_url = summary.icon_url.map_or_else(
            || legend_graphic_url(base, layer_name, false, Some(summary.name)).to_string(),
            str::to_owned,
        );
        symbols.push(RuleSymbol {
            filter_value,
            label: summary.label.to_owned(),
            icon_url: Some(icon_url),
            kind: summary.kind,
        });
    }
    if symbols.is_empty() {
        warn!("legend for {layer_name} yielded no symbols");
        return Ok(None);
    }

    let Some(property) = filter_property else {
        // Single-legend layer: the one symbol is always present.
        symbols.truncate(1);
        let present_values = vec![symbols[0].filter_value.clone()];
        return Ok(Some(DiscoveredLegend {
            symbols,
            filter_property: None,
            present_values,
        }));
    };

    let query = feature_query_url(base, layer_name, existing_filter, Some(&property));
    let body = transport.get_text(&query).await?;
    let collection: FeatureCollection = serde_json::from_str(&body)
        .map_err(|err| anyhow!("malformed feature response for {layer_name}: {err}"))?;
    if let Some(exceptions) = collection.exceptions {
        return Err(anyhow!(
            "feature query for {layer_name} returned exceptions: {exceptions}"
        ));
    }
    let present_values = property_values(&collection, &property);
    Ok(Some(DiscoveredLegend {
        symbols,
        filter_property: Some(property),
        present_values,
    }))
}
