use std::collections::HashMap;

use log::{error, warn};

use crate::layer::{Layer, VisibilityOrigin};
use crate::state::LayerState;
use crate::symbol::SymbolDescriptor;

/// Server-side filter parameter the translator writes.
pub const FILTER_PARAM: &str = "CQL_FILTER";

/// Pushes a toggle into the underlying layer.
///
/// `state` must already carry the new checked flags. Three cases, selected by
/// the layer's attribute-filter property and symbol count:
///
/// - no filter property, single symbol: flip layer visibility directly;
/// - no filter property, multiple symbols: rebuild the per-symbol visibility
///   map from the symbols' checked flags and trigger a redraw. A targeted
///   toggle forces the layer visible so the map governs rendering instead of
///   the coarse visibility flag;
/// - filter property: generate an attribute filter expression and push it as
///   the source's server-side filter parameter.
///
/// Every visibility write is tagged [`VisibilityOrigin::SymbolDriven`] so the
/// registration observer does not treat it as an external change.
pub fn apply(layer: &dyn Layer, state: &LayerState, is_checked: bool, symbol_id: Option<&str>) {
    let Some(filter_property) = layer.filter_property() else {
        apply_direct(layer, state, is_checked, symbol_id);
        return;
    };
    let Some(source) = layer.source() else {
        warn!("layer has a filter property but no source to push it to");
        return;
    };
    let expression = filter_expression(&filter_property, &state.symbols);
    let mut params = HashMap::new();
    params.insert(FILTER_PARAM.to_owned(), expression);
    source.update_params(params);
}

fn apply_direct(layer: &dyn Layer, state: &LayerState, is_checked: bool, symbol_id: Option<&str>) {
    if state.symbols.len() <= 1 {
        layer.set_visible(is_checked, VisibilityOrigin::SymbolDriven);
        return;
    }
    if let Some(symbol_id) = symbol_id
        && !state.symbols.iter().any(|symbol| symbol.id == symbol_id)
    {
        error!("cannot resolve symbol {symbol_id} on its layer");
        return;
    }
    let map: HashMap<String, bool> = state
        .symbols
        .iter()
        .map(|symbol| (symbol.filter_value.clone(), symbol.is_checked))
        .collect();
    layer.set_symbol_visibility(map);
    layer.changed();
    if symbol_id.is_some() {
        // The per-symbol map now governs fine-grained rendering.
        layer.set_visible(true, VisibilityOrigin::SymbolDriven);
    } else {
        layer.set_visible(is_checked, VisibilityOrigin::SymbolDriven);
    }
}

/// Builds the attribute filter over checked-and-enabled symbol values.
///
/// With at least one checked symbol: `property in ('v1','v2')`. With none:
/// `property not in (…every known value…)`, so nothing matches.
#[must_use]
pub fn filter_expression(property: &str, symbols: &[SymbolDescriptor]) -> String {
    let checked: Vec<String> = symbols
        .iter()
        .filter(|symbol| symbol.is_checked && !symbol.disabled)
        .map(|symbol| format!("'{}'", symbol.filter_value))
        .collect();
    if checked.is_empty() {
        let all: Vec<String> = symbols
            .iter()
            .map(|symbol| format!("'{}'", symbol.filter_value))
            .collect();
        format!("{property} not in ({})", all.join(","))
    } else {
        format!("{property} in ({})", checked.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::filter_expression;
    use crate::symbol::SymbolDescriptor;

    fn symbol(value: &str, is_checked: bool, disabled: bool) -> SymbolDescriptor {
        SymbolDescriptor {
            id: format!("layer_{value}"),
            label: value.to_owned(),
            icon_url: None,
            filter_value: value.to_owned(),
            is_checked,
            disabled,
            show_check_box: true,
            kind: None,
        }
    }

    #[test]
    fn checked_enabled_values_form_an_in_clause() {
        let symbols = vec![
            symbol("A", true, false),
            symbol("B", false, false),
            symbol("C", true, true),
        ];
        assert_eq!(filter_expression("CAT", &symbols), "CAT in ('A')");
    }

    #[test]
    fn nothing_checked_excludes_every_known_value() {
        let symbols = vec![
            symbol("A", false, false),
            symbol("B", false, false),
            symbol("C", false, true),
        ];
        assert_eq!(
            filter_expression("CAT", &symbols),
            "CAT not in ('A','B','C')"
        );
    }

    #[test]
    fn multiple_checked_values_join_without_spaces() {
        let symbols = vec![symbol("A", true, false), symbol("B", true, false)];
        assert_eq!(filter_expression("CAT", &symbols), "CAT in ('A','B')");
    }
}
