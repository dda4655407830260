use std::collections::HashMap;

use crate::state::LayerState;
use crate::symbol::SymbolDescriptor;

/// Recomputes the merged symbol list from per-layer states.
///
/// A full deterministic recompute: layers that are not currently visible or
/// have no discovered symbols contribute nothing; duplicate ids fold with
/// `disabled` AND-ed (disabled only if every contributor is) and `is_checked`
/// OR-ed (checked if any contributor is). Output keeps first-seen insertion
/// order, so the result is stable for a given layer order.
#[must_use]
pub fn merge_symbols<'table>(
    states: impl IntoIterator<Item = &'table LayerState>,
) -> Vec<SymbolDescriptor> {
    let mut order: Vec<String> = Vec::new();
    let mut cache: HashMap<String, SymbolDescriptor> = HashMap::new();
    for state in states {
        if !state.current_visible || state.symbols.is_empty() {
            continue;
        }
        for symbol in &state.symbols {
            if let Some(merged) = cache.get_mut(&symbol.id) {
                merged.disabled = merged.disabled && symbol.disabled;
                merged.is_checked = merged.is_checked || symbol.is_checked;
            } else {
                order.push(symbol.id.clone());
                cache.insert(symbol.id.clone(), symbol.clone());
            }
        }
    }
    order
        .into_iter()
        .filter_map(|symbol_id| cache.remove(&symbol_id))
        .collect()
}

/// Filters the merged list down to what the panel currently shows.
///
/// Symbols the UI cannot toggle are always included; toggleable ones only
/// when enabled, unless the show-all override is set.
#[must_use]
pub fn current_view(total: &[SymbolDescriptor], show_all: bool) -> Vec<SymbolDescriptor> {
    total
        .iter()
        .filter(|symbol| !symbol.show_check_box || !symbol.disabled || show_all)
        .cloned()
        .collect()
}
