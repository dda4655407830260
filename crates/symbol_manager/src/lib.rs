//! Legend symbol state synchronization for map layer stacks.
//!
//! This crate keeps a set of map display layers and their legend symbols in
//! sync: it caches per-layer symbol state, merges it into one global symbol
//! view for a UI panel, and translates user toggles back into layer
//! visibility or attribute-filter changes on the layer's data source. Layers,
//! sources and the layer collection are consumed through traits in [`layer`];
//! remote legend discovery comes from the `legend_service` crate.

pub mod layer;
/// The `SymbolManager` facade wiring registration, discovery, merging and
/// notification together
pub mod manager;
/// Global symbol view recomputation
pub mod merge;
/// Debounced recompute scheduling
pub mod scheduler;
/// Per-layer state table and symbol formatting
pub mod state;
pub mod symbol;
/// Toggle-to-layer-mutation translation
pub mod translate;

pub use manager::{ManagerConfig, SymbolManager};
pub use symbol::{SymbolDescriptor, SymbolUpdate};
