//! Wire-level client for legend-description and feature-query services.
//!
//! This crate covers everything between a map layer and its backing server:
//! query-string encoding, `GetLegendGraphic` and `GetFeature` request
//! construction, the JSON response models for both services, and the
//! discovery routine that turns a published layer name into a list of legend
//! symbols plus the attribute values currently present in the layer's data.

/// Legend discovery pipeline combining both remote services
pub mod discovery;
/// Feature-collection response model for attribute-presence queries
pub mod features;
/// Legend-description response model and rule parsing
pub mod legend;
/// Query-string codec with defaults for both services
pub mod params;
/// Request URL builders
pub mod requests;
/// HTTP transport abstraction
pub mod transport;
