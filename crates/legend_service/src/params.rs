use std::time::{SystemTime, UNIX_EPOCH};

use urlencoding::encode;

/// Pixel width of generated legend icons.
pub const LEGEND_ICON_WIDTH: u32 = 20;
/// Pixel height of generated legend icons.
pub const LEGEND_ICON_HEIGHT: u32 = 20;

/// An ordered key/value option map for GET requests.
///
/// Keys keep insertion order; setting an existing key overwrites its value in
/// place. Entries with an empty value are skipped during formatting, which is
/// how optional service parameters are left out of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    entries: Vec<(String, String)>,
}

impl QueryOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter, overwriting a previous value for the same key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| name == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_owned(), value));
        }
    }

    /// Builder-style [`Self::set`].
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Formats the options as a query string.
    ///
    /// Values are percent-encoded and empty values are skipped. With
    /// `leading_mark` the result starts with `?`. With `no_cache` a
    /// uniquifier is appended so intermediaries cannot serve a cached
    /// response.
    #[must_use]
    pub fn format(&self, leading_mark: bool, no_cache: bool) -> String {
        let mut out = String::from(if leading_mark { "?" } else { "" });
        let mut first = true;
        for (key, value) in &self.entries {
            if value.is_empty() {
                continue;
            }
            if !first {
                out.push('&');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(&encode(value));
            first = false;
        }
        if no_cache {
            if !first {
                out.push('&');
            }
            out.push_str(&cache_buster());
        }
        out
    }
}

/// A per-call uniquifier appended in `no_cache` mode.
fn cache_buster() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    nanos.to_string()
}

/// Default options for a `GetLegendGraphic` request.
///
/// `json` selects the JSON legend description; otherwise a PNG icon is
/// requested. Labels are suppressed and empty rules hidden so the response
/// only carries the style classes themselves.
#[must_use]
pub fn legend_graphic_options(json: bool) -> QueryOptions {
    QueryOptions::new()
        .with("request", "GetLegendGraphic")
        .with("version", "1.3.0")
        .with("format", if json { "application/json" } else { "image/png" })
        .with("exceptions", "application/json")
        .with("width", LEGEND_ICON_WIDTH.to_string())
        .with("height", LEGEND_ICON_HEIGHT.to_string())
        .with("transparent", "true")
        .with("legend_options", "forceLabels:off")
        .with("hideEmptyRules", "true")
}

/// Default options for a WFS feature query.
#[must_use]
pub fn feature_query_options(version: Option<&str>) -> QueryOptions {
    QueryOptions::new()
        .with("service", "WFS")
        .with("version", version.unwrap_or("1.0.0"))
        .with("outputformat", "application/json")
        .with("exceptions", "application/json")
}
