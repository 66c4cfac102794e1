//! Report parameters passed to renderers.

use serde_json::{Map, Value};

/// Parameter key carrying the report locale.
pub const LOCALE_KEY: &str = "REPORT_LOCALE";

/// Target locale for KUDE reports.
pub const DEFAULT_LOCALE: &str = "es_PY";

/// Report parameters with a locale entry that is always present.
///
/// Caller-supplied parameters are merged first and the locale is applied last,
/// so a caller can neither remove nor replace [`LOCALE_KEY`]. Keys iterate in
/// sorted order, which keeps serialized output stable.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParameters {
    values: Map<String, Value>,
    locale: String,
}

impl RenderParameters {
    /// Parameters containing only the locale entry.
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        let mut values = Map::new();
        values.insert(LOCALE_KEY.to_owned(), Value::String(locale.clone()));
        Self { values, locale }
    }

    /// Merge caller parameters on top of the current ones.
    ///
    /// A caller value for [`LOCALE_KEY`] is ignored.
    #[must_use]
    pub fn merge(mut self, caller: Map<String, Value>) -> Self {
        for (key, value) in caller {
            if key == LOCALE_KEY {
                tracing::debug!("ignoring caller override of {LOCALE_KEY}");
                continue;
            }
            self.values.insert(key, value);
        }
        self
    }

    /// Merge caller parameters given as a JSON object string.
    ///
    /// Input that is not a JSON object is logged and ignored; rendering still
    /// proceeds with the locale entry.
    #[must_use]
    pub fn merge_json_lenient(self, json: &str) -> Self {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => self.merge(map),
            Ok(other) => {
                tracing::warn!("ignoring render parameters: expected a JSON object, got {other}");
                self
            }
            Err(e) => {
                tracing::warn!("ignoring render parameters: could not parse {json:?} as JSON: {e}");
                self
            }
        }
    }

    /// Replace the locale entry, keeping every other parameter.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self.values
            .insert(LOCALE_KEY.to_owned(), Value::String(self.locale.clone()));
        self
    }

    /// Locale value.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of parameters, including the locale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: the locale entry is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compact JSON object, as passed on a command line.
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.values.clone()).to_string()
    }

    /// Indented JSON object, for display.
    #[must_use]
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| self.to_json())
    }
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}
