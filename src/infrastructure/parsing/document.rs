//! Queryable snapshot of a rendered catalog page
//!
//! The catalog's search page may expose a structured registry on
//! `window.PCGDECK` (id -> name / alt name / image path). Most pages of the
//! detail view and many slow search renders do not; that is the normal case.

use std::collections::HashMap;

use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Reads `window.PCGDECK` into a [`SearchRegistry`]-shaped JSON value, or `null`.
///
/// Entries keep the key order of `searchItemName`.
pub const REGISTRY_SCRIPT: &str = r"(() => {
  const deck = window.PCGDECK;
  if (!deck) return null;
  const names = deck.searchItemName || {};
  const alts = deck.searchItemNameAlt || {};
  const picts = deck.searchItemCardPict || {};
  const text = (v) => (v === undefined || v === null ? null : String(v));
  return {
    entries: Object.keys(names).map((id) => ({
      id: String(id),
      name: text(names[id]),
      alt: text(alts[id]),
      pict: text(picts[id]),
    })),
    images: Object.fromEntries(Object.keys(picts).map((id) => [String(id), String(picts[id])])),
  };
})()";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub name: Option<String>,
    pub alt: Option<String>,
    pub pict: Option<String>,
}

/// In-page id -> name/altName/imagePath registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchRegistry {
    #[serde(default)]
    pub entries: Vec<RegistryEntry>,
    #[serde(default)]
    pub images: HashMap<String, String>,
}

impl SearchRegistry {
    /// `None` for `null` or for values that do not have the registry shape.
    pub fn from_value(value: Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(registry) => Some(registry),
            Err(e) => {
                debug!("Ignoring malformed in-page registry: {}", e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.images.is_empty()
    }

    pub fn image_path(&self, card_id: &str) -> Option<&str> {
        self.images
            .get(card_id)
            .map(String::as_str)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.id == card_id)
                    .and_then(|entry| entry.pict.as_deref())
            })
            .filter(|path| !path.is_empty())
    }
}

/// Parsed HTML plus the optional registry
pub struct RenderedDocument {
    html: Html,
    registry: Option<SearchRegistry>,
}

impl RenderedDocument {
    pub fn parse(html: &str, registry: Option<SearchRegistry>) -> Self {
        Self {
            html: Html::parse_document(html),
            registry: registry.filter(|r| !r.is_empty()),
        }
    }

    pub const fn html(&self) -> &Html {
        &self.html
    }

    pub const fn registry(&self) -> Option<&SearchRegistry> {
        self.registry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registry_parses_script_output() {
        let registry = SearchRegistry::from_value(json!({
            "entries": [{"id": "45123", "name": "ピカチュウ(SV1)", "alt": "ピカチュウ", "pict": "/a/45123_P.jpg"}],
            "images": {"45123": "/a/45123_P.jpg"}
        }))
        .unwrap();
        assert_eq!(registry.entries.len(), 1);
        assert_eq!(registry.image_path("45123"), Some("/a/45123_P.jpg"));
        assert_eq!(registry.image_path("99999"), None);
    }

    #[test]
    fn null_or_malformed_registry_is_absent() {
        assert!(SearchRegistry::from_value(Value::Null).is_none());
        assert!(SearchRegistry::from_value(json!({"entries": "nope"})).is_none());
    }

    #[test]
    fn empty_registry_is_dropped_from_document() {
        let document = RenderedDocument::parse("<html></html>", Some(SearchRegistry::default()));
        assert!(document.registry().is_none());
    }
}
