//! HTML parsing for the card catalog
//!
//! Pages are snapshotted from the browser and parsed with `scraper`:
//! - `list_strategies`: ordered fallback strategies for search result pages
//! - `detail_fields`: independent field extractors for card detail pages
//!
//! Selectors live in [`ParsingConfig`] and are compiled once per parser.

pub mod config;
pub mod context;
pub mod detail_fields;
pub mod document;
pub mod error;
pub mod list_strategies;

pub use config::{DetailSelectors, ListSelectors, ParsingConfig};
pub use context::{DetailParseContext, ListParseContext};
pub use detail_fields::DetailPageParser;
pub use document::{REGISTRY_SCRIPT, RegistryEntry, RenderedDocument, SearchRegistry};
pub use error::{ParsingError, ParsingResult};
pub use list_strategies::{ListPageParser, ListStrategy};

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Compile a CSS selector, keeping the source text in the error
pub(crate) fn compile_selector(css: &str) -> ParsingResult<Selector> {
    Selector::parse(css).map_err(|e| ParsingError::invalid_selector(css, &e.to_string()))
}

pub(crate) fn compile_regex(pattern: &str) -> ParsingResult<Regex> {
    Regex::new(pattern).map_err(|e| ParsingError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Collapses whitespace runs to one space and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Concatenated text content of an element (like DOM `textContent`).
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// Truncates to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Visible text of the document: trimmed text nodes outside
/// `script`/`style`/`noscript`/`template`, one per line.
pub fn visible_text(html: &Html) -> String {
    const HIDDEN: [&str; 5] = ["script", "style", "noscript", "template", "head"];

    let mut lines = Vec::new();
    for node in html.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_scripts() {
        let html = Html::parse_document(
            "<html><head><title>t</title></head><body><p> HP <b>60</b></p><script>var x = 1;</script></body></html>",
        );
        assert_eq!(visible_text(&html), "HP\n60");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(normalize_whitespace("  ピカチュウ \n\t ex "), "ピカチュウ ex");
    }
}
