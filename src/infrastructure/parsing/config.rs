//! Parsing configuration for HTML extraction
//!
//! Centralized CSS selectors for search result and card detail pages.
//! Each entry is a selector group; matches are taken in document order.

use serde::{Deserialize, Serialize};

/// Main parsing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    pub list: ListSelectors,
    pub detail: DetailSelectors,
}

/// CSS selectors for search result pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSelectors {
    /// Containers carrying an explicit card id
    pub item_container: String,
    pub item_link: String,
    pub item_name: String,
    pub item_full_name: String,
    pub item_category: String,
    /// Ancestors searched for a category label when reading the registry
    pub category_scope: String,
    pub card_image: String,
}

impl Default for ListSelectors {
    fn default() -> Self {
        Self {
            item_container: ".card-item, .search-result-item, [data-card-id], .result-item, .card-list-item, tr[data-card-id]".to_string(),
            item_link: "a[href*=\"/card/\"]".to_string(),
            item_name: ".card-name, .name, h3, h4, .card-title, td".to_string(),
            item_full_name: ".full-name, .card-full-name, .card-name-full".to_string(),
            item_category: ".category, .card-type, .card-category".to_string(),
            category_scope: ".card-item, .search-result-item, .result-item".to_string(),
            card_image: "img[src*=\"card_images\"], img[data-src*=\"card_images\"], img[src*=\"pokemon-card.com\"]".to_string(),
        }
    }
}

/// CSS selectors for card detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    pub title: String,
    pub section_heading: String,
    pub energy_icon: String,
    pub evolution_label: String,
    pub type_icon: String,
    pub table: String,
    pub table_row: String,
    pub table_cell: String,
    pub regulation_logo: String,
    pub link: String,
    pub rarity: String,
    pub illustrator_label: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            title: "h1".to_string(),
            section_heading: "h2".to_string(),
            energy_icon: "span.icon, img".to_string(),
            evolution_label: "span.type".to_string(),
            type_icon: ".type-icon, .pokemon-type, .hp-type ~ span[class*=\"icon-\"]".to_string(),
            table: "table".to_string(),
            table_row: "tr".to_string(),
            table_cell: "td".to_string(),
            regulation_logo: "img[src*=\"/regulation_logo_\"]".to_string(),
            link: "a".to_string(),
            rarity: "img[src*=\"/rarity/\"], .rarity, .card-rarity".to_string(),
            illustrator_label: "h4, h3, p, span, div".to_string(),
        }
    }
}
