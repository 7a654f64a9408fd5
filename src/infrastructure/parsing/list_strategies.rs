//! Search result extraction strategies
//!
//! The catalog renders results in several shapes depending on how far the
//! page's scripts got. Strategies are tried in priority order and the first
//! non-empty result wins:
//! 1. `registry`: the structured `window.PCGDECK` registry
//! 2. `containers`: item containers with explicit id attributes
//! 3. `links`: any link whose path embeds a five-digit id
//! 4. `images`: card image file names
//!
//! A record that cannot be built is skipped on its own; it never empties the page.

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};

use super::config::ListSelectors;
use super::context::ListParseContext;
use super::document::{RegistryEntry, RenderedDocument};
use super::{ParsingResult, compile_regex, compile_selector, element_text, normalize_whitespace, truncate_chars};
use crate::domain::{CardId, CardSummary, Category};

const LINK_NAME_MAX_CHARS: usize = 100;
const LINK_FULL_NAME_MAX_CHARS: usize = 200;
const DETAIL_LINK_PATTERN: &str = r"/card/(\d{5})/";
const IMAGE_FILE_PATTERN: &str = r"[/_](\d{5,6})_P_";

/// One independent way of reading a search result page
pub trait ListStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, document: &RenderedDocument, context: &ListParseContext) -> Vec<CardSummary>;
}

/// Result of running the strategy chain
#[derive(Debug, Clone, Default)]
pub struct ListExtraction {
    /// Name of the strategy that produced `cards`
    pub strategy: Option<&'static str>,
    pub cards: Vec<CardSummary>,
}

fn build_summary(
    card_id: CardId,
    name: Option<String>,
    full_name: Option<String>,
    category: Category,
    image_url: Option<String>,
    context: &ListParseContext,
) -> CardSummary {
    let mut summary = CardSummary::new(
        card_id.clone(),
        name.filter(|n| !n.is_empty()).unwrap_or_else(|| card_id.to_string()),
        context.regulation,
    );
    summary.full_name = full_name.filter(|n| !n.is_empty());
    summary.category = category;
    summary.image_url = image_url;
    summary.detail_url = Some(context.detail_url(&card_id));
    summary
}

fn first_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(|element| normalize_whitespace(&element_text(&element)))
        .find(|text| !text.is_empty())
}

fn registry_image(document: &RenderedDocument, card_id: &CardId, context: &ListParseContext) -> Option<String> {
    document
        .registry()
        .and_then(|registry| registry.image_path(card_id.as_str()))
        .map(|path| context.catalog.resolve(path))
}

/// Strategy (a): the in-page registry
pub struct RegistryStrategy {
    link: Selector,
    category_scope: Selector,
    category: Selector,
}

impl RegistryStrategy {
    pub fn new(selectors: &ListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            link: compile_selector(&selectors.item_link)?,
            category_scope: compile_selector(&selectors.category_scope)?,
            category: compile_selector(&selectors.item_category)?,
        })
    }

    /// Category label printed next to the card's link, when the page has one.
    fn category_for(&self, document: &RenderedDocument, card_id: &CardId) -> Category {
        let needle = format!("/card/{card_id}/");
        document
            .html()
            .select(&self.link)
            .find(|link| link.value().attr("href").is_some_and(|href| href.contains(&needle)))
            .and_then(|link| {
                link.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|ancestor| self.category_scope.matches(ancestor))
            })
            .and_then(|scope| first_text(&scope, &self.category))
            .map_or(Category::Unknown, |label| Category::from_label(&label))
    }

    fn summary_from_entry(
        &self,
        entry: &RegistryEntry,
        document: &RenderedDocument,
        context: &ListParseContext,
    ) -> Option<CardSummary> {
        let card_id = CardId::parse(&entry.id)?;
        let full_name = entry
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| entry.alt.as_deref().map(str::trim))
            .map(str::to_string);
        let name = entry
            .alt
            .as_deref()
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .map(str::to_string)
            .or_else(|| {
                full_name
                    .as_deref()
                    .and_then(|full| full.split('(').next())
                    .map(|base| base.trim().to_string())
            });
        let image_url = entry
            .pict
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| context.catalog.resolve(p));
        let category = self.category_for(document, &card_id);
        Some(build_summary(card_id, name, full_name, category, image_url, context))
    }
}

impl ListStrategy for RegistryStrategy {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn extract(&self, document: &RenderedDocument, context: &ListParseContext) -> Vec<CardSummary> {
        let Some(registry) = document.registry() else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        registry
            .entries
            .iter()
            .filter_map(|entry| {
                let summary = self.summary_from_entry(entry, document, context);
                if summary.is_none() {
                    debug!("Skipping registry entry with invalid id: {:?}", entry.id);
                }
                summary
            })
            .filter(|summary| seen.insert(summary.card_id.clone()))
            .collect()
    }
}

/// Strategy (b): containers with explicit identifying attributes
pub struct ContainerStrategy {
    container: Selector,
    link: Selector,
    name: Selector,
    full_name: Selector,
    category: Selector,
    image: Selector,
    detail_link: Regex,
}

impl ContainerStrategy {
    pub fn new(selectors: &ListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            container: compile_selector(&selectors.item_container)?,
            link: compile_selector(&selectors.item_link)?,
            name: compile_selector(&selectors.item_name)?,
            full_name: compile_selector(&selectors.item_full_name)?,
            category: compile_selector(&selectors.item_category)?,
            image: compile_selector("img")?,
            detail_link: compile_regex(DETAIL_LINK_PATTERN)?,
        })
    }

    fn card_id_of(&self, container: &ElementRef<'_>) -> Option<CardId> {
        if let Some(id) = container.value().attr("data-card-id").and_then(CardId::parse) {
            return Some(id);
        }
        container
            .select(&self.link)
            .filter_map(|link| link.value().attr("href"))
            .find_map(|href| {
                self.detail_link
                    .captures(href)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| CardId::parse(m.as_str()))
            })
    }

    fn summary_from_container(
        &self,
        container: &ElementRef<'_>,
        document: &RenderedDocument,
        context: &ListParseContext,
    ) -> Option<CardSummary> {
        let card_id = self.card_id_of(container)?;
        let name = first_text(container, &self.name);
        let full_name = first_text(container, &self.full_name).or_else(|| name.clone());
        let category = first_text(container, &self.category)
            .map_or(Category::Unknown, |label| Category::from_label(&label));
        let image_url = registry_image(document, &card_id, context).or_else(|| {
            container
                .select(&self.image)
                .find_map(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
                .filter(|src| !src.is_empty())
                .map(|src| context.catalog.resolve(src))
        });
        Some(build_summary(card_id, name, full_name, category, image_url, context))
    }
}

impl ListStrategy for ContainerStrategy {
    fn name(&self) -> &'static str {
        "containers"
    }

    fn extract(&self, document: &RenderedDocument, context: &ListParseContext) -> Vec<CardSummary> {
        let mut seen = HashSet::new();
        document
            .html()
            .select(&self.container)
            .filter_map(|container| self.summary_from_container(&container, document, context))
            .filter(|summary| seen.insert(summary.card_id.clone()))
            .collect()
    }
}

/// Strategy (c): links whose path embeds a five-digit id
pub struct LinkStrategy {
    link: Selector,
    detail_link: Regex,
}

impl LinkStrategy {
    pub fn new(selectors: &ListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            link: compile_selector(&selectors.item_link)?,
            detail_link: compile_regex(DETAIL_LINK_PATTERN)?,
        })
    }
}

impl ListStrategy for LinkStrategy {
    fn name(&self) -> &'static str {
        "links"
    }

    fn extract(&self, document: &RenderedDocument, context: &ListParseContext) -> Vec<CardSummary> {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for link in document.html().select(&self.link) {
            let Some(card_id) = link
                .value()
                .attr("href")
                .and_then(|href| self.detail_link.captures(href))
                .and_then(|caps| caps.get(1))
                .and_then(|m| CardId::parse(m.as_str()))
            else {
                continue;
            };
            if !seen.insert(card_id.clone()) {
                continue;
            }
            let text = normalize_whitespace(&element_text(&link));
            let name = Some(truncate_chars(&text, LINK_NAME_MAX_CHARS));
            let full_name = Some(truncate_chars(&text, LINK_FULL_NAME_MAX_CHARS));
            let image_url = registry_image(document, &card_id, context);
            cards.push(build_summary(card_id, name, full_name, Category::Unknown, image_url, context));
        }
        cards
    }
}

/// Strategy (d): card image file names
pub struct ImageStrategy {
    image: Selector,
    file_name: Regex,
}

impl ImageStrategy {
    pub fn new(selectors: &ListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            image: compile_selector(&selectors.card_image)?,
            file_name: compile_regex(IMAGE_FILE_PATTERN)?,
        })
    }
}

impl ListStrategy for ImageStrategy {
    fn name(&self) -> &'static str {
        "images"
    }

    fn extract(&self, document: &RenderedDocument, context: &ListParseContext) -> Vec<CardSummary> {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for img in document.html().select(&self.image) {
            let Some(src) = img
                .value()
                .attr("src")
                .filter(|src| self.file_name.is_match(src))
                .or_else(|| img.value().attr("data-src"))
            else {
                continue;
            };
            let Some(card_id) = self
                .file_name
                .captures(src)
                .and_then(|caps| caps.get(1))
                .and_then(|m| CardId::from_numeric(m.as_str()))
            else {
                continue;
            };
            if !seen.insert(card_id.clone()) {
                continue;
            }
            let name = img.value().attr("alt").map(normalize_whitespace);
            let image_url = Some(context.catalog.resolve(src));
            cards.push(build_summary(card_id, name.clone(), name, Category::Unknown, image_url, context));
        }
        cards
    }
}

/// Runs the strategies in priority order
pub struct ListPageParser {
    strategies: Vec<Box<dyn ListStrategy>>,
}

impl ListPageParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ListSelectors::default())
    }

    pub fn with_config(selectors: &ListSelectors) -> ParsingResult<Self> {
        Ok(Self {
            strategies: vec![
                Box::new(RegistryStrategy::new(selectors)?),
                Box::new(ContainerStrategy::new(selectors)?),
                Box::new(LinkStrategy::new(selectors)?),
                Box::new(ImageStrategy::new(selectors)?),
            ],
        })
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First non-empty strategy result.
    pub fn parse(&self, document: &RenderedDocument, context: &ListParseContext) -> ListExtraction {
        for strategy in &self.strategies {
            let cards = strategy.extract(document, context);
            if !cards.is_empty() {
                debug!(strategy = strategy.name(), count = cards.len(), "Search results extracted");
                return ListExtraction {
                    strategy: Some(strategy.name()),
                    cards,
                };
            }
        }
        warn!("No extraction strategy produced cards");
        ListExtraction::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Regulation;
    use crate::infrastructure::config::CatalogConfig;
    use crate::infrastructure::parsing::document::SearchRegistry;

    fn context() -> ListParseContext {
        ListParseContext::new(Regulation::SV, CatalogConfig::default())
    }

    fn parser() -> ListPageParser {
        ListPageParser::new().unwrap()
    }

    const LINKS_AND_IMAGES: &str = r#"
        <html><body><main>
          <ul>
            <li><a href="/card-search/details.php/card/45123/regu/SV/"><img src="/assets/images/card_images/large/SV1/045123_P_PIKACHU.jpg" alt="ピカチュウ"> ピカチュウ </a></li>
            <li><a href="/card-search/details.php/card/45124/">ライチュウ</a></li>
            <li><a href="/card-search/details.php/card/45123/">ピカチュウ again</a></li>
            <li><a href="/card-search/details.php/card/123/">broken</a></li>
          </ul>
        </main></body></html>"#;

    #[test]
    fn link_strategy_wins_when_no_registry_or_containers() {
        let document = RenderedDocument::parse(LINKS_AND_IMAGES, None);
        let extraction = parser().parse(&document, &context());

        assert_eq!(extraction.strategy, Some("links"));
        let ids: Vec<_> = extraction.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["45123", "45124"]);
        assert_eq!(extraction.cards[0].name, "ピカチュウ");
        assert_eq!(extraction.cards[0].regulation, Regulation::SV);
        assert_eq!(
            extraction.cards[1].detail_url.as_deref(),
            Some("https://www.pokemon-card.com/card-search/details.php/card/45124/")
        );
    }

    #[test]
    fn registry_takes_priority_over_dom() {
        let registry = SearchRegistry {
            entries: vec![
                RegistryEntry {
                    id: "45123".into(),
                    name: Some("ピカチュウex(SV1)".into()),
                    alt: None,
                    pict: Some("/assets/images/card_images/large/SV1/045123_P_PIKACHU.jpg".into()),
                },
                RegistryEntry {
                    id: "bad".into(),
                    name: Some("ignored".into()),
                    alt: None,
                    pict: None,
                },
            ],
            images: Default::default(),
        };
        let document = RenderedDocument::parse(LINKS_AND_IMAGES, Some(registry));
        let extraction = parser().parse(&document, &context());

        assert_eq!(extraction.strategy, Some("registry"));
        assert_eq!(extraction.cards.len(), 1);
        let card = &extraction.cards[0];
        assert_eq!(card.name, "ピカチュウex");
        assert_eq!(card.full_name.as_deref(), Some("ピカチュウex(SV1)"));
        assert_eq!(
            card.image_url.as_deref(),
            Some("https://www.pokemon-card.com/assets/images/card_images/large/SV1/045123_P_PIKACHU.jpg")
        );
    }

    #[test]
    fn registry_reads_category_from_surrounding_item() {
        let html = r#"<div class="card-item"><a href="/card-search/details.php/card/40001/">x</a><span class="category">グッズ</span></div>"#;
        let registry = SearchRegistry {
            entries: vec![RegistryEntry {
                id: "40001".into(),
                name: Some("ネストボール".into()),
                alt: Some("ネストボール".into()),
                pict: None,
            }],
            images: Default::default(),
        };
        let document = RenderedDocument::parse(html, Some(registry));
        let cards = RegistryStrategy::new(&ListSelectors::default())
            .unwrap()
            .extract(&document, &context());
        assert_eq!(cards[0].category, Category::Goods);
    }

    #[test]
    fn containers_use_data_attribute_and_names() {
        let html = r#"
            <table><tbody>
              <tr data-card-id="40010"><td> リーリエの決心 </td><td><span class="category">サポート</span></td></tr>
              <tr data-card-id="oops"><td>no id</td></tr>
            </tbody></table>"#;
        let document = RenderedDocument::parse(html, None);
        let extraction = parser().parse(&document, &context());

        assert_eq!(extraction.strategy, Some("containers"));
        assert_eq!(extraction.cards.len(), 1);
        assert_eq!(extraction.cards[0].name, "リーリエの決心");
        assert_eq!(extraction.cards[0].category, Category::Support);
    }

    #[test]
    fn image_strategy_normalizes_file_name_ids() {
        let html = r#"
            <div>
              <img src="https://www.pokemon-card.com/assets/images/card_images/large/SV2a/045200_P_FUSHIGIDANE.jpg" alt="フシギダネ">
              <img data-src="/assets/images/card_images/large/SV2a/045201_P_FUSHIGISOU.jpg" alt="フシギソウ" src="data:image/gif;base64,R0lG">
              <img src="/assets/images/card_images/large/SV2a/045200_P_FUSHIGIDANE.jpg" alt="dup">
            </div>"#;
        let document = RenderedDocument::parse(html, None);
        let extraction = parser().parse(&document, &context());

        assert_eq!(extraction.strategy, Some("images"));
        let ids: Vec<_> = extraction.cards.iter().map(|c| c.card_id.as_str()).collect();
        assert_eq!(ids, vec!["45200", "45201"]);
        assert_eq!(extraction.cards[1].name, "フシギソウ");
    }

    #[test]
    fn empty_page_yields_no_strategy() {
        let document = RenderedDocument::parse("<html><body><p>検索結果はありません</p></body></html>", None);
        let extraction = parser().parse(&document, &context());
        assert!(extraction.strategy.is_none());
        assert!(extraction.cards.is_empty());
    }

    #[test]
    fn strategies_are_ordered() {
        assert_eq!(parser().strategy_names(), vec!["registry", "containers", "links", "images"]);
    }
}
