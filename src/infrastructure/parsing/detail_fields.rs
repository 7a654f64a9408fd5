//! Card detail page field extractors
//!
//! Every extractor is a pure read of the page snapshot and they share no
//! state, so [`DetailPageParser::parse`] runs them concurrently on the rayon
//! pool. `scraper::Html` is not `Sync`; each extractor parses its own tree.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::DetailSelectors;
use super::context::DetailParseContext;
use super::{ParsingResult, compile_regex, compile_selector, element_text, normalize_whitespace, visible_text};
use crate::domain::{
    Ability, CardDetail, CardSummary, Category, DamageModifier, ElementalType, EnergyKind,
    EvolutionStage, Move, TypedValue,
};

const MOVES_HEADING: &str = "ワザ";
const ABILITIES_HEADING: &str = "特性";
const EVOLUTION_MARKER: &str = "進化";
const ILLUSTRATOR_LABEL: &str = "イラストレーター";
const ENERGY_NAME_MARKER: &str = "エネルギー";
const STAT_TABLE_HEADERS: [&str; 3] = ["弱点", "抵抗力", "にげる"];
const TRAINER_ENERGY_HEADINGS: [&str; 6] = [
    "グッズ",
    "ポケモンのどうぐ",
    "サポート",
    "スタジアム",
    "基本エネルギー",
    "特殊エネルギー",
];
const SET_NAME_MARKERS: [&str; 2] = ["拡張パック", "スターター"];

/// Display name and full name from the page heading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFields {
    pub name: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicFields {
    pub hp: Option<i32>,
    pub evolution_stage: Option<EvolutionStage>,
    pub elemental_type: Option<String>,
    /// From a trainer/energy section heading
    pub heading_category: Option<Category>,
    /// From a category word anywhere in the page text
    pub text_category: Option<Category>,
}

impl BasicFields {
    /// Heading category, else Pokémon when an HP value exists, else the text match.
    pub fn category(&self) -> Category {
        self.heading_category
            .or_else(|| self.hp.map(|_| Category::Pokemon))
            .or(self.text_category)
            .unwrap_or(Category::Unknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTableFields {
    pub weakness: TypedValue,
    pub resistance: TypedValue,
    pub retreat_cost: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetFields {
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub card_number: Option<String>,
    pub rarity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub pokemon_number: Option<i32>,
    pub illustrator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectFields {
    pub effect_text: Option<String>,
    pub energy_kind: Option<EnergyKind>,
}

/// Parser for card detail pages
pub struct DetailPageParser {
    title: Selector,
    heading: Selector,
    energy_icon: Selector,
    evolution_label: Selector,
    type_icon: Selector,
    table: Selector,
    row: Selector,
    cell: Selector,
    regulation_logo: Selector,
    link: Selector,
    rarity: Selector,
    illustrator_label: Selector,

    hp: Regex,
    stage2: Regex,
    stage1: Regex,
    category_word: Regex,
    icon_class: Regex,
    energy_file: Regex,
    damage: Regex,
    name_noise: Regex,
    digits: Regex,
    card_number: Regex,
    logo_file: Regex,
    rarity_file: Regex,
    dex_number: Regex,
}

impl DetailPageParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&DetailSelectors::default())
    }

    pub fn with_config(selectors: &DetailSelectors) -> ParsingResult<Self> {
        Ok(Self {
            title: compile_selector(&selectors.title)?,
            heading: compile_selector(&selectors.section_heading)?,
            energy_icon: compile_selector(&selectors.energy_icon)?,
            evolution_label: compile_selector(&selectors.evolution_label)?,
            type_icon: compile_selector(&selectors.type_icon)?,
            table: compile_selector(&selectors.table)?,
            row: compile_selector(&selectors.table_row)?,
            cell: compile_selector(&selectors.table_cell)?,
            regulation_logo: compile_selector(&selectors.regulation_logo)?,
            link: compile_selector(&selectors.link)?,
            rarity: compile_selector(&selectors.rarity)?,
            illustrator_label: compile_selector(&selectors.illustrator_label)?,

            hp: compile_regex(r"HP\s*(\d+)")?,
            stage2: compile_regex(r"2\s*進化")?,
            stage1: compile_regex(r"1\s*進化")?,
            category_word: compile_regex("(グッズ|サポート|スタジアム|ポケモンのどうぐ|エネルギー)")?,
            icon_class: compile_regex(r"icon-([a-z]+)")?,
            energy_file: compile_regex(r"(?i)energy/([a-z]+)\.png")?,
            damage: compile_regex(r"(\d+)([+＋×])?$")?,
            name_noise: compile_regex(r"\d+[+\-＋×]?|icon-[a-z]+")?,
            digits: compile_regex(r"\d+")?,
            card_number: compile_regex(r"(?:^|[^\d/])(\d+)\s*/\s*(\d+)(?:[^\d/]|$)")?,
            logo_file: compile_regex(r"/([A-Za-z0-9]+)\.gif")?,
            rarity_file: compile_regex(r"(?i)ic_rare_([a-z0-9_]+)\.")?,
            dex_number: compile_regex(r"No\.\s*(\d+)")?,
        })
    }

    /// Runs all field extractors concurrently and assembles the record.
    pub fn parse(&self, html: &str, context: &DetailParseContext) -> CardDetail {
        let mut title = TitleFields::default();
        let mut basic = BasicFields::default();
        let mut moves = Vec::new();
        let mut abilities = Vec::new();
        let mut table = StatTableFields::default();
        let mut set = SetFields::default();
        let mut profile = ProfileFields::default();
        let mut effect = EffectFields::default();

        rayon::scope(|s| {
            s.spawn(|_| title = self.extract_title(&Html::parse_document(html)));
            s.spawn(|_| basic = self.extract_basic(&Html::parse_document(html)));
            s.spawn(|_| moves = self.extract_moves(&Html::parse_document(html)));
            s.spawn(|_| abilities = self.extract_abilities(&Html::parse_document(html)));
            s.spawn(|_| table = self.extract_stat_table(&Html::parse_document(html)));
            s.spawn(|_| set = self.extract_set_info(&Html::parse_document(html)));
            s.spawn(|_| profile = self.extract_profile(&Html::parse_document(html)));
            s.spawn(|_| effect = self.extract_effect(&Html::parse_document(html)));
        });

        debug!(
            card_id = %context.card_id,
            moves = moves.len(),
            abilities = abilities.len(),
            hp = ?basic.hp,
            "Detail fields extracted"
        );
        assemble(context, title, basic, moves, abilities, table, set, profile, effect)
    }

    pub fn extract_title(&self, html: &Html) -> TitleFields {
        let full = html
            .select(&self.title)
            .map(|h1| normalize_whitespace(&element_text(&h1)))
            .find(|text| !text.is_empty())
            .unwrap_or_default();
        let name = full.split('(').next().unwrap_or_default().trim().to_string();
        TitleFields {
            name,
            full_name: (!full.is_empty()).then_some(full),
        }
    }

    pub fn extract_basic(&self, html: &Html) -> BasicFields {
        let text = visible_text(html);
        let hp = self
            .hp
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        let heading_category = html
            .select(&self.heading)
            .map(|h2| element_text(&h2))
            .find_map(|heading| heading_category(&heading));
        let text_category = self
            .category_word
            .find(&text)
            .map(|m| Category::from_label(m.as_str()));

        let evolution_stage = html
            .select(&self.evolution_label)
            .find_map(|label| EvolutionStage::from_label(&element_text(&label)))
            .or_else(|| hp.and_then(|_| self.evolution_from_text(&text)));

        let elemental_type = html
            .select(&self.type_icon)
            .find_map(|icon| self.icon_code(&icon))
            .map(|code| ElementalType::from_icon(&code).map_or(code, |t| t.code().to_string()));

        BasicFields {
            hp,
            evolution_stage,
            elemental_type,
            heading_category,
            text_category,
        }
    }

    /// Whole-page fallback; the 2-stage pattern is checked first so "2 進化"
    /// is never read as its "1"-less suffix.
    fn evolution_from_text(&self, text: &str) -> Option<EvolutionStage> {
        if self.stage2.is_match(text) {
            Some(EvolutionStage::Stage2)
        } else if self.stage1.is_match(text) {
            Some(EvolutionStage::Stage1)
        } else if text.lines().any(|line| line == "たね") {
            Some(EvolutionStage::Basic)
        } else {
            None
        }
    }

    pub fn extract_moves(&self, html: &Html) -> Vec<Move> {
        self.section_entries(html, MOVES_HEADING)
            .into_iter()
            .filter_map(|(h4, paragraph)| self.parse_move(&h4, paragraph.as_ref()))
            .collect()
    }

    pub fn extract_abilities(&self, html: &Html) -> Vec<Ability> {
        self.section_entries(html, ABILITIES_HEADING)
            .into_iter()
            .filter_map(|(h4, paragraph)| {
                let name = normalize_whitespace(&element_text(&h4));
                if name.is_empty() {
                    return None;
                }
                let effect = paragraph
                    .map(|p| normalize_whitespace(&element_text(&p)))
                    .filter(|e| !e.is_empty());
                Some(Ability { name, effect })
            })
            .collect()
    }

    /// `(h4, following <p>)` pairs under the section heading, up to a table,
    /// the next `h2`, or an evolution marker outside `h4`/`p` text.
    fn section_entries<'a>(&self, html: &'a Html, label: &str) -> Vec<(ElementRef<'a>, Option<ElementRef<'a>>)> {
        let Some(heading) = html
            .select(&self.heading)
            .find(|h2| element_text(h2).contains(label))
        else {
            return Vec::new();
        };

        let siblings: Vec<ElementRef<'a>> = heading.next_siblings().filter_map(ElementRef::wrap).collect();
        let mut entries = Vec::new();
        for (index, element) in siblings.iter().enumerate() {
            let tag = element.value().name();
            if tag == "table" || tag == "h2" {
                break;
            }
            if tag != "p" && tag != "h4" && element_text(element).contains(EVOLUTION_MARKER) {
                break;
            }
            if tag != "h4" {
                continue;
            }
            let paragraph = siblings
                .get(index + 1)
                .filter(|next| next.value().name() == "p")
                .copied();
            entries.push((*element, paragraph));
        }
        entries
    }

    fn parse_move(&self, h4: &ElementRef<'_>, paragraph: Option<&ElementRef<'_>>) -> Option<Move> {
        let raw = element_text(h4);
        let name = normalize_whitespace(&raw);
        if name.is_empty() {
            return None;
        }
        let name_clean = normalize_whitespace(&self.name_noise.replace_all(&raw, ""));
        let (damage, damage_modifier) = self.parse_damage(&name);
        let energy_cost = h4
            .select(&self.energy_icon)
            .filter_map(|icon| self.icon_code(&icon))
            .collect();
        let effect = paragraph
            .map(|p| element_text(p).trim().to_string())
            .filter(|e| !e.is_empty());

        Some(Move {
            name,
            name_clean,
            damage,
            damage_modifier,
            effect,
            energy_cost,
        })
    }

    /// Trailing digits are the damage; a `+`/`＋`/`×` right after them is the modifier.
    pub fn parse_damage(&self, label: &str) -> (Option<i32>, Option<DamageModifier>) {
        let Some(caps) = self.damage.captures(label.trim_end()) else {
            return (None, None);
        };
        let damage = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let modifier = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .and_then(DamageModifier::from_symbol);
        (damage, modifier)
    }

    /// Icon type from an `icon-<type>` class, else from an `energy/<type>.png` source.
    fn icon_code(&self, icon: &ElementRef<'_>) -> Option<String> {
        if let Some(code) = icon
            .value()
            .attr("class")
            .and_then(|class| self.icon_class.captures(class))
            .and_then(|caps| caps.get(1))
        {
            return Some(code.as_str().to_string());
        }
        icon.value()
            .attr("src")
            .and_then(|src| self.energy_file.captures(src))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    pub fn extract_stat_table(&self, html: &Html) -> StatTableFields {
        for table in html.select(&self.table) {
            let rows: Vec<ElementRef<'_>> = table.select(&self.row).collect();
            let Some(header) = rows.first() else {
                continue;
            };
            let header_text = element_text(header);
            if !STAT_TABLE_HEADERS.iter().all(|label| header_text.contains(label)) {
                continue;
            }
            let Some(values) = rows.get(1) else {
                return StatTableFields::default();
            };
            let cells: Vec<ElementRef<'_>> = values.select(&self.cell).collect();
            if cells.len() < 3 {
                return StatTableFields::default();
            }
            return StatTableFields {
                weakness: self.typed_value(&cells[0]),
                resistance: self.typed_value(&cells[1]),
                retreat_cost: self.retreat_cost(&cells[2]),
            };
        }
        StatTableFields::default()
    }

    fn typed_value(&self, cell: &ElementRef<'_>) -> TypedValue {
        let text = normalize_whitespace(&element_text(cell));
        let value = (!is_blank_marker(&text)).then_some(text);
        let element = cell
            .select(&self.energy_icon)
            .find_map(|icon| self.icon_code(&icon))
            .map(|code| ElementalType::from_icon(&code).map_or(code, |t| t.code().to_string()));
        let raw = match (&element, &value) {
            (None, None) => None,
            (Some(code), value) => {
                let label = ElementalType::from_icon(code).map_or(code.as_str(), |t| t.label());
                Some(format!("{label}{}", value.as_deref().unwrap_or_default()))
            }
            (None, Some(value)) => Some(value.clone()),
        };
        TypedValue { raw, element, value }
    }

    /// Printed digits, else the number of energy icons in the cell.
    fn retreat_cost(&self, cell: &ElementRef<'_>) -> Option<i32> {
        let text = element_text(cell);
        if let Some(m) = self.digits.find(&text) {
            return m.as_str().parse().ok();
        }
        let icons = cell.select(&self.energy_icon).count();
        (icons > 0).then(|| i32::try_from(icons).unwrap_or(i32::MAX))
    }

    pub fn extract_set_info(&self, html: &Html) -> SetFields {
        let text = visible_text(html);
        let card_number = self
            .card_number
            .captures(&text)
            .and_then(|caps| Some(format!("{}/{}", caps.get(1)?.as_str(), caps.get(2)?.as_str())));

        let set_code = html
            .select(&self.regulation_logo)
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| self.logo_file.captures(src))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let set_name = html
            .select(&self.link)
            .find(|a| {
                a.value().attr("href").is_some_and(|href| href.contains("/ex/"))
                    || SET_NAME_MARKERS.iter().any(|marker| element_text(a).contains(marker))
            })
            .map(|a| normalize_whitespace(&element_text(&a)))
            .filter(|name| !name.is_empty());

        let rarity = html.select(&self.rarity).next().and_then(|element| {
            let label = normalize_whitespace(&element_text(&element));
            if !label.is_empty() {
                return Some(label);
            }
            element
                .value()
                .attr("src")
                .and_then(|src| self.rarity_file.captures(src))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        });

        SetFields {
            set_name,
            set_code,
            card_number,
            rarity,
        }
    }

    pub fn extract_profile(&self, html: &Html) -> ProfileFields {
        let text = visible_text(html);
        let pokemon_number = self
            .dex_number
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        ProfileFields {
            pokemon_number,
            illustrator: self.illustrator(html),
        }
    }

    /// Innermost element carrying the label, then its link, the next sibling's
    /// link, or its own text without the label.
    fn illustrator(&self, html: &Html) -> Option<String> {
        let mut label = html
            .select(&self.illustrator_label)
            .find(|element| element_text(element).contains(ILLUSTRATOR_LABEL))?;
        while let Some(child) = label
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| element_text(child).contains(ILLUSTRATOR_LABEL))
        {
            label = child;
        }

        let link_text = |scope: &ElementRef<'_>| {
            scope
                .select(&self.link)
                .map(|a| normalize_whitespace(&element_text(&a)))
                .find(|name| !name.is_empty())
        };
        if let Some(name) = link_text(&label) {
            return Some(name);
        }
        if let Some(next) = label.next_siblings().find_map(ElementRef::wrap) {
            let name = if next.value().name() == "a" {
                Some(normalize_whitespace(&element_text(&next))).filter(|n| !n.is_empty())
            } else {
                link_text(&next)
            };
            if name.is_some() {
                return name;
            }
        }
        let remainder = element_text(&label).replace(ILLUSTRATOR_LABEL, "");
        let remainder = normalize_whitespace(remainder.trim().trim_start_matches([':', '：']));
        (!remainder.is_empty()).then_some(remainder)
    }

    pub fn extract_effect(&self, html: &Html) -> EffectFields {
        let Some(heading) = html.select(&self.heading).find(|h2| {
            let text = element_text(h2);
            TRAINER_ENERGY_HEADINGS.iter().any(|label| text.contains(label))
        }) else {
            return EffectFields::default();
        };

        let heading_text = element_text(&heading);
        let energy_kind = if heading_text.contains("基本エネルギー") {
            Some(EnergyKind::Basic)
        } else if heading_text.contains("特殊エネルギー") {
            Some(EnergyKind::Special)
        } else {
            None
        };

        let lines: Vec<String> = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|element| element.value().name() != "h2")
            .map(|element| normalize_whitespace(&element_text(&element)))
            .filter(|line| !line.is_empty())
            .collect();

        EffectFields {
            effect_text: (!lines.is_empty()).then(|| lines.join("\n")),
            energy_kind,
        }
    }
}

fn heading_category(heading: &str) -> Option<Category> {
    if heading.contains("基本エネルギー") || heading.contains("特殊エネルギー") {
        Some(Category::Energy)
    } else if heading.contains("ポケモンのどうぐ") {
        Some(Category::Tool)
    } else if heading.contains("グッズ") {
        Some(Category::Goods)
    } else if heading.contains("サポート") {
        Some(Category::Support)
    } else if heading.contains("スタジアム") {
        Some(Category::Stadium)
    } else {
        None
    }
}

fn is_blank_marker(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || matches!(c, '-' | '－' | '―' | 'ー' | '–'))
}

/// Elemental type codes named in `text`, ordered by first occurrence, joined with `/`.
pub fn detect_energy_types(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let mut found: Vec<(usize, ElementalType)> = ElementalType::ALL
        .iter()
        .filter_map(|kind| compact.find(kind.label()).map(|position| (position, *kind)))
        .collect();
    found.sort_by_key(|(position, _)| *position);
    let codes: Vec<&str> = found.iter().map(|(_, kind)| kind.code()).collect();
    (!codes.is_empty()).then(|| codes.join("/"))
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    context: &DetailParseContext,
    title: TitleFields,
    basic: BasicFields,
    moves: Vec<Move>,
    abilities: Vec<Ability>,
    table: StatTableFields,
    set: SetFields,
    profile: ProfileFields,
    effect: EffectFields,
) -> CardDetail {
    let category = basic.category();

    let mut summary = CardSummary::new(context.card_id.clone(), title.name, context.regulation);
    summary.full_name = title.full_name;
    summary.category = category;
    summary.image_url = context.image_url.clone();
    summary.detail_url = Some(context.detail_url.clone());

    let is_energy = category == Category::Energy || summary.name.contains(ENERGY_NAME_MARKER);
    let energy_subtype = if is_energy {
        detect_energy_types(&format!(
            "{}\n{}",
            summary.name,
            effect.effect_text.as_deref().unwrap_or_default()
        ))
    } else {
        None
    };

    let mut detail = CardDetail::new(summary);
    detail.hp = basic.hp;
    detail.evolution_stage = basic.evolution_stage;
    detail.elemental_type = energy_subtype.clone().or(basic.elemental_type);
    detail.pokemon_number = profile.pokemon_number;
    detail.weakness = table.weakness;
    detail.resistance = table.resistance;
    detail.retreat_cost = table.retreat_cost;
    detail.set_name = set.set_name;
    detail.set_code = set.set_code;
    detail.card_number = set.card_number;
    detail.rarity = set.rarity;
    detail.illustrator = profile.illustrator;
    detail.effect_text = effect.effect_text;
    detail.energy_subtype = energy_subtype;
    detail.energy_kind = effect.energy_kind;
    detail.moves = moves;
    detail.abilities = abilities;
    detail
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::{CardId, Regulation};

    const PIKACHU: &str = include_str!("../../../tests/fixtures/detail_pokemon.html");
    const NEST_BALL: &str = include_str!("../../../tests/fixtures/detail_trainer.html");
    const SPECIAL_ENERGY: &str = include_str!("../../../tests/fixtures/detail_energy.html");
    const RAICHU: &str = include_str!("../../../tests/fixtures/detail_stage1.html");

    fn parser() -> DetailPageParser {
        DetailPageParser::new().unwrap()
    }

    fn context(id: &str) -> DetailParseContext {
        DetailParseContext {
            card_id: CardId::parse(id).unwrap(),
            regulation: Regulation::SV,
            detail_url: format!("https://www.pokemon-card.com/card-search/details.php/card/{id}/regu/SV/"),
            image_url: None,
        }
    }

    #[rstest]
    #[case("A30", "A", Some(30), None)]
    #[case("ボルテッカー 50+", "ボルテッカー", Some(50), Some(DamageModifier::Plus))]
    #[case("ダブルアタック 20×", "ダブルアタック", Some(20), Some(DamageModifier::Times))]
    #[case("かたくなる", "かたくなる", None, None)]
    fn move_label_parsing(
        #[case] label: &str,
        #[case] clean: &str,
        #[case] damage: Option<i32>,
        #[case] modifier: Option<DamageModifier>,
    ) {
        let html = Html::parse_document(&format!("<h2>ワザ</h2><h4>{label}</h4><p>effect</p>"));
        let moves = parser().extract_moves(&html);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].name_clean, clean);
        assert_eq!(moves[0].damage, damage);
        assert_eq!(moves[0].damage_modifier, modifier);
        assert_eq!(moves[0].effect.as_deref(), Some("effect"));
    }

    #[test]
    fn move_scan_stops_at_table_and_next_section() {
        let html = Html::parse_document(
            "<h2>ワザ</h2><h4>one 10</h4><h4>two 20</h4><p>second</p><table><tr><td>x</td></tr></table><h4>three 30</h4>",
        );
        let moves = parser().extract_moves(&html);
        let names: Vec<_> = moves.iter().map(|m| m.name_clean.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(moves[0].effect, None);

        let html = Html::parse_document("<h2>ワザ</h2><h4>one 10</h4><div>2 進化</div><h4>two 20</h4>");
        assert_eq!(parser().extract_moves(&html).len(), 1);
    }

    #[test]
    fn energy_cost_comes_from_class_or_file_name() {
        let html = Html::parse_document(
            r#"<h2>ワザ</h2><h4><span class="icon icon-fire"></span><img src="/assets/images/energy/Water.png">ねっとう 60</h4>"#,
        );
        let moves = parser().extract_moves(&html);
        assert_eq!(moves[0].energy_cost, vec!["fire".to_string(), "water".to_string()]);
    }

    #[test]
    fn pokemon_page_is_fully_populated() {
        let detail = parser().parse(PIKACHU, &context("45123"));

        assert_eq!(detail.summary.name, "ピカチュウ");
        assert_eq!(detail.summary.full_name.as_deref(), Some("ピカチュウ(SV1V)"));
        assert_eq!(detail.summary.category, Category::Pokemon);
        assert_eq!(detail.hp, Some(60));
        assert_eq!(detail.evolution_stage, Some(EvolutionStage::Basic));
        assert_eq!(detail.elemental_type.as_deref(), Some("lightning"));
        assert_eq!(detail.pokemon_number, Some(25));
        assert_eq!(detail.weakness.element.as_deref(), Some("fighting"));
        assert_eq!(detail.weakness.value.as_deref(), Some("×2"));
        assert_eq!(detail.weakness.raw.as_deref(), Some("闘×2"));
        assert_eq!(detail.resistance, TypedValue::default());
        assert_eq!(detail.retreat_cost, Some(1));
        assert_eq!(detail.card_number.as_deref(), Some("025/078"));
        assert_eq!(detail.set_code.as_deref(), Some("G"));
        assert_eq!(detail.rarity.as_deref(), Some("c"));
        assert_eq!(detail.set_name.as_deref(), Some("拡張パック「トリプレットビート」"));
        assert_eq!(detail.illustrator.as_deref(), Some("Naoki Saito"));
        assert_eq!(detail.energy_subtype, None);

        assert_eq!(detail.abilities.len(), 1);
        assert_eq!(detail.abilities[0].name, "ぴかぴかチャージ");

        assert_eq!(detail.moves.len(), 1);
        let thunder_shock = &detail.moves[0];
        assert_eq!(thunder_shock.name_clean, "でんきショック");
        assert_eq!(thunder_shock.damage, Some(40));
        assert_eq!(thunder_shock.damage_modifier, None);
        assert_eq!(thunder_shock.energy_cost, vec!["lightning".to_string(), "none".to_string()]);
    }

    #[test]
    fn move_effect_mentioning_evolution_does_not_end_the_section() {
        let detail = parser().parse(RAICHU, &context("45124"));

        assert_eq!(detail.evolution_stage, Some(EvolutionStage::Stage1));
        assert_eq!(detail.hp, Some(120));
        let names: Vec<_> = detail.moves.iter().map(|m| m.name_clean.as_str()).collect();
        assert_eq!(names, vec!["エレキチャージ", "ボルテッカー"]);
        assert!(detail.moves[0].effect.as_deref().is_some_and(|e| e.contains("進化")));
        assert_eq!(detail.moves[1].damage, Some(160));
        assert_eq!(detail.moves[1].energy_cost.len(), 3);
    }

    #[test]
    fn trainer_page_uses_heading_category_and_effect() {
        let detail = parser().parse(NEST_BALL, &context("40001"));

        assert_eq!(detail.summary.category, Category::Goods);
        assert_eq!(detail.hp, None);
        assert_eq!(detail.evolution_stage, None);
        assert!(detail.moves.is_empty());
        let effect = detail.effect_text.unwrap();
        assert!(effect.starts_with("自分の山札からたねポケモンを1枚選び"));
        assert_eq!(effect.lines().count(), 2);
    }

    #[test]
    fn special_energy_subtype_overrides_type() {
        let detail = parser().parse(SPECIAL_ENERGY, &context("40002"));

        assert_eq!(detail.summary.category, Category::Energy);
        assert_eq!(detail.energy_kind, Some(EnergyKind::Special));
        assert_eq!(detail.energy_subtype.as_deref(), Some("fire/colorless"));
        assert_eq!(detail.elemental_type.as_deref(), Some("fire/colorless"));
    }

    #[test]
    fn energy_types_follow_first_occurrence() {
        assert_eq!(detect_energy_types("基本 水 エネルギー"), Some("water".to_string()));
        assert_eq!(detect_energy_types("無色と草"), Some("colorless/grass".to_string()));
        assert_eq!(detect_energy_types("エネルギー"), None);
    }

    #[test]
    fn evolution_fallback_prefers_two_stage_pattern() {
        let html = Html::parse_document("<p>HP 130</p><p>2 進化</p><p>1 進化 から</p>");
        assert_eq!(parser().extract_basic(&html).evolution_stage, Some(EvolutionStage::Stage2));
    }

    #[test]
    fn card_number_skips_dates() {
        let html = Html::parse_document("<p>発売日 2024/01/26</p><p>012 / 165</p>");
        assert_eq!(parser().extract_set_info(&html).card_number.as_deref(), Some("012/165"));
    }
}
