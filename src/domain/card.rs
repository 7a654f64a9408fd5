use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable five-digit catalog identifier (primary key across summary and detail)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub const LEN: usize = 5;

    /// Accepts exactly five ASCII digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()))
            .then(|| Self(raw.to_string()))
    }

    /// Normalizes a digit run found inside a file name (`012345` -> `12345`, `1234` -> `01234`).
    ///
    /// Values that do not fit five digits, or that are shorter than four digits,
    /// are rejected.
    pub fn from_numeric(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let trimmed = digits.trim_start_matches('0');
        if trimmed.len() < 4 {
            return None;
        }
        let value: u32 = trimmed.parse().ok()?;
        (value <= 99_999).then(|| Self(format!("{value:05}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Card-legality era tag used by the catalog's regulation filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regulation {
    XY,
    SM,
    S,
    SV,
}

impl Regulation {
    /// The catalog's default ("current") view.
    pub const CURRENT: Self = Self::SV;
    pub const ALL: [Self; 4] = [Self::XY, Self::SM, Self::S, Self::SV];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::XY => "XY",
            Self::SM => "SM",
            Self::S => "S",
            Self::SV => "SV",
        }
    }
}

impl fmt::Display for Regulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown regulation: {0}")]
pub struct UnknownRegulation(pub String);

impl FromStr for Regulation {
    type Err = UnknownRegulation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "XY" => Ok(Self::XY),
            "SM" => Ok(Self::SM),
            "S" => Ok(Self::S),
            "SV" => Ok(Self::SV),
            other => Err(UnknownRegulation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pokemon,
    Goods,
    Tool,
    Support,
    Stadium,
    Energy,
    Unknown,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pokemon => "pokemon",
            Self::Goods => "goods",
            Self::Tool => "tool",
            Self::Support => "support",
            Self::Stadium => "stadium",
            Self::Energy => "energy",
            Self::Unknown => "unknown",
        }
    }

    /// Maps the catalog's Japanese section labels.
    ///
    /// `ポケモンのどうぐ` is checked before `ポケモン` since it contains it.
    pub fn from_label(text: &str) -> Self {
        if text.contains("ポケモンのどうぐ") {
            Self::Tool
        } else if text.contains("グッズ") {
            Self::Goods
        } else if text.contains("サポート") {
            Self::Support
        } else if text.contains("スタジアム") {
            Self::Stadium
        } else if text.contains("エネルギー") {
            Self::Energy
        } else if text.contains("ポケモン") {
            Self::Pokemon
        } else {
            Self::Unknown
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStage {
    Basic,
    Stage1,
    Stage2,
}

impl EvolutionStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
        }
    }

    /// Exact match against the stage label element (`たね`, `1 進化`, `2 進化`).
    pub fn from_label(text: &str) -> Option<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "たね" => Some(Self::Basic),
            "1進化" => Some(Self::Stage1),
            "2進化" => Some(Self::Stage2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyKind {
    Basic,
    Special,
}

impl EnergyKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Special => "special",
        }
    }
}

/// Elemental types printed on cards, keyed by the site's icon class suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementalType {
    Grass,
    Fire,
    Water,
    Lightning,
    Psychic,
    Fighting,
    Darkness,
    Metal,
    Colorless,
}

impl ElementalType {
    /// Label scan order used for energy subtype detection.
    pub const ALL: [Self; 9] = [
        Self::Grass,
        Self::Fire,
        Self::Water,
        Self::Lightning,
        Self::Psychic,
        Self::Fighting,
        Self::Darkness,
        Self::Metal,
        Self::Colorless,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Fire => "fire",
            Self::Water => "water",
            Self::Lightning => "lightning",
            Self::Psychic => "psychic",
            Self::Fighting => "fighting",
            Self::Darkness => "darkness",
            Self::Metal => "metal",
            Self::Colorless => "colorless",
        }
    }

    /// Label as printed in card text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grass => "草",
            Self::Fire => "炎",
            Self::Water => "水",
            Self::Lightning => "雷",
            Self::Psychic => "超",
            Self::Fighting => "闘",
            Self::Darkness => "悪",
            Self::Metal => "鋼",
            Self::Colorless => "無色",
        }
    }

    pub fn from_icon(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "grass" => Some(Self::Grass),
            "fire" => Some(Self::Fire),
            "water" => Some(Self::Water),
            "lightning" | "electric" => Some(Self::Lightning),
            "psychic" => Some(Self::Psychic),
            "fighting" => Some(Self::Fighting),
            "dark" | "darkness" => Some(Self::Darkness),
            "metal" | "steel" => Some(Self::Metal),
            "colorless" | "none" => Some(Self::Colorless),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageModifier {
    Plus,
    Times,
}

impl DamageModifier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Times => "times",
        }
    }

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' | '＋' => Some(Self::Plus),
            '×' => Some(Self::Times),
            _ => None,
        }
    }
}

/// Weakness or resistance cell: icon type plus printed value (e.g. `fire` / `×2`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValue {
    pub raw: Option<String>,
    pub element: Option<String>,
    pub value: Option<String>,
}

/// Minimal record discovered on a search result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub card_id: CardId,
    pub name: String,
    pub full_name: Option<String>,
    pub category: Category,
    pub image_url: Option<String>,
    pub detail_url: Option<String>,
    pub regulation: Regulation,
    pub updated_at: DateTime<Utc>,
}

impl CardSummary {
    pub fn new(card_id: CardId, name: impl Into<String>, regulation: Regulation) -> Self {
        Self {
            card_id,
            name: name.into(),
            full_name: None,
            category: Category::Unknown,
            image_url: None,
            detail_url: None,
            regulation,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub name: String,
    pub name_clean: String,
    pub damage: Option<i32>,
    pub damage_modifier: Option<DamageModifier>,
    pub effect: Option<String>,
    /// Energy icon codes in printed order
    pub energy_cost: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub effect: Option<String>,
}

/// Fully extracted record from a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetail {
    pub summary: CardSummary,
    pub hp: Option<i32>,
    pub evolution_stage: Option<EvolutionStage>,
    /// Stored as `card_type`
    pub elemental_type: Option<String>,
    pub pokemon_number: Option<i32>,
    pub weakness: TypedValue,
    pub resistance: TypedValue,
    pub retreat_cost: Option<i32>,
    pub set_name: Option<String>,
    pub set_code: Option<String>,
    pub card_number: Option<String>,
    pub rarity: Option<String>,
    pub illustrator: Option<String>,
    pub effect_text: Option<String>,
    pub energy_subtype: Option<String>,
    pub energy_kind: Option<EnergyKind>,
    pub moves: Vec<Move>,
    pub abilities: Vec<Ability>,
}

impl CardDetail {
    pub fn new(summary: CardSummary) -> Self {
        Self {
            summary,
            hp: None,
            evolution_stage: None,
            elemental_type: None,
            pokemon_number: None,
            weakness: TypedValue::default(),
            resistance: TypedValue::default(),
            retreat_cost: None,
            set_name: None,
            set_code: None,
            card_number: None,
            rarity: None,
            illustrator: None,
            effect_text: None,
            energy_subtype: None,
            energy_kind: None,
            moves: Vec::new(),
            abilities: Vec::new(),
        }
    }

    pub fn card_id(&self) -> &CardId {
        &self.summary.card_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_id_requires_five_digits() {
        assert_eq!(CardId::parse("00123").map(|id| id.to_string()), Some("00123".into()));
        assert!(CardId::parse("1234").is_none());
        assert!(CardId::parse("123456").is_none());
        assert!(CardId::parse("12a45").is_none());
    }

    #[test]
    fn card_id_from_file_name_digits() {
        assert_eq!(CardId::from_numeric("045123").unwrap().as_str(), "45123");
        assert_eq!(CardId::from_numeric("1234").unwrap().as_str(), "01234");
        assert!(CardId::from_numeric("000123").is_none());
        assert!(CardId::from_numeric("123456").is_none());
    }

    #[test]
    fn regulation_parses_case_insensitively() {
        assert_eq!("sv".parse::<Regulation>(), Ok(Regulation::SV));
        assert_eq!("XY".parse::<Regulation>(), Ok(Regulation::XY));
        assert!("ZZ".parse::<Regulation>().is_err());
    }

    #[test]
    fn category_label_prefers_tool_over_pokemon() {
        assert_eq!(Category::from_label("ポケモンのどうぐ"), Category::Tool);
        assert_eq!(Category::from_label("基本エネルギー"), Category::Energy);
        assert_eq!(Category::from_label("ポケモン"), Category::Pokemon);
        assert_eq!(Category::from_label("???"), Category::Unknown);
    }

    #[test]
    fn evolution_label_ignores_inner_whitespace() {
        assert_eq!(EvolutionStage::from_label("1 進化"), Some(EvolutionStage::Stage1));
        assert_eq!(EvolutionStage::from_label(" たね "), Some(EvolutionStage::Basic));
        assert_eq!(EvolutionStage::from_label("進化"), None);
    }
}
