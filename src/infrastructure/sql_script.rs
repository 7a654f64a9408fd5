//! SQL statements shared by both card stores
//!
//! Every write is described once as a [`Statement`]: a `?`-placeholder SQL
//! template plus its values. The direct store binds the values through sqlx;
//! the remote store renders them as escaped literals into a script.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

use crate::domain::{CardDetail, CardSummary, Category, CollectionLogEntry, TypedValue};

/// Columns written from a list-view summary, `card_id` first
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "card_id",
    "name",
    "full_name",
    "category",
    "image_url",
    "detail_url",
    "regulation",
    "updated_at",
];

/// Columns written from a detail page, `card_id` first
pub const DETAIL_COLUMNS: [&str; 28] = [
    "card_id",
    "name",
    "full_name",
    "category",
    "image_url",
    "detail_url",
    "regulation",
    "card_type",
    "hp",
    "evolution_stage",
    "pokemon_number",
    "weakness",
    "weakness_type",
    "weakness_value",
    "resistance",
    "resistance_type",
    "resistance_value",
    "retreat_cost",
    "set_name",
    "set_code",
    "card_number",
    "rarity",
    "illustrator",
    "effect_text",
    "energy_subtype",
    "energy_kind",
    "updated_at",
    "last_verified_at",
];

pub const DELETE_MOVE_ENERGY_SQL: &str =
    "DELETE FROM move_energy_cost WHERE move_id IN (SELECT id FROM moves WHERE card_id = ?)";
pub const DELETE_MOVES_SQL: &str = "DELETE FROM moves WHERE card_id = ?";
pub const DELETE_ABILITIES_SQL: &str = "DELETE FROM abilities WHERE card_id = ?";
pub const INSERT_MOVE_SQL: &str = "INSERT INTO moves (card_id, name, name_clean, damage, damage_modifier, effect, order_index) VALUES (?, ?, ?, ?, ?, ?, ?)";
/// Resolves the move row by `(card_id, order_index)` so no generated id has to be read back.
pub const INSERT_MOVE_ENERGY_SQL: &str = "INSERT INTO move_energy_cost (move_id, energy_type, order_index) SELECT id, ?, ? FROM moves WHERE card_id = ? AND order_index = ? LIMIT 1";
pub const INSERT_ABILITY_SQL: &str =
    "INSERT INTO abilities (card_id, name, effect, order_index) VALUES (?, ?, ?, ?)";
pub const INSERT_LOG_SQL: &str = "INSERT INTO collection_logs (card_id, status, source, error_message, processing_time_ms, logged_at) VALUES (?, ?, ?, ?, ?, ?)";
pub const COUNT_CARDS_SQL: &str = "SELECT COUNT(*) AS count FROM cards";
pub const MISSING_DETAIL_SQL: &str = "SELECT card_id, COALESCE(regulation, 'SV') AS regulation FROM cards WHERE hp IS NULL ORDER BY card_id LIMIT ?";

lazy_static! {
    pub static ref SUMMARY_UPSERT_SQL: String = card_upsert_sql(&SUMMARY_COLUMNS);
    pub static ref DETAIL_UPSERT_SQL: String = card_upsert_sql(&DETAIL_COLUMNS);
}

/// Insert-or-merge on `cards`: incoming non-null values win, except
/// `regulation` where the stored value wins.
fn card_upsert_sql(columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let assignments = columns
        .iter()
        .skip(1)
        .map(|column| match *column {
            "regulation" => "regulation = COALESCE(cards.regulation, excluded.regulation)".to_string(),
            _ => format!("{column} = COALESCE(excluded.{column}, cards.{column})"),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO cards ({}) VALUES ({placeholders}) ON CONFLICT(card_id) DO UPDATE SET {assignments}",
        columns.join(", ")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Empty strings are stored as NULL so they never overwrite a stored value.
    pub fn non_empty(value: Option<&str>) -> Self {
        value
            .filter(|v| !v.is_empty())
            .map_or(Self::Null, |v| Self::Text(v.to_string()))
    }

    pub fn integer(value: Option<i32>) -> Self {
        value.map_or(Self::Null, |v| Self::Integer(i64::from(v)))
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Text(value.to_rfc3339())
    }

    /// Script literal: `NULL`, a bare number, or an escaped quoted string.
    pub fn literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Text(value) => escape_text(value),
        }
    }
}

/// Quotes `value` as a SQLite string literal. Only `'` is special there;
/// backslashes are ordinary characters.
pub fn escape_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A `?`-placeholder template with its values in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: &'static str,
    pub values: Vec<SqlValue>,
}

impl Statement {
    pub const fn new(sql: &'static str, values: Vec<SqlValue>) -> Self {
        Self { sql, values }
    }

    /// Substitutes each placeholder with its literal, terminated by `;`.
    pub fn render(&self) -> String {
        let mut values = self.values.iter();
        let mut rendered = String::with_capacity(self.sql.len() + self.values.len() * 8 + 1);
        for (index, part) in self.sql.split('?').enumerate() {
            if index > 0 {
                let literal = values.next().map_or_else(|| SqlValue::Null.literal(), SqlValue::literal);
                rendered.push_str(&literal);
            }
            rendered.push_str(part);
        }
        rendered.push(';');
        rendered
    }
}

fn category_value(category: Category) -> SqlValue {
    if category.is_known() {
        SqlValue::text(category.as_str())
    } else {
        SqlValue::Null
    }
}

fn typed_values(typed: &TypedValue) -> [SqlValue; 3] {
    [
        SqlValue::non_empty(typed.raw.as_deref()),
        SqlValue::non_empty(typed.element.as_deref()),
        SqlValue::non_empty(typed.value.as_deref()),
    ]
}

pub fn summary_upsert(summary: &CardSummary) -> Statement {
    Statement::new(
        SUMMARY_UPSERT_SQL.as_str(),
        vec![
            SqlValue::text(summary.card_id.as_str()),
            SqlValue::non_empty(Some(&summary.name)),
            SqlValue::non_empty(summary.full_name.as_deref()),
            category_value(summary.category),
            SqlValue::non_empty(summary.image_url.as_deref()),
            SqlValue::non_empty(summary.detail_url.as_deref()),
            SqlValue::text(summary.regulation.as_str()),
            SqlValue::timestamp(summary.updated_at),
        ],
    )
}

fn detail_upsert(detail: &CardDetail, verified_at: DateTime<Utc>) -> Statement {
    let summary = &detail.summary;
    let mut values = vec![
        SqlValue::text(summary.card_id.as_str()),
        SqlValue::non_empty(Some(&summary.name)),
        SqlValue::non_empty(summary.full_name.as_deref()),
        category_value(summary.category),
        SqlValue::non_empty(summary.image_url.as_deref()),
        SqlValue::non_empty(summary.detail_url.as_deref()),
        SqlValue::text(summary.regulation.as_str()),
        SqlValue::non_empty(detail.elemental_type.as_deref()),
        SqlValue::integer(detail.hp),
        SqlValue::non_empty(detail.evolution_stage.map(|stage| stage.as_str())),
        SqlValue::integer(detail.pokemon_number),
    ];
    values.extend(typed_values(&detail.weakness));
    values.extend(typed_values(&detail.resistance));
    values.extend([
        SqlValue::integer(detail.retreat_cost),
        SqlValue::non_empty(detail.set_name.as_deref()),
        SqlValue::non_empty(detail.set_code.as_deref()),
        SqlValue::non_empty(detail.card_number.as_deref()),
        SqlValue::non_empty(detail.rarity.as_deref()),
        SqlValue::non_empty(detail.illustrator.as_deref()),
        SqlValue::non_empty(detail.effect_text.as_deref()),
        SqlValue::non_empty(detail.energy_subtype.as_deref()),
        SqlValue::non_empty(detail.energy_kind.map(|kind| kind.as_str())),
        SqlValue::timestamp(summary.updated_at),
        SqlValue::timestamp(verified_at),
    ]);
    Statement::new(DETAIL_UPSERT_SQL.as_str(), values)
}

/// Ordered statements that merge the card row and rebuild its moves,
/// move energy costs and abilities.
pub fn detail_statements(detail: &CardDetail, verified_at: DateTime<Utc>) -> Vec<Statement> {
    let card_id = || SqlValue::text(detail.card_id().as_str());
    let mut statements = vec![
        detail_upsert(detail, verified_at),
        Statement::new(DELETE_MOVE_ENERGY_SQL, vec![card_id()]),
        Statement::new(DELETE_MOVES_SQL, vec![card_id()]),
        Statement::new(DELETE_ABILITIES_SQL, vec![card_id()]),
    ];

    for (move_index, card_move) in (0_i64..).zip(&detail.moves) {
        statements.push(Statement::new(
            INSERT_MOVE_SQL,
            vec![
                card_id(),
                SqlValue::text(card_move.name.as_str()),
                SqlValue::non_empty(Some(&card_move.name_clean)),
                SqlValue::integer(card_move.damage),
                SqlValue::non_empty(card_move.damage_modifier.map(|modifier| modifier.as_str())),
                SqlValue::non_empty(card_move.effect.as_deref()),
                SqlValue::Integer(move_index),
            ],
        ));
        for (energy_index, energy) in (0_i64..).zip(&card_move.energy_cost) {
            statements.push(Statement::new(
                INSERT_MOVE_ENERGY_SQL,
                vec![
                    SqlValue::text(energy.as_str()),
                    SqlValue::Integer(energy_index),
                    card_id(),
                    SqlValue::Integer(move_index),
                ],
            ));
        }
    }

    for (ability_index, ability) in (0_i64..).zip(&detail.abilities) {
        statements.push(Statement::new(
            INSERT_ABILITY_SQL,
            vec![
                card_id(),
                SqlValue::text(ability.name.as_str()),
                SqlValue::non_empty(ability.effect.as_deref()),
                SqlValue::Integer(ability_index),
            ],
        ));
    }

    statements
}

pub fn log_insert(entry: &CollectionLogEntry) -> Statement {
    Statement::new(
        INSERT_LOG_SQL,
        vec![
            SqlValue::text(entry.card_id.as_str()),
            SqlValue::text(entry.status.as_str()),
            SqlValue::text(entry.source.as_str()),
            SqlValue::non_empty(entry.error_message.as_deref()),
            SqlValue::Integer(entry.processing_time_ms),
            SqlValue::timestamp(entry.logged_at),
        ],
    )
}

/// One script for a detail update, with its log entry appended.
pub fn detail_script(detail: &CardDetail, log: Option<&CollectionLogEntry>, verified_at: DateTime<Utc>) -> String {
    detail_statements(detail, verified_at)
        .iter()
        .chain(log.map(log_insert).as_ref())
        .map(Statement::render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy sequential packing of scripts into `\n`-joined chunks of at most
/// `ceiling` characters. A script longer than the ceiling forms its own chunk.
pub fn pack_scripts(scripts: &[String], ceiling: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for script in scripts {
        let script_chars = script.chars().count();
        if current_chars > 0 && current_chars + 1 + script_chars > ceiling {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(script);
        current_chars += script_chars;
    }
    if current_chars > 0 {
        chunks.push(current);
    }
    chunks
}
