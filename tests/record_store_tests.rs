//! Store-level guarantees of the direct SQLite backend
use pokeca_collector::domain::{
    Ability, CardDetail, CardId, CardSummary, CollectionLogEntry, Move, RecordStore, Regulation,
};
use pokeca_collector::infrastructure::sql_script::summary_upsert;
use pokeca_collector::infrastructure::{DatabaseConnection, SqliteCardRepository};
use proptest::prelude::*;
use rstest::rstest;

async fn store() -> anyhow::Result<(DatabaseConnection, SqliteCardRepository)> {
    let connection = DatabaseConnection::in_memory().await?;
    let repository = SqliteCardRepository::new(connection.pool().clone());
    repository.initialize_schema().await?;
    Ok((connection, repository))
}

fn attack(name: &str, damage: i32) -> Move {
    Move {
        name: format!("{name} {damage}"),
        name_clean: name.to_string(),
        damage: Some(damage),
        damage_modifier: None,
        effect: None,
        energy_cost: vec!["fire".to_string()],
    }
}

fn detail(id: &str, ability: &str, moves: Vec<Move>) -> CardDetail {
    let summary = CardSummary::new(CardId::parse(id).unwrap(), "ヒトカゲ", Regulation::SV);
    let mut detail = CardDetail::new(summary);
    detail.hp = Some(70);
    detail.moves = moves;
    detail.abilities = vec![Ability {
        name: ability.to_string(),
        effect: Some("effect".to_string()),
    }];
    detail
}

async fn names(connection: &DatabaseConnection, table: &str) -> Vec<String> {
    sqlx::query_scalar(&format!("SELECT name FROM {table} ORDER BY order_index"))
        .fetch_all(connection.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn failed_replacement_leaves_previous_detail_intact() -> anyhow::Result<()> {
    let (connection, repository) = store().await?;
    repository
        .replace_detail(&detail("00004", "もうか", vec![attack("ひのこ", 20)]), None)
        .await?;

    sqlx::query(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON abilities WHEN NEW.name = 'boom' \
         BEGIN SELECT RAISE(ABORT, 'induced'); END",
    )
    .execute(connection.pool())
    .await?;

    let log = CollectionLogEntry::success(CardId::parse("00004").unwrap(), 5);
    let replacement = detail("00004", "boom", vec![attack("かえんほうしゃ", 90), attack("ほのお", 30)]);
    assert!(repository.replace_detail(&replacement, Some(&log)).await.is_err());

    assert_eq!(names(&connection, "moves").await, vec!["ひのこ 20"]);
    assert_eq!(names(&connection, "abilities").await, vec!["もうか"]);
    let energy: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM move_energy_cost")
        .fetch_one(connection.pool())
        .await?;
    assert_eq!(energy, 1);
    let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collection_logs")
        .fetch_one(connection.pool())
        .await?;
    assert_eq!(logs, 0);
    Ok(())
}

#[rstest]
#[case::fewer(vec![attack("ひのこ", 20)])]
#[case::none(vec![])]
#[case::more(vec![attack("ひのこ", 20), attack("かえんほうしゃ", 90), attack("ほのお", 30)])]
#[tokio::test]
async fn replacement_mirrors_latest_moves(#[case] moves: Vec<Move>) -> anyhow::Result<()> {
    let (connection, repository) = store().await?;
    repository
        .replace_detail(&detail("00004", "もうか", vec![attack("a", 1), attack("b", 2)]), None)
        .await?;

    let expected: Vec<String> = moves.iter().map(|m| m.name.clone()).collect();
    repository.replace_detail(&detail("00004", "もうか", moves), None).await?;

    assert_eq!(names(&connection, "moves").await, expected);
    let energy: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM move_energy_cost")
        .fetch_one(connection.pool())
        .await?;
    assert_eq!(usize::try_from(energy)?, expected.len());
    Ok(())
}

#[tokio::test]
async fn backfill_selection_is_clamped_and_ordered() -> anyhow::Result<()> {
    let (_connection, repository) = store().await?;
    let cards: Vec<CardSummary> = (1..=600)
        .rev()
        .map(|n| CardSummary::new(CardId::parse(&format!("{n:05}")).unwrap(), format!("card {n}"), Regulation::S))
        .collect();
    repository.upsert_summaries(&cards).await?;

    let selected = repository.find_missing_detail(10_000).await?;
    assert_eq!(selected.len(), 500);
    assert_eq!(selected[0].card_id.as_str(), "00001");
    assert_eq!(selected[499].card_id.as_str(), "00500");
    assert!(selected.iter().all(|c| c.regulation == Regulation::S));
    Ok(())
}

/// Stores `value` as name and full name of 00001 through a rendered script and
/// of 00002 through bound parameters, then reads both rows back.
async fn store_both_ways(value: &str) -> anyhow::Result<(Option<String>, Option<String>)> {
    let (connection, repository) = store().await?;
    let mut scripted = CardSummary::new(CardId::parse("00001").unwrap(), value, Regulation::SV);
    scripted.full_name = Some(value.to_string());
    let mut bound = scripted.clone();
    bound.card_id = CardId::parse("00002").unwrap();

    sqlx::raw_sql(&summary_upsert(&scripted).render())
        .execute(connection.pool())
        .await?;
    repository.upsert_summaries(&[bound]).await?;

    let read = |id: &'static str| {
        sqlx::query_as::<_, (Option<String>, Option<String>)>("SELECT name, full_name FROM cards WHERE card_id = ?")
            .bind(id)
            .fetch_one(connection.pool())
    };
    let scripted_row = read("00001").await?;
    let bound_row = read("00002").await?;
    assert_eq!(scripted_row.0, scripted_row.1);
    assert_eq!(bound_row.0, bound_row.1);
    Ok((scripted_row.0, bound_row.0))
}

#[rstest]
#[case::backslash(r"a\b")]
#[case::trailing_backslash(r"C:\cards\")]
#[case::quotes("O'Brien's ''deck''")]
#[case::placeholder_like("what? ?1 $1")]
#[case::statement_breaker("'); DELETE FROM cards; --")]
#[case::multiline("ワザ\nつづき")]
#[tokio::test]
async fn rendered_script_stores_text_like_bound_parameters(#[case] value: &str) -> anyhow::Result<()> {
    let (scripted, bound) = store_both_ways(value).await?;
    assert_eq!(scripted.as_deref(), Some(value));
    assert_eq!(scripted, bound);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn rendered_script_round_trips_arbitrary_text(value in "[^\\x00]{1,40}") {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let (scripted, bound) = runtime.block_on(store_both_ways(&value)).unwrap();
        prop_assert_eq!(scripted.as_deref(), Some(value.as_str()));
        prop_assert_eq!(scripted, bound);
    }
}
