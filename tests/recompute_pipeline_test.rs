use chrono::NaiveDate;
use crickval::domain::{EconomyBand, Milestone};
use crickval::orchestration::{ensure_zero_rows, Orchestrator, Recomputer};
use crickval::{
    init_db, BattingCard, BowlingCard, ClubId, DateRange, Dismissal, FieldingCard, FormulaRules,
    MatchId, MatchInfo, Metric, PlayerId, Repository, ScoringStore, Season, SeasonId, TeamId,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn club() -> ClubId {
    ClubId::new("riverside")
}

fn season() -> Season {
    Season {
        id: SeasonId::new("2024"),
        club_id: club(),
        name: "Summer 2024".to_string(),
        start_date: d(4, 1),
        end_date: d(9, 30),
    }
}

fn fixture(id: &str, date: NaiveDate) -> MatchInfo {
    MatchInfo {
        id: MatchId::new(id),
        club_id: club(),
        season_id: Some(SeasonId::new("2024")),
        team_id: Some(TeamId::new("firsts")),
        match_date: date,
        opponent: Some("Hillside".to_string()),
    }
}

fn standard_rules() -> FormulaRules {
    let mut rules = FormulaRules::default();
    rules.batting.per_run = 1.0;
    rules.batting.boundary_4 = 1.0;
    rules.batting.boundary_6 = 2.0;
    rules.batting.milestones = vec![
        Milestone { at: 50.0, bonus: 10.0 },
        Milestone { at: 100.0, bonus: 25.0 },
    ];
    rules.batting.duck_penalty = -10.0;
    rules.bowling.per_wicket = 25.0;
    rules.bowling.maiden_over = 5.0;
    rules.bowling.economy_bands = vec![
        EconomyBand::at_most(3.0, 10.0),
        EconomyBand::at_most(2.0, 5.0),
        EconomyBand::at_least(8.0, -5.0),
    ];
    rules.fielding.catch = 10.0;
    rules.fielding.drop_penalty = -5.0;
    rules
}

async fn seed(repo: &Repository) {
    repo.upsert_season(&season()).await.unwrap();
    repo.upsert_match(&fixture("m1", d(5, 4))).await.unwrap();
    repo.upsert_match(&fixture("m2", d(6, 15))).await.unwrap();

    repo.upsert_batting_cards(&[
        BattingCard {
            match_id: MatchId::new("m1"),
            player_id: PlayerId::new("alice"),
            team_id: Some(TeamId::new("firsts")),
            runs: 104.0,
            balls: 126.0,
            fours: 16.0,
            sixes: 0.0,
            dismissal: Dismissal::from("retired not out"),
        },
        BattingCard {
            match_id: MatchId::new("m1"),
            player_id: PlayerId::new("bob"),
            team_id: Some(TeamId::new("firsts")),
            runs: 0.0,
            balls: 3.0,
            fours: 0.0,
            sixes: 0.0,
            dismissal: Dismissal::from("bowled"),
        },
    ])
    .await
    .unwrap();

    let mut spell = BowlingCard::zero(MatchId::new("m1"), Some(TeamId::new("firsts")), PlayerId::new("bob"));
    spell.overs = 10.0;
    spell.maidens = 2.0;
    spell.runs_conceded = 18.0;
    spell.wickets = 2.0;
    repo.upsert_bowling_cards(&[spell]).await.unwrap();

    let mut fielding = FieldingCard::zero(MatchId::new("m2"), None, PlayerId::new("carol"));
    fielding.catches = 1.0;
    fielding.drops = 1.0;
    repo.upsert_fielding_cards(&[fielding]).await.unwrap();
}

#[tokio::test]
async fn test_season_recompute_against_sqlite() {
    let (repo, _temp) = setup_repo().await;
    seed(&repo).await;
    let formula = repo
        .insert_formula_version(&club(), None, Some("Standard"), &standard_rules())
        .await
        .unwrap();

    let recomputer = Recomputer::new(repo.clone(), 2);
    let report = recomputer
        .recompute_season_points(&club(), Some(&SeasonId::new("2024")), season().range())
        .await
        .unwrap();

    assert_eq!(report.formula_version_id, formula.id);
    assert_eq!(report.matches, 2);
    // alice batting, bob batting (duck), bob bowling, carol catch, carol drop
    assert_eq!(report.events_inserted, 5);

    let m1 = repo.query_points_events(&MatchId::new("m1"), formula.id).await.unwrap();
    let alice = m1
        .iter()
        .find(|e| e.player_id.as_str() == "alice")
        .unwrap();
    assert_eq!(alice.metric, Metric::BattingTotal);
    assert_eq!(alice.points, 155.0);

    let bob: f64 = m1
        .iter()
        .filter(|e| e.player_id.as_str() == "bob")
        .map(|e| e.points)
        .sum();
    // -10 duck, 2 x 25 wickets, 2 x 5 maidens, 10 + 5 economy
    assert_eq!(bob, 65.0);

    let totals = repo
        .query_player_totals(&club(), formula.id, season().range())
        .await
        .unwrap();
    let board: Vec<(&str, f64)> = totals
        .iter()
        .map(|t| (t.player_id.as_str(), t.points))
        .collect();
    assert_eq!(board, vec![("alice", 155.0), ("bob", 65.0), ("carol", 5.0)]);
}

#[tokio::test]
async fn test_recompute_twice_gives_same_events() {
    let (repo, _temp) = setup_repo().await;
    seed(&repo).await;
    let formula = repo
        .insert_formula_version(&club(), None, None, &standard_rules())
        .await
        .unwrap();
    let recomputer = Recomputer::new(repo.clone(), 500);

    recomputer
        .recompute_season_points(&club(), None, season().range())
        .await
        .unwrap();
    let first = repo.query_points_events(&MatchId::new("m1"), formula.id).await.unwrap();

    let report = recomputer
        .recompute_season_points(&club(), None, season().range())
        .await
        .unwrap();
    let second = repo.query_points_events(&MatchId::new("m1"), formula.id).await.unwrap();

    assert_eq!(report.events_deleted, 5);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_new_version_leaves_old_events() {
    let (repo, _temp) = setup_repo().await;
    seed(&repo).await;
    let orchestrator = Orchestrator::new(repo.clone(), 500);

    let v1 = orchestrator
        .publish_formula(&club(), None, None, &standard_rules())
        .await
        .unwrap();
    assert_eq!(v1.recomputes.len(), 1);

    let mut doubled = standard_rules();
    doubled.fielding.catch = 20.0;
    let v2 = orchestrator
        .publish_formula(&club(), None, None, &doubled)
        .await
        .unwrap();
    orchestrator
        .recompute_season(&SeasonId::new("2024"))
        .await
        .unwrap();
    assert_eq!(v2.formula.version, 2);

    let old = repo
        .query_points_events(&MatchId::new("m2"), v1.formula.id)
        .await
        .unwrap();
    let new = repo
        .query_points_events(&MatchId::new("m2"), v2.formula.id)
        .await
        .unwrap();
    let catch_points = |events: &[crickval::PointsEvent]| {
        events
            .iter()
            .filter(|e| e.metric == Metric::Catch)
            .map(|e| e.points)
            .collect::<Vec<_>>()
    };
    assert_eq!(catch_points(&old), vec![10.0]);
    assert_eq!(catch_points(&new), vec![20.0]);
}

#[tokio::test]
async fn test_zero_rows_against_sqlite() {
    let (repo, _temp) = setup_repo().await;
    seed(&repo).await;
    let m1 = MatchId::new("m1");
    let roster = vec![
        PlayerId::new("alice"),
        PlayerId::new("dave"),
        PlayerId::new("erin"),
    ];

    let report = ensure_zero_rows(repo.as_ref(), &m1, Some(&TeamId::new("firsts")), &roster)
        .await
        .unwrap();
    assert_eq!(report.rows_inserted, 6);

    let batting = repo.list_batting_cards(&[m1.clone()]).await.unwrap();
    let bowling = repo.list_bowling_cards(&[m1.clone()]).await.unwrap();
    let fielding = repo.list_fielding_cards(&[m1.clone()]).await.unwrap();
    for player in ["dave", "erin"] {
        assert_eq!(batting.iter().filter(|c| c.player_id.as_str() == player).count(), 1);
        assert_eq!(bowling.iter().filter(|c| c.player_id.as_str() == player).count(), 1);
        assert_eq!(fielding.iter().filter(|c| c.player_id.as_str() == player).count(), 1);
    }
    let dave = batting.iter().find(|c| c.player_id.as_str() == "dave").unwrap();
    assert_eq!(dave.dismissal, Dismissal::DidNotBat);
    assert_eq!(dave.team_id, Some(TeamId::new("firsts")));

    // alice had a batting row already, so she gets nothing new
    assert!(bowling.iter().all(|c| c.player_id.as_str() != "alice"));

    let again = ensure_zero_rows(repo.as_ref(), &m1, None, &roster).await.unwrap();
    assert_eq!(again.rows_inserted, 0);
}

#[tokio::test]
async fn test_many_events_inserted_in_batches() {
    let (repo, _temp) = setup_repo().await;
    repo.upsert_season(&season()).await.unwrap();
    repo.upsert_match(&fixture("big", d(7, 1))).await.unwrap();

    let cards: Vec<FieldingCard> = (0..1_050)
        .map(|i| {
            let mut card = FieldingCard::zero(MatchId::new("big"), None, PlayerId::new(format!("p{:04}", i)));
            card.catches = 1.0;
            card
        })
        .collect();
    repo.upsert_fielding_cards(&cards).await.unwrap();
    repo.insert_formula_version(&club(), None, None, &standard_rules())
        .await
        .unwrap();

    let recomputer = Recomputer::new(repo.clone(), 250);
    let report = recomputer
        .recompute_match(&MatchId::new("big"))
        .await
        .unwrap();
    assert_eq!(report.events_inserted, 1_050);

    let range = DateRange::new(d(7, 1), d(7, 1));
    let totals = repo
        .query_player_totals(&club(), report.formula_version_id, range)
        .await
        .unwrap();
    assert_eq!(totals.len(), 1_050);
    assert!(totals.iter().all(|t| t.points == 10.0 && t.matches == 1));
}

#[tokio::test]
async fn test_blank_stat_cell_does_not_block_recompute() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool.clone()));
    repo.upsert_season(&season()).await.unwrap();
    repo.upsert_match(&fixture("m1", d(5, 4))).await.unwrap();

    // An importer wrote an empty cell for drops.
    sqlx::query(
        "INSERT INTO fielding_cards (match_id, player_id, catches, drops) \
         VALUES ('m1', 'p1', 2, '')",
    )
    .execute(&pool)
    .await
    .unwrap();
    repo.insert_formula_version(&club(), None, None, &standard_rules())
        .await
        .unwrap();

    let report = Recomputer::new(repo.clone(), 500)
        .recompute_season_points(&club(), Some(&SeasonId::new("2024")), season().range())
        .await
        .unwrap();
    assert_eq!(report.events_inserted, 1);

    let events = repo
        .query_points_events(&MatchId::new("m1"), report.formula_version_id)
        .await
        .unwrap();
    assert_eq!(events[0].metric, Metric::Catch);
    assert_eq!(events[0].points, 20.0);
}
