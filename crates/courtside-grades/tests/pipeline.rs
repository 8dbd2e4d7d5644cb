// Integration tests for the grade pipeline.
//
// These run the full flow against the CSV snapshot fixtures: fetch every
// category, normalize, merge, grade, classify and persist into an in-memory
// database.

use std::path::{Path, PathBuf};

use courtside_core::config::{Config, GradingConfig, RetryConfig, SeasonConfig, SourcesConfig};
use courtside_core::db::Database;
use courtside_grades::archetype::{vocabulary, BENCHWARMER};
use courtside_grades::pipeline::{
    collect_tables, grade_population, refresh_grades, GradeStore, GradeTable, PipelineError,
};
use courtside_grades::source::{CsvSnapshotSource, FetchError, RetryingSource};
use courtside_grades::table::StatCategory;

// ===========================================================================
// Test helpers
// ===========================================================================

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/snapshot")
}

fn test_config() -> Config {
    Config {
        season: SeasonConfig {
            label: "2024-25".into(),
        },
        sources: SourcesConfig {
            snapshot_dir: fixtures().to_string_lossy().into_owned(),
        },
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 40,
            backoff_multiplier: 2.0,
        },
        db_path: ":memory:".into(),
        grading: GradingConfig::default(),
    }
}

/// Copy the fixtures into a fresh temp dir, skipping `omit`.
fn fixture_copy(name: &str, omit: &[&str]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "courtside_pipeline_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    for entry in std::fs::read_dir(fixtures()).unwrap() {
        let path = entry.unwrap().path();
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        if omit.contains(&file_name.as_str()) {
            continue;
        }
        std::fs::copy(&path, dir.join(&file_name)).unwrap();
    }
    dir
}

async fn graded_fixtures() -> GradeTable {
    let source = CsvSnapshotSource::new(fixtures());
    let tables = collect_tables(&source).await.unwrap();
    grade_population(tables, &GradingConfig::default()).unwrap()
}

// ===========================================================================
// Collection
// ===========================================================================

#[tokio::test]
async fn collects_all_categories_in_order() {
    let source = CsvSnapshotSource::new(fixtures());
    let tables = collect_tables(&source).await.unwrap();
    let categories: Vec<StatCategory> = tables.iter().map(|t| t.category).collect();
    assert_eq!(categories, StatCategory::ALL.to_vec());

    let hustle = &tables[3];
    assert_eq!(hustle.len(), 7, "hustle fixture has one player fewer");
    let dunk = tables.iter().find(|t| t.category == StatCategory::Dunk).unwrap();
    assert_eq!(dunk.columns, vec!["dunk_fga"]);
    assert_eq!(dunk.len(), 8, "only the Dunk group rows survive");
    let opponent = tables
        .iter()
        .find(|t| t.category == StatCategory::Opponent)
        .unwrap();
    assert_eq!(opponent.len(), 8, "traded player's two rows are averaged");
}

// ===========================================================================
// Grading
// ===========================================================================

#[tokio::test]
async fn player_missing_from_one_table_is_not_graded() {
    let table = graded_fixtures().await;
    assert_eq!(table.len(), 7);
    assert!(table.get(201008).is_none());
    let ids: Vec<i64> = table.players.iter().map(|p| p.player_id).collect();
    assert_eq!(
        ids,
        vec![201001, 201002, 201003, 201004, 201005, 201006, 201007]
    );
}

#[tokio::test]
async fn grades_ranks_and_labels_are_well_formed() {
    let table = graded_fixtures().await;
    let vocab = vocabulary();
    for p in &table.players {
        for (grade, value) in p.grades.entries() {
            assert!((0.0..=100.0).contains(&value), "{} {grade} = {value}", p.player_name);
        }
        for (_, rank) in p.ranks.entries() {
            assert!(rank > 0.0 && rank <= 100.0);
        }
        assert!((p.avg_grade - p.grades.average()).abs() < 1e-9);
        assert!(vocab.contains(&p.archetype), "{}", p.archetype);
    }
}

#[tokio::test]
async fn fixture_archetypes() {
    let table = graded_fixtures().await;
    let label = |id: i64| table.get(id).unwrap().archetype;

    // High three-point share and accuracy, Scoring over Playmaking.
    assert_eq!(label(201001), "Sharpshooting Maestro");
    // Rebounding over Defense with blocks well above the median.
    assert_eq!(label(201002), "Rim Guardian");
    assert_eq!(label(201004), "Rim Guardian");
    // Playmaking over Scoring with heavy secondary assists.
    assert_eq!(label(201005), "Orchestrating Star");
    // Low grades in under 15 minutes.
    assert_eq!(label(201006), BENCHWARMER);
    // Athleticism clear of Defense by more than 15.
    assert_eq!(label(201007), "Hustle Spark");
}

#[tokio::test]
async fn identity_and_raw_stats_carried_through() {
    let table = graded_fixtures().await;
    let p = table.get(201007).unwrap();
    assert_eq!(p.player_name, "Ruben Castillo");
    assert_eq!(p.team, "LAL");
    assert_eq!(p.minutes, 30.4);

    let opp3 = p.stats["opp_fg3_pct"].as_f64().unwrap();
    assert!((opp3 - 0.335).abs() < 1e-9, "averaged across both teams: {opp3}");
    assert_eq!(p.stats["dunk_fga"].as_f64(), Some(2.1));

    // Blank loose-ball cell reads as zero.
    let benton = table.get(201006).unwrap();
    assert_eq!(benton.stats["loose_balls_recovered"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn rebounding_rank_follows_grade() {
    let table = graded_fixtures().await;
    let best = table
        .players
        .iter()
        .max_by(|a, b| a.grades.rebounding.total_cmp(&b.grades.rebounding))
        .unwrap();
    assert_eq!(best.player_id, 201002);
    assert_eq!(best.ranks.rebounding, 100.0);
}

// ===========================================================================
// Refresh and storage
// ===========================================================================

#[tokio::test]
async fn refresh_persists_grade_table() {
    let config = test_config();
    let db = Database::open(":memory:").unwrap();
    let source = RetryingSource::new(CsvSnapshotSource::new(fixtures()), config.retry.clone());

    let summary = refresh_grades(&source, &db, &config).await.unwrap();
    assert_eq!(summary.season, "2024-25");
    assert_eq!(summary.players, 7);
    assert_eq!(summary.archetypes.values().sum::<usize>(), 7);

    assert_eq!(db.grade_count().unwrap(), 7);
    let stored = db.load_grade(201005).unwrap().unwrap();
    assert_eq!(stored.archetype, "Orchestrating Star");
    assert_eq!(stored.team, "PHX");
    assert!(stored.stats.contains_key("secondary_ast"));

    let all = db.load_grades().unwrap();
    for pair in all.windows(2) {
        assert!(pair[0].avg_grade >= pair[1].avg_grade);
    }

    let run = db.last_run().unwrap().unwrap();
    assert_eq!(run.season, "2024-25");
    assert_eq!(run.player_count, 7);
}

#[tokio::test]
async fn second_refresh_replaces_rows() {
    let config = test_config();
    let db = Database::open(":memory:").unwrap();
    let source = CsvSnapshotSource::new(fixtures());

    refresh_grades(&source, &db, &config).await.unwrap();
    let first = db.load_grades().unwrap();
    refresh_grades(&source, &db, &config).await.unwrap();
    let second = db.load_grades().unwrap();
    assert_eq!(first, second);
    assert_eq!(db.grade_count().unwrap(), 7);
}

#[tokio::test]
async fn missing_table_aborts_without_touching_store() {
    let config = test_config();
    let db = Database::open(":memory:").unwrap();
    refresh_grades(&CsvSnapshotSource::new(fixtures()), &db, &config)
        .await
        .unwrap();

    let dir = fixture_copy("missing_dunk", &["dunk.csv"]);
    let source = RetryingSource::new(CsvSnapshotSource::new(&dir), config.retry.clone());

    let err = collect_tables(&source).await.unwrap_err();
    assert!(
        matches!(
            err,
            PipelineError::Fetch(FetchError::NotFound {
                category: StatCategory::Dunk,
                ..
            })
        ),
        "got {err:?}"
    );

    let err = refresh_grades(&source, &db, &config).await.unwrap_err();
    assert!(err.to_string().contains("collect"), "{err:#}");
    assert_eq!(db.grade_count().unwrap(), 7, "previous grades kept");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn table_without_identity_is_error() {
    let dir = fixture_copy("no_identity", &[]);
    std::fs::write(dir.join("misc.csv"), "PLAYER_NAME,PTS_FB\nSomeone,1.0\n").unwrap();
    let source = CsvSnapshotSource::new(&dir);

    let err = collect_tables(&source).await.unwrap_err();
    assert!(matches!(err, PipelineError::Table(_)), "got {err:?}");

    let _ = std::fs::remove_dir_all(&dir);
}

// ===========================================================================
// Store seam
// ===========================================================================

struct RecordingStore {
    seen: std::sync::Mutex<Vec<(String, usize)>>,
}

impl GradeStore for RecordingStore {
    fn replace_grades(&self, season: &str, table: &GradeTable) -> anyhow::Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push((season.to_string(), table.len()));
        Ok(())
    }
}

#[tokio::test]
async fn refresh_hands_table_to_any_store() {
    let store = RecordingStore {
        seen: std::sync::Mutex::new(Vec::new()),
    };
    let config = test_config();
    refresh_grades(&CsvSnapshotSource::new(fixtures()), &store, &config)
        .await
        .unwrap();
    assert_eq!(
        *store.seen.lock().unwrap(),
        vec![("2024-25".to_string(), 7)]
    );
}
