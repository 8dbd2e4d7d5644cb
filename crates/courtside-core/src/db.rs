// SQLite persistence layer for the grade table.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One stored row of the grade table: identity, the five grades, their
/// population percentile ranks, the average, the archetype, and the merged
/// raw stats as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub player_id: i64,
    pub player_name: String,
    pub team: String,
    pub minutes: f64,
    pub scoring: f64,
    pub playmaking: f64,
    pub rebounding: f64,
    pub defense: f64,
    pub athleticism: f64,
    pub scoring_rank: f64,
    pub playmaking_rank: f64,
    pub rebounding_rank: f64,
    pub defense_rank: f64,
    pub athleticism_rank: f64,
    pub avg_grade: f64,
    pub archetype: String,
    pub stats: serde_json::Map<String, serde_json::Value>,
}

/// A completed pipeline run, as recorded in `grade_runs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub season: String,
    pub finished_at: DateTime<Utc>,
    pub player_count: usize,
}

const GRADE_COLUMNS: &str = "player_id, player_name, team, minutes,
    scoring, playmaking, rebounding, defense, athleticism,
    scoring_rank, playmaking_rank, rebounding_rank, defense_rank, athleticism_rank,
    avg_grade, archetype, stats";

/// SQLite-backed store for the current grade table and the run log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS grades (
                player_id        INTEGER PRIMARY KEY,
                player_name      TEXT NOT NULL,
                team             TEXT NOT NULL,
                minutes          REAL NOT NULL,
                scoring          REAL NOT NULL,
                playmaking       REAL NOT NULL,
                rebounding       REAL NOT NULL,
                defense          REAL NOT NULL,
                athleticism      REAL NOT NULL,
                scoring_rank     REAL NOT NULL,
                playmaking_rank  REAL NOT NULL,
                rebounding_rank  REAL NOT NULL,
                defense_rank     REAL NOT NULL,
                athleticism_rank REAL NOT NULL,
                avg_grade        REAL NOT NULL,
                archetype        TEXT NOT NULL,
                stats            TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS grade_runs (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                season       TEXT NOT NULL,
                finished_at  TEXT NOT NULL,
                player_count INTEGER NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;
        debug!("database schema ready at {path}");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Replace the whole grade table with `records` and append a run log
    /// entry, all in one transaction. Readers never observe a half-written
    /// table; on error the previous table is left intact.
    pub fn replace_grades(&self, season: &str, records: &[GradeRecord]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin grade transaction")?;

        tx.execute("DELETE FROM grades", [])
            .context("failed to clear grade table")?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO grades ({GRADE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ))
                .context("failed to prepare grade insert")?;

            for record in records {
                let stats_json = serde_json::to_string(&record.stats)
                    .context("failed to serialize merged stats")?;
                stmt.execute(params![
                    record.player_id,
                    record.player_name,
                    record.team,
                    record.minutes,
                    record.scoring,
                    record.playmaking,
                    record.rebounding,
                    record.defense,
                    record.athleticism,
                    record.scoring_rank,
                    record.playmaking_rank,
                    record.rebounding_rank,
                    record.defense_rank,
                    record.athleticism_rank,
                    record.avg_grade,
                    record.archetype,
                    stats_json,
                ])
                .with_context(|| format!("failed to insert grades for player {}", record.player_id))?;
            }
        }

        tx.execute(
            "INSERT INTO grade_runs (season, finished_at, player_count) VALUES (?1, ?2, ?3)",
            params![season, Utc::now().to_rfc3339(), records.len() as i64],
        )
        .context("failed to record grade run")?;

        tx.commit().context("failed to commit grade table")?;
        info!("replaced grade table for {season} with {} players", records.len());
        Ok(())
    }

    /// Load every stored grade row, best average grade first.
    pub fn load_grades(&self) -> Result<Vec<GradeRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {GRADE_COLUMNS} FROM grades ORDER BY avg_grade DESC, player_id"
            ))
            .context("failed to prepare load_grades query")?;

        let rows = stmt
            .query_map([], read_grade_row)
            .context("failed to query grades")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map grade rows")?;

        Ok(rows)
    }

    /// Load one player's grade row. Returns `None` if the player was not in
    /// the last graded population.
    pub fn load_grade(&self, player_id: i64) -> Result<Option<GradeRecord>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {GRADE_COLUMNS} FROM grades WHERE player_id = ?1"),
            params![player_id],
            read_grade_row,
        )
        .optional()
        .context("failed to query player grade")
    }

    /// Number of rows in the current grade table.
    pub fn grade_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM grades", [], |row| row.get(0))
            .context("failed to count grades")?;
        Ok(count as usize)
    }

    /// The most recent completed run, if any.
    pub fn last_run(&self) -> Result<Option<RunRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT season, finished_at, player_count FROM grade_runs
                 ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let season: String = row.get(0)?;
                    let finished_at: String = row.get(1)?;
                    let player_count: i64 = row.get(2)?;
                    Ok((season, finished_at, player_count))
                },
            )
            .optional()
            .context("failed to query last grade run")?;

        let Some((season, finished_at, player_count)) = row else {
            return Ok(None);
        };
        let finished_at = DateTime::parse_from_rfc3339(&finished_at)
            .with_context(|| format!("invalid run timestamp '{finished_at}'"))?
            .with_timezone(&Utc);

        Ok(Some(RunRecord {
            season,
            finished_at,
            player_count: player_count as usize,
        }))
    }
}

fn read_grade_row(row: &Row<'_>) -> rusqlite::Result<GradeRecord> {
    let stats_json: String = row.get(16)?;
    let stats = serde_json::from_str(&stats_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(16, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(GradeRecord {
        player_id: row.get(0)?,
        player_name: row.get(1)?,
        team: row.get(2)?,
        minutes: row.get(3)?,
        scoring: row.get(4)?,
        playmaking: row.get(5)?,
        rebounding: row.get(6)?,
        defense: row.get(7)?,
        athleticism: row.get(8)?,
        scoring_rank: row.get(9)?,
        playmaking_rank: row.get(10)?,
        rebounding_rank: row.get(11)?,
        defense_rank: row.get(12)?,
        athleticism_rank: row.get(13)?,
        avg_grade: row.get(14)?,
        archetype: row.get(15)?,
        stats,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(player_id: i64, avg_grade: f64, archetype: &str) -> GradeRecord {
        let mut stats = serde_json::Map::new();
        stats.insert("pts".into(), serde_json::json!(20.5));
        stats.insert("player_name".into(), serde_json::json!(format!("Player {player_id}")));
        GradeRecord {
            player_id,
            player_name: format!("Player {player_id}"),
            team: "BOS".into(),
            minutes: 30.0,
            scoring: avg_grade,
            playmaking: avg_grade,
            rebounding: avg_grade,
            defense: avg_grade,
            athleticism: avg_grade,
            scoring_rank: 50.0,
            playmaking_rank: 50.0,
            rebounding_rank: 50.0,
            defense_rank: 50.0,
            athleticism_rank: 50.0,
            avg_grade,
            archetype: archetype.into(),
            stats,
        }
    }

    #[test]
    fn open_in_memory() {
        let db = Database::open(":memory:").unwrap();
        assert_eq!(db.grade_count().unwrap(), 0);
        assert!(db.last_run().unwrap().is_none());
    }

    #[test]
    fn replace_then_load_ordered_by_avg_grade() {
        let db = Database::open(":memory:").unwrap();
        let records = vec![
            record(1, 48.0, "Role Player"),
            record(2, 71.0, "Shot Creator"),
            record(3, 35.0, "Benchwarmer"),
        ];
        db.replace_grades("2024-25", &records).unwrap();

        let loaded = db.load_grades().unwrap();
        let ids: Vec<i64> = loaded.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(loaded[0], records[1]);
    }

    #[test]
    fn corrupt_stats_blob_is_reported() {
        let db = Database::open(":memory:").unwrap();
        db.replace_grades("2024-25", &[record(1, 50.0, "Role Player")]).unwrap();
        db.conn()
            .execute("UPDATE grades SET stats = '{not json' WHERE player_id = 1", [])
            .unwrap();

        assert!(db.load_grades().is_err());
        assert!(db.load_grade(1).is_err());
    }

    #[test]
    fn replace_discards_previous_table() {
        let db = Database::open(":memory:").unwrap();
        db.replace_grades("2024-25", &[record(1, 50.0, "Role Player"), record(2, 60.0, "Post Operator")])
            .unwrap();
        db.replace_grades("2024-25", &[record(3, 55.0, "Energy Big")]).unwrap();

        assert_eq!(db.grade_count().unwrap(), 1);
        assert!(db.load_grade(1).unwrap().is_none());
        assert_eq!(db.load_grade(3).unwrap().unwrap().archetype, "Energy Big");
    }

    #[test]
    fn failed_replace_keeps_previous_table() {
        let db = Database::open(":memory:").unwrap();
        db.replace_grades("2024-25", &[record(1, 50.0, "Role Player")]).unwrap();

        // Duplicate primary key aborts the transaction.
        let result = db.replace_grades("2024-25", &[record(7, 50.0, "A"), record(7, 51.0, "B")]);
        assert!(result.is_err());

        assert_eq!(db.grade_count().unwrap(), 1);
        assert!(db.load_grade(1).unwrap().is_some());
        assert_eq!(db.last_run().unwrap().unwrap().player_count, 1);
    }

    #[test]
    fn run_log_records_latest_run() {
        let db = Database::open(":memory:").unwrap();
        let before = Utc::now();
        db.replace_grades("2023-24", &[record(1, 50.0, "Role Player")]).unwrap();
        db.replace_grades("2024-25", &[record(1, 50.0, "Role Player"), record(2, 40.0, "Energy Big")])
            .unwrap();

        let run = db.last_run().unwrap().unwrap();
        assert_eq!(run.season, "2024-25");
        assert_eq!(run.player_count, 2);
        assert!(run.finished_at >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn stats_json_round_trips() {
        let db = Database::open(":memory:").unwrap();
        db.replace_grades("2024-25", &[record(9, 50.0, "Role Player")]).unwrap();
        let loaded = db.load_grade(9).unwrap().unwrap();
        assert_eq!(loaded.stats["pts"], serde_json::json!(20.5));
        assert_eq!(loaded.stats["player_name"], serde_json::json!("Player 9"));
    }
}
