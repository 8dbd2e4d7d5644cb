// End-to-end grade run: collect tables from a source, grade the merged
// population, classify archetypes and hand the result to a store.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Context;
use courtside_core::config::{Config, GradingConfig};
use courtside_core::db::{Database, GradeRecord};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::info;

use crate::archetype::{classify, LeagueMedians, TraitStats};
use crate::grades::{compute_grades, compute_ranks, GradeError, Grades};
use crate::source::{FetchError, TableSource};
use crate::table::merge::merge_tables;
use crate::table::normalize::{normalize_table, TableError};
use crate::table::{FieldValue, MergedPlayerRow, MergedTable, StatCategory, StatTable};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error("no player appears in every stat table")]
    EmptyPopulation,
}

// ---------------------------------------------------------------------------
// Output model
// ---------------------------------------------------------------------------

/// One graded player: identity, raw merged stats, grades, ranks, archetype.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedPlayer {
    pub player_id: i64,
    pub player_name: String,
    pub team: String,
    pub minutes: f64,
    pub stats: Map<String, Value>,
    pub grades: Grades,
    pub ranks: Grades,
    pub avg_grade: f64,
    pub archetype: &'static str,
}

impl GradedPlayer {
    pub fn to_record(&self) -> GradeRecord {
        GradeRecord {
            player_id: self.player_id,
            player_name: self.player_name.clone(),
            team: self.team.clone(),
            minutes: self.minutes,
            scoring: self.grades.scoring,
            playmaking: self.grades.playmaking,
            rebounding: self.grades.rebounding,
            defense: self.grades.defense,
            athleticism: self.grades.athleticism,
            scoring_rank: self.ranks.scoring,
            playmaking_rank: self.ranks.playmaking,
            rebounding_rank: self.ranks.rebounding,
            defense_rank: self.ranks.defense,
            athleticism_rank: self.ranks.athleticism,
            avg_grade: self.avg_grade,
            archetype: self.archetype.to_string(),
            stats: self.stats.clone(),
        }
    }
}

/// The graded population in merge order, plus the merged column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeTable {
    pub columns: Vec<String>,
    pub players: Vec<GradedPlayer>,
}

impl GradeTable {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, player_id: i64) -> Option<&GradedPlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn records(&self) -> Vec<GradeRecord> {
        self.players.iter().map(GradedPlayer::to_record).collect()
    }

    /// Player count per archetype label.
    pub fn archetype_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.players {
            *counts.entry(p.archetype).or_insert(0) += 1;
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// Merge the normalized tables and grade everyone who appears in all of them.
///
/// Population statistics (normalization bounds, z-scores, ranks, medians) are
/// taken over the merged population only.
pub fn grade_population(
    tables: Vec<StatTable>,
    config: &GradingConfig,
) -> Result<GradeTable, PipelineError> {
    let merged = merge_tables(&tables);
    drop(tables);
    if merged.is_empty() {
        return Err(PipelineError::EmptyPopulation);
    }

    let medians = LeagueMedians::from_table(&merged);
    let grades = compute_grades(&merged, &config.formulas)?;
    let ranks = compute_ranks(&grades);

    let players = merged
        .rows
        .iter()
        .zip(grades)
        .zip(ranks)
        .map(|((row, grades), ranks)| {
            let minutes = merged.value_f64(row, "min");
            let traits = TraitStats::from_row(&merged, row);
            GradedPlayer {
                player_id: row.player_id,
                player_name: merged
                    .value_text(row, "player_name")
                    .unwrap_or_default()
                    .to_string(),
                team: merged
                    .value_text(row, "team_abbreviation")
                    .unwrap_or_default()
                    .to_string(),
                minutes,
                stats: stats_map(&merged, row),
                avg_grade: grades.average(),
                archetype: classify(&grades, minutes, &traits, &medians, &config.archetypes),
                grades,
                ranks,
            }
        })
        .collect();

    Ok(GradeTable {
        columns: merged.columns,
        players,
    })
}

fn stats_map(merged: &MergedTable, row: &MergedPlayerRow) -> Map<String, Value> {
    merged
        .columns
        .iter()
        .zip(&row.values)
        .map(|(name, value)| {
            let json = match value {
                FieldValue::Int(v) => Value::from(*v),
                FieldValue::Float(v) => Number::from_f64(*v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                FieldValue::Text(s) => Value::String(s.clone()),
            };
            (name.clone(), json)
        })
        .collect()
}

/// Fetch and normalize every category in declaration order. The first
/// failure aborts the run.
pub async fn collect_tables(source: &dyn TableSource) -> Result<Vec<StatTable>, PipelineError> {
    let mut tables = Vec::with_capacity(StatCategory::ALL.len());
    for category in StatCategory::ALL {
        let raw = source.fetch_table(category).await?;
        let table = normalize_table(category, &raw)?;
        info!(
            "{category}: {} players, {} columns",
            table.len(),
            table.columns.len()
        );
        tables.push(table);
    }
    Ok(tables)
}

// ---------------------------------------------------------------------------
// Storage seam
// ---------------------------------------------------------------------------

/// Where a finished grade table is written. Each call replaces the whole
/// stored table.
pub trait GradeStore: Send + Sync {
    fn replace_grades(&self, season: &str, table: &GradeTable) -> anyhow::Result<()>;
}

impl GradeStore for Database {
    fn replace_grades(&self, season: &str, table: &GradeTable) -> anyhow::Result<()> {
        Database::replace_grades(self, season, &table.records())
    }
}

/// Outcome of one `refresh_grades` run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub season: String,
    pub players: usize,
    pub archetypes: BTreeMap<&'static str, usize>,
}

/// Collect, grade and store one season. Nothing is written unless grading
/// succeeds.
pub async fn refresh_grades(
    source: &dyn TableSource,
    store: &dyn GradeStore,
    config: &Config,
) -> anyhow::Result<RunSummary> {
    let started = Instant::now();
    let season = &config.season.label;
    info!("Grade refresh for {season} starting");

    let tables = collect_tables(source)
        .await
        .context("failed to collect stat tables")?;
    let table = grade_population(tables, &config.grading).context("failed to grade population")?;

    store
        .replace_grades(season, &table)
        .with_context(|| format!("failed to store grades for {season}"))?;

    let summary = RunSummary {
        season: season.clone(),
        players: table.len(),
        archetypes: table.archetype_counts(),
    };
    info!(
        "Grade refresh for {season} complete: {} players, {} archetypes in {:.2?}",
        summary.players,
        summary.archetypes.len(),
        started.elapsed()
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
