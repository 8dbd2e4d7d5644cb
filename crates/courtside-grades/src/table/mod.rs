// Tabular data model shared by the normalizer, merger and grade engine.

pub mod merge;
pub mod normalize;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Canonical name of the identity column every table is keyed on.
pub const PLAYER_ID: &str = "player_id";

// ---------------------------------------------------------------------------
// Stat categories
// ---------------------------------------------------------------------------

/// The ten per-player source tables, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatCategory {
    Base,
    Advanced,
    Defense,
    Hustle,
    Misc,
    Opponent,
    Passing,
    SpeedDistance,
    Dunk,
    Scoring,
}

impl StatCategory {
    /// All categories in merge order. `Base` comes first so its columns
    /// (name, team, minutes) lead the merged row.
    pub const ALL: [StatCategory; 10] = [
        StatCategory::Base,
        StatCategory::Advanced,
        StatCategory::Defense,
        StatCategory::Hustle,
        StatCategory::Misc,
        StatCategory::Opponent,
        StatCategory::Passing,
        StatCategory::SpeedDistance,
        StatCategory::Dunk,
        StatCategory::Scoring,
    ];

    /// Stable lowercase identifier, used as the snapshot file stem.
    pub fn stem(self) -> &'static str {
        match self {
            StatCategory::Base => "base",
            StatCategory::Advanced => "advanced",
            StatCategory::Defense => "defense",
            StatCategory::Hustle => "hustle",
            StatCategory::Misc => "misc",
            StatCategory::Opponent => "opponent",
            StatCategory::Passing => "passing",
            StatCategory::SpeedDistance => "speed_distance",
            StatCategory::Dunk => "dunk",
            StatCategory::Scoring => "scoring",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

// ---------------------------------------------------------------------------
// Raw provider tables
// ---------------------------------------------------------------------------

/// A provider-shaped table exactly as fetched: header names and string cells.
/// Records may be shorter than the header; missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        RawTable { headers, records }
    }

    /// Parse a CSV document (header row first) into a raw table.
    pub fn from_csv_reader<R: std::io::Read>(rdr: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Ok(RawTable { headers, records })
    }
}

// ---------------------------------------------------------------------------
// Typed values
// ---------------------------------------------------------------------------

/// A single coerced cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the cell. Text reads as 0, matching the coercion rule
    /// for unparseable numerics.
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Int(v) => *v as f64,
            FieldValue::Float(v) => *v,
            FieldValue::Text(_) => 0.0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized tables
// ---------------------------------------------------------------------------

/// One normalized row: the player key plus one value per table column.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatRow {
    pub player_id: i64,
    pub values: Vec<FieldValue>,
}

/// A normalized per-category table with canonical column names.
///
/// `columns` excludes `player_id`, which lives on each row; every row's
/// `values` is aligned with `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    pub category: StatCategory,
    pub columns: Vec<String>,
    pub rows: Vec<PlayerStatRow>,
}

impl StatTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Merged table
// ---------------------------------------------------------------------------

/// The wide row produced by joining every category on `player_id`.
pub type MergedPlayerRow = PlayerStatRow;

/// The merged population. `player_id` is unique across `rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub rows: Vec<MergedPlayerRow>,
    index: HashMap<String, usize>,
}

impl MergedTable {
    pub fn new(columns: Vec<String>, rows: Vec<MergedPlayerRow>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        MergedTable {
            columns,
            rows,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// The numeric values of one column across the whole population, in row
    /// order. Returns `None` when the column is absent.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx].as_f64()).collect())
    }

    /// Numeric value of `name` in `row`, 0 when the column is absent.
    pub fn value_f64(&self, row: &MergedPlayerRow, name: &str) -> f64 {
        self.column_index(name)
            .map(|idx| row.values[idx].as_f64())
            .unwrap_or(0.0)
    }

    /// Text value of `name` in `row`, if present and textual.
    pub fn value_text<'a>(&self, row: &'a MergedPlayerRow, name: &str) -> Option<&'a str> {
        self.column_index(name).and_then(|idx| row.values[idx].as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_table_from_csv_trims_and_keeps_short_records() {
        let csv_data = "\
PLAYER_ID, PTS ,TEAM
1,20.5, BOS
2,11";
        let raw = RawTable::from_csv_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(raw.headers, vec!["PLAYER_ID", "PTS", "TEAM"]);
        assert_eq!(raw.records[0], vec!["1", "20.5", "BOS"]);
        assert_eq!(raw.records[1], vec!["2", "11"]);
    }

    #[test]
    fn category_stems_are_unique() {
        let mut stems: Vec<&str> = StatCategory::ALL.iter().map(|c| c.stem()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), StatCategory::ALL.len());
    }

    #[test]
    fn merged_table_lookups() {
        let table = MergedTable::new(
            vec!["player_name".into(), "pts".into()],
            vec![PlayerStatRow {
                player_id: 7,
                values: vec![FieldValue::Text("A B".into()), FieldValue::Float(12.0)],
            }],
        );
        assert!(table.has_column("pts"));
        assert_eq!(table.numeric_column("pts"), Some(vec![12.0]));
        assert_eq!(table.numeric_column("reb"), None);
        assert_eq!(table.value_text(&table.rows[0], "player_name"), Some("A B"));
        assert_eq!(table.value_f64(&table.rows[0], "player_name"), 0.0);
        assert_eq!(table.value_f64(&table.rows[0], "missing"), 0.0);
    }
}
