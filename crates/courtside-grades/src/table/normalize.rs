// Per-category table normalization: column pruning, renaming, derived text
// fields, and type coercion into canonical `StatTable`s.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{FieldValue, PlayerStatRow, RawTable, StatCategory, StatTable};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("{category} table has no player identity column (expected one of {expected:?})")]
    MissingIdentity {
        category: StatCategory,
        expected: &'static [&'static str],
    },
}

// ---------------------------------------------------------------------------
// Column rules
// ---------------------------------------------------------------------------

/// Provider columns containing any of these substrings are never kept:
/// rank duplicates, URL slugs, timeframe markers, fantasy scoring.
pub const DROP_PATTERNS: &[&str] = &["_RANK", "SLUG", "STATS_TIMEFRAME", "IS_DEFUNCT", "FANTASY"];

/// Identity and bookkeeping columns that only the base table contributes.
const SHARED_META: &[&str] = &[
    "PLAYER_NAME",
    "NICKNAME",
    "TEAM_ID",
    "TEAM_ABBREVIATION",
    "TEAM_NAME",
    "AGE",
    "GP",
    "G",
    "MIN",
    "W",
    "L",
    "W_PCT",
];

/// Text fields composed from two provider columns joined by a single space.
const DERIVED_TEXT: &[(&str, &str, &str)] = &[
    ("player_full_name", "PLAYER_FIRST_NAME", "PLAYER_LAST_NAME"),
    ("team_full_name", "TEAM_CITY", "TEAM_NAME"),
];

/// Canonical columns coerced to text. Everything not listed here or in
/// `INT_COLUMNS` is a float.
const TEXT_COLUMNS: &[&str] = &[
    "player_name",
    "nickname",
    "team_abbreviation",
    "team_name",
    "team_city",
    "player_first_name",
    "player_last_name",
    "position",
    "college",
    "jersey_number",
    "height",
    "group_set",
    "group_value",
    "vs_player_name",
];

const INT_COLUMNS: &[&str] = &["team_id", "gp", "g"];

/// Per-category pruning and renaming rules.
struct CategorySchema {
    /// Identity columns in order of preference; the first present becomes
    /// `player_id` and the rest are dropped.
    identity: &'static [&'static str],
    /// Drop `SHARED_META` (every table except base).
    drop_shared_meta: bool,
    /// Exact provider column names dropped for this table.
    drop_columns: &'static [&'static str],
    /// When set, only these provider columns survive (besides identity).
    keep_only: Option<&'static [&'static str]>,
    /// Provider -> canonical renames beyond lowercasing.
    renames: &'static [(&'static str, &'static str)],
}

const DEFAULT_IDENTITY: &[&str] = &["PLAYER_ID", "PERSON_ID"];

fn schema(category: StatCategory) -> CategorySchema {
    let base = CategorySchema {
        identity: DEFAULT_IDENTITY,
        drop_shared_meta: true,
        drop_columns: &[],
        keep_only: None,
        renames: &[],
    };
    match category {
        StatCategory::Base => CategorySchema {
            drop_shared_meta: false,
            drop_columns: &["W", "L", "W_PCT", "BLKA", "PFD", "PLUS_MINUS", "DD2", "TD3"],
            ..base
        },
        StatCategory::Advanced => CategorySchema {
            drop_columns: &["FGM", "FGA", "FG_PCT", "FGM_PG", "FGA_PG", "POSS", "PACE_PER40"],
            ..base
        },
        StatCategory::Defense => CategorySchema {
            drop_columns: &["DREB", "STL", "BLK", "PCT_DREB", "PCT_STL", "PCT_BLK"],
            ..base
        },
        StatCategory::Hustle => CategorySchema {
            drop_columns: &["OFF_LOOSE_BALLS_RECOVERED", "DEF_LOOSE_BALLS_RECOVERED"],
            ..base
        },
        StatCategory::Misc => CategorySchema {
            drop_columns: &["BLK", "BLKA", "PF", "PFD"],
            ..base
        },
        StatCategory::Opponent => CategorySchema {
            identity: &["VS_PLAYER_ID", "PLAYER_ID", "PERSON_ID"],
            drop_columns: &["GROUP_SET", "COURT_STATUS", "VS_PLAYER_NAME", "PLUS_MINUS"],
            ..base
        },
        StatCategory::Passing => CategorySchema {
            drop_columns: &["AST"],
            ..base
        },
        StatCategory::SpeedDistance => CategorySchema {
            drop_columns: &["MIN1"],
            ..base
        },
        StatCategory::Dunk => CategorySchema {
            keep_only: Some(&["FGA"]),
            renames: &[("FGA", "dunk_fga")],
            ..base
        },
        StatCategory::Scoring => CategorySchema {
            drop_columns: &["FGM", "FGA", "FG_PCT"],
            ..base
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Int,
    Float,
    Text,
}

fn field_type(canonical: &str) -> FieldType {
    if TEXT_COLUMNS.contains(&canonical) || DERIVED_TEXT.iter().any(|(name, _, _)| *name == canonical) {
        FieldType::Text
    } else if INT_COLUMNS.contains(&canonical) {
        FieldType::Int
    } else {
        FieldType::Float
    }
}

/// Whether a provider column is excluded from `category`'s output.
fn is_dropped(schema: &CategorySchema, column: &str) -> bool {
    if DROP_PATTERNS.iter().any(|p| column.contains(p)) {
        return true;
    }
    if schema.drop_shared_meta && SHARED_META.contains(&column) {
        return true;
    }
    if schema.drop_columns.contains(&column) {
        return true;
    }
    match schema.keep_only {
        Some(keep) => !keep.contains(&column),
        None => false,
    }
}

fn canonical_name(schema: &CategorySchema, column: &str) -> String {
    schema
        .renames
        .iter()
        .find(|(from, _)| *from == column)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| column.to_lowercase())
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Parse a float cell. Empty, unparseable and non-finite cells are `None`.
fn parse_float(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer cell, accepting float-formatted integers ("12.0").
fn parse_int(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>()
        .ok()
        .or_else(|| parse_float(cell).map(|v| v.round() as i64))
}

/// Coerce one cell to its declared type. Returns the value and whether the
/// cell had to fall back to zero.
fn coerce(cell: &str, ty: FieldType) -> (FieldValue, bool) {
    match ty {
        FieldType::Text => (FieldValue::Text(cell.trim().to_string()), false),
        FieldType::Int => match parse_int(cell) {
            Some(v) => (FieldValue::Int(v), false),
            None => (FieldValue::Int(0), true),
        },
        FieldType::Float => match parse_float(cell) {
            Some(v) => (FieldValue::Float(v), false),
            None => (FieldValue::Float(0.0), true),
        },
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Where an output column's value comes from.
enum ColumnSource {
    Raw(usize),
    Derived(usize, usize),
}

/// Normalize one provider table into a canonical `StatTable`.
///
/// Missing optional columns are simply absent from the output. Unparseable
/// numeric cells become 0. The only error is a table with no identity
/// column, since nothing could be joined on it.
pub fn normalize_table(category: StatCategory, raw: &RawTable) -> Result<StatTable, TableError> {
    let schema = schema(category);
    let header_index: HashMap<&str, usize> = raw
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let Some(id_idx) = schema
        .identity
        .iter()
        .find_map(|name| header_index.get(name).copied())
    else {
        return Err(TableError::MissingIdentity {
            category,
            expected: schema.identity,
        });
    };

    // ---- Column plan: derived text first, then surviving provider columns ----
    let mut columns: Vec<String> = Vec::new();
    let mut sources: Vec<ColumnSource> = Vec::new();

    for (name, first, second) in DERIVED_TEXT {
        if let (Some(&a), Some(&b)) = (header_index.get(first), header_index.get(second)) {
            columns.push(name.to_string());
            sources.push(ColumnSource::Derived(a, b));
        }
    }

    for (i, header) in raw.headers.iter().enumerate() {
        if schema.identity.contains(&header.as_str()) || is_dropped(&schema, header) {
            continue;
        }
        let canonical = canonical_name(&schema, header);
        if columns.contains(&canonical) {
            debug!("{category}: duplicate column '{header}' ignored");
            continue;
        }
        columns.push(canonical);
        sources.push(ColumnSource::Raw(i));
    }

    let types: Vec<FieldType> = columns.iter().map(|c| field_type(c)).collect();

    // ---- Row filter (dunk split table) ----
    let group_idx = header_index.get("GROUP_VALUE").copied();
    let keep_record = |record: &Vec<String>| -> bool {
        match (category, group_idx) {
            (StatCategory::Dunk, Some(idx)) => cell(record, idx).eq_ignore_ascii_case("dunk"),
            _ => true,
        }
    };

    // ---- Coerce ----
    let mut coerced_counts = vec![0usize; columns.len()];
    let mut rows = Vec::with_capacity(raw.records.len());

    for record in raw.records.iter().filter(|r| keep_record(r)) {
        let player_id = match parse_int(cell(record, id_idx)) {
            Some(id) => id,
            None => {
                warn!(
                    "{category}: unparseable player id '{}' coerced to 0",
                    cell(record, id_idx)
                );
                0
            }
        };

        let mut values = Vec::with_capacity(columns.len());
        for (col, source) in sources.iter().enumerate() {
            let (value, fell_back) = match source {
                ColumnSource::Raw(idx) => coerce(cell(record, *idx), types[col]),
                ColumnSource::Derived(a, b) => (
                    FieldValue::Text(format!("{} {}", cell(record, *a), cell(record, *b))),
                    false,
                ),
            };
            if fell_back {
                coerced_counts[col] += 1;
            }
            values.push(value);
        }
        rows.push(PlayerStatRow { player_id, values });
    }

    for (col, count) in coerced_counts.iter().enumerate() {
        if *count > 0 {
            debug!("{category}: {count} unparseable '{}' cells coerced to 0", columns[col]);
        }
    }

    let mut table = StatTable {
        category,
        columns,
        rows,
    };

    if category == StatCategory::Opponent {
        table = average_duplicate_players(table);
    }

    debug!(
        "{category}: normalized {} rows x {} columns",
        table.rows.len(),
        table.columns.len()
    );
    Ok(table)
}

fn cell(record: &[String], idx: usize) -> &str {
    record.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Collapse rows sharing a `player_id` into one. Float fields become the
/// arithmetic mean of the group; other fields keep the first occurrence.
/// Group order follows first appearance.
///
/// Opponent-on splits are reported per team, so a player traded mid-season
/// has one row per team.
pub fn average_duplicate_players(table: StatTable) -> StatTable {
    let mut order: Vec<i64> = Vec::new();
    let mut groups: HashMap<i64, (PlayerStatRow, Vec<f64>, usize)> = HashMap::new();

    for row in table.rows {
        match groups.get_mut(&row.player_id) {
            Some((_, sums, count)) => {
                for (sum, value) in sums.iter_mut().zip(&row.values) {
                    if let FieldValue::Float(v) = value {
                        *sum += v;
                    }
                }
                *count += 1;
            }
            None => {
                let sums = row
                    .values
                    .iter()
                    .map(|v| match v {
                        FieldValue::Float(f) => *f,
                        _ => 0.0,
                    })
                    .collect();
                order.push(row.player_id);
                groups.insert(row.player_id, (row, sums, 1));
            }
        }
    }

    let rows = order
        .into_iter()
        .filter_map(|id| groups.remove(&id))
        .map(|(mut first, sums, count)| {
            for (value, sum) in first.values.iter_mut().zip(sums) {
                if let FieldValue::Float(v) = value {
                    *v = sum / count as f64;
                }
            }
            first
        })
        .collect();

    StatTable { rows, ..table }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
