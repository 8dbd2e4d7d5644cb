// Inner-join of normalized tables on player identity.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::{MergedPlayerRow, MergedTable, StatTable};

/// Inner-join every table on `player_id`, in the given order.
///
/// Starts from the first table; each subsequent table keeps only players it
/// shares with the running result. A player missing from any one table is
/// excluded entirely. When a later table repeats a column name already
/// present, the earlier value wins and the later column is skipped. After all
/// joins, duplicate `player_id` rows are removed keeping the first.
pub fn merge_tables(tables: &[StatTable]) -> MergedTable {
    let Some((first, rest)) = tables.split_first() else {
        return MergedTable::default();
    };

    let mut columns = first.columns.clone();
    let mut rows: Vec<MergedPlayerRow> = first.rows.clone();

    for table in rest {
        // Columns this table contributes (name collisions keep the left side).
        let new_cols: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !columns.contains(name))
            .map(|(i, _)| i)
            .collect();
        for &i in &new_cols {
            columns.push(table.columns[i].clone());
        }

        let mut by_id: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            by_id.entry(row.player_id).or_default().push(i);
        }

        let before = rows.len();
        let mut joined = Vec::with_capacity(rows.len());
        for left in rows {
            let Some(matches) = by_id.get(&left.player_id) else {
                continue;
            };
            for &r in matches {
                let right = &table.rows[r];
                let mut values = left.values.clone();
                values.extend(new_cols.iter().map(|&i| right.values[i].clone()));
                joined.push(MergedPlayerRow {
                    player_id: left.player_id,
                    values,
                });
            }
        }
        rows = joined;

        debug!(
            "joined {}: {} -> {} rows, {} new columns",
            table.category,
            before,
            rows.len(),
            new_cols.len()
        );
    }

    let mut seen = HashSet::new();
    let total = rows.len();
    rows.retain(|row| seen.insert(row.player_id));
    if rows.len() < total {
        debug!("dropped {} duplicate player rows after merge", total - rows.len());
    }

    info!(
        "merged {} tables into {} players x {} columns",
        tables.len(),
        rows.len(),
        columns.len()
    );
    MergedTable::new(columns, rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
