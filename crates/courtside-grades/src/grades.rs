// Grade calculator: weighted formulas over normalized columns, rescaled into
// the 0-100 band, plus population percentile ranks.

use std::fmt;

use courtside_core::config::{GradeFormula, GradeFormulas};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::scale::{normalize, percentile_rank, rescale};
use crate::table::MergedTable;

#[derive(Debug, Error, PartialEq)]
pub enum GradeError {
    #[error("{grade} formula references column '{column}' which is not in the merged table")]
    MissingColumn { grade: Grade, column: String },
}

// ---------------------------------------------------------------------------
// Grade identity
// ---------------------------------------------------------------------------

/// The five skill grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    Scoring,
    Playmaking,
    Rebounding,
    Defense,
    Athleticism,
}

impl Grade {
    /// Fixed order; also the tie-break order when sorting grades.
    pub const ALL: [Grade; 5] = [
        Grade::Scoring,
        Grade::Playmaking,
        Grade::Rebounding,
        Grade::Defense,
        Grade::Athleticism,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Grade::Scoring => "Scoring",
            Grade::Playmaking => "Playmaking",
            Grade::Rebounding => "Rebounding",
            Grade::Defense => "Defense",
            Grade::Athleticism => "Athleticism",
        }
    }

    pub fn formula(self, formulas: &GradeFormulas) -> &GradeFormula {
        match self {
            Grade::Scoring => &formulas.scoring,
            Grade::Playmaking => &formulas.playmaking,
            Grade::Rebounding => &formulas.rebounding,
            Grade::Defense => &formulas.defense,
            Grade::Athleticism => &formulas.athleticism,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Grade values
// ---------------------------------------------------------------------------

/// One value per grade. Used both for grades and for their percentile ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Grades {
    pub scoring: f64,
    pub playmaking: f64,
    pub rebounding: f64,
    pub defense: f64,
    pub athleticism: f64,
}

impl Grades {
    pub fn get(&self, grade: Grade) -> f64 {
        match grade {
            Grade::Scoring => self.scoring,
            Grade::Playmaking => self.playmaking,
            Grade::Rebounding => self.rebounding,
            Grade::Defense => self.defense,
            Grade::Athleticism => self.athleticism,
        }
    }

    fn set(&mut self, grade: Grade, value: f64) {
        match grade {
            Grade::Scoring => self.scoring = value,
            Grade::Playmaking => self.playmaking = value,
            Grade::Rebounding => self.rebounding = value,
            Grade::Defense => self.defense = value,
            Grade::Athleticism => self.athleticism = value,
        }
    }

    /// `(grade, value)` pairs in `Grade::ALL` order.
    pub fn entries(&self) -> [(Grade, f64); 5] {
        Grade::ALL.map(|g| (g, self.get(g)))
    }

    pub fn average(&self) -> f64 {
        Grade::ALL.iter().map(|&g| self.get(g)).sum::<f64>() / Grade::ALL.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Weighted raw score for one grade across the population, before rescaling:
/// `100 * sum(weight * normalize(column))`.
pub fn raw_scores(
    merged: &MergedTable,
    grade: Grade,
    formula: &GradeFormula,
) -> Result<Vec<f64>, GradeError> {
    let mut raw = vec![0.0; merged.len()];
    for term in &formula.terms {
        let mut column =
            merged
                .numeric_column(&term.column)
                .ok_or_else(|| GradeError::MissingColumn {
                    grade,
                    column: term.column.clone(),
                })?;
        if term.inverted {
            column.iter_mut().for_each(|v| *v = 1.0 - *v);
        }
        for (acc, x) in raw.iter_mut().zip(normalize(&column)) {
            *acc += term.weight * x;
        }
    }
    raw.iter_mut().for_each(|v| *v *= 100.0);
    Ok(raw)
}

/// Compute all five grades for every row of `merged`, in row order.
pub fn compute_grades(
    merged: &MergedTable,
    formulas: &GradeFormulas,
) -> Result<Vec<Grades>, GradeError> {
    let mut out = vec![Grades::default(); merged.len()];
    for grade in Grade::ALL {
        let formula = grade.formula(formulas);
        let raw = raw_scores(merged, grade, formula)?;
        let scaled = rescale(&raw, formula.spread);
        for (g, value) in out.iter_mut().zip(scaled) {
            g.set(grade, value);
        }
        debug!(
            "{grade} grades computed over {} players ({} terms, spread {})",
            merged.len(),
            formula.terms.len(),
            formula.spread
        );
    }
    Ok(out)
}

/// Population percentile rank of each grade, aligned with `grades`.
pub fn compute_ranks(grades: &[Grades]) -> Vec<Grades> {
    let mut out = vec![Grades::default(); grades.len()];
    for grade in Grade::ALL {
        let column: Vec<f64> = grades.iter().map(|g| g.get(grade)).collect();
        for (r, value) in out.iter_mut().zip(percentile_rank(&column)) {
            r.set(grade, value);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
