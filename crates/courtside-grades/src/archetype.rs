// Archetype classifier: maps a player's grade shape and trait flags onto a
// fixed vocabulary of labels through a declarative (top, second) rule table.

use std::cmp::Ordering;

use courtside_core::config::ArchetypeThresholds;
use tracing::warn;

use crate::grades::Grade::{Athleticism, Defense, Playmaking, Rebounding, Scoring};
use crate::grades::{Grade, Grades};
use crate::scale::median;
use crate::table::{MergedPlayerRow, MergedTable};
use Condition::*;

pub const BENCHWARMER: &str = "Benchwarmer";
pub const ROLE_PLAYER: &str = "Role Player";
pub const VERSATILE_CONTRIBUTOR: &str = "Versatile Contributor";

// ---------------------------------------------------------------------------
// Trait inputs
// ---------------------------------------------------------------------------

/// Population medians the relative trait flags are measured against.
/// Computed once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeagueMedians {
    pub steals: f64,
    pub blocks: f64,
    pub secondary_ast: f64,
    pub opp_fg3_pct: f64,
}

impl LeagueMedians {
    /// Medians over the merged population. Absent columns give 0.
    pub fn from_table(merged: &MergedTable) -> Self {
        let col = |name: &str| median(&merged.numeric_column(name).unwrap_or_default());
        LeagueMedians {
            steals: col("stl"),
            blocks: col("blk"),
            secondary_ast: col("secondary_ast"),
            opp_fg3_pct: col("opp_fg3_pct"),
        }
    }
}

/// The raw per-player stats the trait flags read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraitStats {
    pub pct_pts_3pt: f64,
    pub fg3_pct: f64,
    pub dunk_fga: f64,
    pub pct_pts_paint: f64,
    pub stl: f64,
    pub blk: f64,
    pub opp_fg3_pct: f64,
    pub secondary_ast: f64,
}

impl TraitStats {
    pub fn from_row(merged: &MergedTable, row: &MergedPlayerRow) -> Self {
        TraitStats {
            pct_pts_3pt: merged.value_f64(row, "pct_pts_3pt"),
            fg3_pct: merged.value_f64(row, "fg3_pct"),
            dunk_fga: merged.value_f64(row, "dunk_fga"),
            pct_pts_paint: merged.value_f64(row, "pct_pts_paint"),
            stl: merged.value_f64(row, "stl"),
            blk: merged.value_f64(row, "blk"),
            opp_fg3_pct: merged.value_f64(row, "opp_fg3_pct"),
            secondary_ast: merged.value_f64(row, "secondary_ast"),
        }
    }
}

/// Boolean specializations derived from trait stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraitFlags {
    pub shooter: bool,
    pub rim_finisher: bool,
    pub perimeter_defender: bool,
    pub rim_protector: bool,
    pub secondary_creator: bool,
}

impl TraitFlags {
    pub fn evaluate(
        traits: &TraitStats,
        medians: &LeagueMedians,
        th: &ArchetypeThresholds,
    ) -> Self {
        TraitFlags {
            shooter: traits.pct_pts_3pt > th.shooter_min_three_share
                && traits.fg3_pct > th.shooter_min_three_pct,
            rim_finisher: traits.dunk_fga > th.rim_finisher_min_dunks
                || traits.pct_pts_paint > th.rim_finisher_min_paint_share,
            perimeter_defender: traits.stl > medians.steals * th.perimeter_steal_multiplier
                && traits.opp_fg3_pct < medians.opp_fg3_pct * th.perimeter_opp_three_multiplier,
            rim_protector: traits.blk > medians.blocks * th.rim_protector_block_multiplier,
            secondary_creator: traits.secondary_ast
                > medians.secondary_ast * th.creator_secondary_ast_multiplier,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Shooter,
    RimFinisher,
    PerimeterDefender,
    RimProtector,
    SecondaryCreator,
    /// Top two grades close together and the top one high.
    BalancedElite,
    /// Top grade well clear of the second.
    Skewed,
    /// Third-best grade below `board_passer_max_third`.
    ThirdBelow,
    Always,
}

/// Ordered outcomes for one (top, second) grade pair. First match wins; every
/// list ends in `Always`.
struct PairRule {
    top: Grade,
    second: Grade,
    outcomes: &'static [(Condition, &'static str)],
}

const fn rule(
    top: Grade,
    second: Grade,
    outcomes: &'static [(Condition, &'static str)],
) -> PairRule {
    PairRule {
        top,
        second,
        outcomes,
    }
}

const PAIR_RULES: [PairRule; 20] = [
    // Scoring first
    rule(Scoring, Playmaking, &[
        (Shooter, "Sharpshooting Maestro"),
        (BalancedElite, "Dual-Threat Maestro"),
        (Skewed, "Shot Creator"),
        (Always, "Scoring Playmaker"),
    ]),
    rule(Scoring, Athleticism, &[
        (RimFinisher, "Explosive Finisher"),
        (BalancedElite, "Athletic Scorer"),
        (Skewed, "Dynamic Finisher"),
        (Always, "Scoring Athlete"),
    ]),
    rule(Scoring, Defense, &[
        (PerimeterDefender, "Perimeter Two-Way Threat"),
        (BalancedElite, "Two-Way Star"),
        (Skewed, "Defensive Scorer"),
        (Always, "Scoring Defender"),
    ]),
    rule(Scoring, Rebounding, &[
        (RimFinisher, "Scoring Interior Force"),
        (BalancedElite, "Interior Dual-Threat"),
        (Skewed, "Paint Powerhouse"),
        (Always, "Scoring Rebounder"),
    ]),
    // Playmaking first
    rule(Playmaking, Scoring, &[
        (SecondaryCreator, "Orchestrating Star"),
        (BalancedElite, "Playmaking Scorer"),
        (Skewed, "Dual-Threat Guard"),
        (Always, "Facilitating Scorer"),
    ]),
    rule(Playmaking, Defense, &[
        (PerimeterDefender, "Defensive Floor General"),
        (BalancedElite, "Disruptive Playmaker"),
        (Skewed, "Pesky Facilitator"),
        (Always, "Defensive Distributor"),
    ]),
    rule(Playmaking, Athleticism, &[
        (BalancedElite, "Dynamic Facilitator"),
        (Skewed, "Pace Pusher"),
        (Always, "Athletic Playmaker"),
    ]),
    rule(Playmaking, Rebounding, &[
        (BalancedElite, "Rebounding Playmaker"),
        (Skewed, "Rebound Distributor"),
        (ThirdBelow, "Board Passer"),
        (Always, "Rebounding Maestro"),
    ]),
    // Rebounding first
    rule(Rebounding, Defense, &[
        (RimProtector, "Rim Guardian"),
        (BalancedElite, "Defensive Rebounder"),
        (Skewed, "Paint Protector"),
        (Always, "Rebounding Defender"),
    ]),
    rule(Rebounding, Scoring, &[
        (BalancedElite, "Scoring Boardmaster"),
        (Skewed, "Post Operator"),
        (Always, "Rebounding Scorer"),
    ]),
    rule(Rebounding, Athleticism, &[
        (BalancedElite, "Athletic Board-Crasher"),
        (Skewed, "Energy Big"),
        (Always, "Rebounding Athlete"),
    ]),
    rule(Rebounding, Playmaking, &[
        (BalancedElite, "Facilitating Rebounder"),
        (Skewed, "Outlet Specialist"),
        (Always, "Board Facilitator"),
    ]),
    // Defense first
    rule(Defense, Rebounding, &[
        (RimProtector, "Defensive Anchor"),
        (BalancedElite, "Rebounding Stopper"),
        (Skewed, "Interior Wall"),
        (Always, "Defensive Rebounder"),
    ]),
    rule(Defense, Athleticism, &[
        (PerimeterDefender, "Perimeter Hawk"),
        (BalancedElite, "Athletic Defender"),
        (Skewed, "Active Defender"),
        (Always, "Hustle Defender"),
    ]),
    rule(Defense, Scoring, &[
        (BalancedElite, "Two-Way Threat"),
        (Skewed, "Defensive Scorer"),
        (Always, "Scoring Stopper"),
    ]),
    rule(Defense, Playmaking, &[
        (BalancedElite, "Playmaking Defender"),
        (Skewed, "Pesky Facilitator"),
        (Always, "Disruptive Distributor"),
    ]),
    // Athleticism first
    rule(Athleticism, Scoring, &[
        (RimFinisher, "Athletic Phenom"),
        (BalancedElite, "Scoring Dynamo"),
        (Skewed, "Highlight Maker"),
        (Always, "Athletic Scorer"),
    ]),
    rule(Athleticism, Defense, &[
        (PerimeterDefender, "Energy Stopper"),
        (BalancedElite, "Defensive Athlete"),
        (Skewed, "Hustle Spark"),
        (Always, "Active Athlete"),
    ]),
    rule(Athleticism, Rebounding, &[
        (BalancedElite, "Rebounding Dynamo"),
        (Skewed, "Rebound Athlete"),
        (Always, "Athletic Board-Grabber"),
    ]),
    rule(Athleticism, Playmaking, &[
        (BalancedElite, "Playmaking Athlete"),
        (Skewed, "Fast-Break Igniter"),
        (Always, "Dynamic Distributor"),
    ]),
];

/// Grade shape measurements shared by every condition.
struct Shape {
    top: f64,
    diff: f64,
    third: f64,
}

impl Condition {
    fn holds(self, shape: &Shape, flags: &TraitFlags, th: &ArchetypeThresholds) -> bool {
        match self {
            Shooter => flags.shooter,
            RimFinisher => flags.rim_finisher,
            PerimeterDefender => flags.perimeter_defender,
            RimProtector => flags.rim_protector,
            SecondaryCreator => flags.secondary_creator,
            BalancedElite => shape.diff <= th.balanced_max_diff && shape.top >= th.elite_min_score,
            Skewed => shape.diff > th.skewed_min_diff,
            ThirdBelow => shape.third < th.board_passer_max_third,
            Always => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Grades sorted descending. The sort is stable, so equal grades keep
/// `Grade::ALL` order.
pub fn ranked_grades(grades: &Grades) -> [(Grade, f64); 5] {
    let mut entries = grades.entries();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    entries
}

/// Assign an archetype label. Pure and deterministic in its inputs.
pub fn classify(
    grades: &Grades,
    minutes: f64,
    traits: &TraitStats,
    medians: &LeagueMedians,
    th: &ArchetypeThresholds,
) -> &'static str {
    if grades.average() < th.benchwarmer_max_avg_grade && minutes < th.benchwarmer_max_minutes {
        return BENCHWARMER;
    }
    if grades
        .entries()
        .iter()
        .all(|&(_, g)| g >= th.role_player_low && g <= th.role_player_high)
    {
        return ROLE_PLAYER;
    }

    let ranked = ranked_grades(grades);
    let (top, top_score) = ranked[0];
    let (second, second_score) = ranked[1];
    let shape = Shape {
        top: top_score,
        diff: top_score - second_score,
        third: ranked[2].1,
    };
    let flags = TraitFlags::evaluate(traits, medians, th);

    let outcome = PAIR_RULES
        .iter()
        .find(|r| r.top == top && r.second == second)
        .and_then(|r| {
            r.outcomes
                .iter()
                .find(|(cond, _)| cond.holds(&shape, &flags, th))
                .map(|&(_, label)| label)
        });

    match outcome {
        Some(label) => label,
        None => {
            warn!("no archetype rule for top={top} second={second}; using fallback");
            VERSATILE_CONTRIBUTOR
        }
    }
}

/// Every label `classify` can return, deduplicated, in table order.
pub fn vocabulary() -> Vec<&'static str> {
    let mut labels = vec![BENCHWARMER, ROLE_PLAYER];
    for rule in &PAIR_RULES {
        for &(_, label) in rule.outcomes {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }
    labels.push(VERSATILE_CONTRIBUTOR);
    labels
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
