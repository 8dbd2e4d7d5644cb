// Configuration loading and parsing (courtside.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

/// Name of the single config file under `config/` (and `defaults/`).
pub const CONFIG_FILE: &str = "courtside.toml";

/// Tolerance when checking that a formula's absolute weights sum to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub season: SeasonConfig,
    pub sources: SourcesConfig,
    pub retry: RetryConfig,
    pub db_path: String,
    pub grading: GradingConfig,
}

// ---------------------------------------------------------------------------
// courtside.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire courtside.toml file.
#[derive(Debug, Clone, Deserialize)]
struct CourtsideFile {
    season: SeasonConfig,
    sources: SourcesConfig,
    #[serde(default)]
    retry: RetryConfig,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    grades: GradeFormulas,
    #[serde(default)]
    archetypes: ArchetypeThresholds,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    /// Season label, e.g. "2024-25". Used for logging and the run log.
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Directory holding one `<category>.csv` snapshot per stat table.
    pub snapshot_dir: String,
}

/// Bounded retry policy for table fetches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 8,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Everything the grade pipeline needs: the five formulas and the archetype
/// thresholds. Built once per run and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct GradingConfig {
    pub formulas: GradeFormulas,
    pub archetypes: ArchetypeThresholds,
}

/// One weighted term of a grade formula.
///
/// `inverted` feeds `1 - x` into the min-max normalization instead of `x`,
/// so a lower raw value scores higher (opponent FG%).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormulaTerm {
    pub column: String,
    pub weight: f64,
    #[serde(default)]
    pub inverted: bool,
}

impl FormulaTerm {
    pub fn new(column: &str, weight: f64) -> Self {
        FormulaTerm {
            column: column.to_string(),
            weight,
            inverted: false,
        }
    }

    pub fn inverted(column: &str, weight: f64) -> Self {
        FormulaTerm {
            inverted: true,
            ..FormulaTerm::new(column, weight)
        }
    }
}

/// A weighted-sum grade formula plus the spread factor handed to `rescale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradeFormula {
    pub spread: f64,
    pub terms: Vec<FormulaTerm>,
}

/// The five grade formulas. Any formula omitted from the TOML keeps its
/// built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GradeFormulas {
    pub scoring: GradeFormula,
    pub playmaking: GradeFormula,
    pub rebounding: GradeFormula,
    pub defense: GradeFormula,
    pub athleticism: GradeFormula,
}

impl GradeFormulas {
    /// Formulas paired with their TOML section names, in grade order.
    pub fn named(&self) -> [(&'static str, &GradeFormula); 5] {
        [
            ("scoring", &self.scoring),
            ("playmaking", &self.playmaking),
            ("rebounding", &self.rebounding),
            ("defense", &self.defense),
            ("athleticism", &self.athleticism),
        ]
    }
}

impl Default for GradeFormulas {
    fn default() -> Self {
        GradeFormulas {
            scoring: GradeFormula {
                spread: 12.0,
                terms: vec![
                    FormulaTerm::new("pts", 0.30),
                    FormulaTerm::new("fga", 0.10),
                    FormulaTerm::new("fta", 0.10),
                    FormulaTerm::new("ts_pct", 0.20),
                    FormulaTerm::new("efg_pct", 0.10),
                    FormulaTerm::new("pct_uast_fgm", 0.20),
                ],
            },
            playmaking: GradeFormula {
                spread: 10.0,
                terms: vec![
                    FormulaTerm::new("ast", 0.30),
                    FormulaTerm::new("potential_ast", 0.20),
                    FormulaTerm::new("secondary_ast", 0.20),
                    FormulaTerm::new("usg_pct", 0.15),
                    FormulaTerm::new("tov", -0.15),
                ],
            },
            rebounding: GradeFormula {
                spread: 10.0,
                terms: vec![
                    FormulaTerm::new("reb", 0.40),
                    FormulaTerm::new("oreb", 0.30),
                    FormulaTerm::new("dreb", 0.30),
                ],
            },
            defense: GradeFormula {
                spread: 8.0,
                terms: vec![
                    FormulaTerm::new("blk", 0.30),
                    FormulaTerm::new("deflections", 0.15),
                    FormulaTerm::new("stl", 0.15),
                    FormulaTerm::new("def_ws", 0.10),
                    FormulaTerm::new("pf", -0.15),
                    FormulaTerm::inverted("opp_fg_pct", 0.15),
                ],
            },
            athleticism: GradeFormula {
                spread: 12.0,
                terms: vec![
                    FormulaTerm::new("pts_fb", 0.25),
                    FormulaTerm::new("dist_feet", 0.20),
                    FormulaTerm::new("avg_speed", 0.20),
                    FormulaTerm::new("loose_balls_recovered", 0.20),
                    FormulaTerm::new("dunk_fga", 0.15),
                ],
            },
        }
    }
}

/// Thresholds used by the archetype classifier and its trait flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchetypeThresholds {
    pub benchwarmer_max_avg_grade: f64,
    pub benchwarmer_max_minutes: f64,
    pub role_player_low: f64,
    pub role_player_high: f64,
    pub balanced_max_diff: f64,
    pub elite_min_score: f64,
    pub skewed_min_diff: f64,
    pub board_passer_max_third: f64,
    pub shooter_min_three_share: f64,
    pub shooter_min_three_pct: f64,
    pub rim_finisher_min_dunks: f64,
    pub rim_finisher_min_paint_share: f64,
    pub perimeter_steal_multiplier: f64,
    pub perimeter_opp_three_multiplier: f64,
    pub rim_protector_block_multiplier: f64,
    pub creator_secondary_ast_multiplier: f64,
}

impl Default for ArchetypeThresholds {
    fn default() -> Self {
        ArchetypeThresholds {
            benchwarmer_max_avg_grade: 40.0,
            benchwarmer_max_minutes: 15.0,
            role_player_low: 45.0,
            role_player_high: 55.0,
            balanced_max_diff: 10.0,
            elite_min_score: 75.0,
            skewed_min_diff: 15.0,
            board_passer_max_third: 60.0,
            shooter_min_three_share: 0.40,
            shooter_min_three_pct: 0.37,
            rim_finisher_min_dunks: 4.0,
            rim_finisher_min_paint_share: 0.5,
            perimeter_steal_multiplier: 1.5,
            perimeter_opp_three_multiplier: 0.9,
            rim_protector_block_multiplier: 1.5,
            creator_secondary_ast_multiplier: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/courtside.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    debug!("loading config from {}", path.display());
    parse_config(&text).map_err(|e| match e {
        ConfigError::ParseError { source, .. } => ConfigError::ParseError { path, source },
        other => other,
    })
}

/// Parse and validate a config from TOML text. Relative paths are kept as
/// written; they resolve against the process working directory.
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let file: CourtsideFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: PathBuf::from(CONFIG_FILE),
        source: e,
    })?;

    let config = Config {
        season: file.season,
        sources: file.sources,
        retry: file.retry,
        db_path: file.database.path.unwrap_or_else(default_db_path),
        grading: GradingConfig {
            formulas: file.grades,
            archetypes: file.archetypes,
        },
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure the config file exists by copying missing files from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                info!("copied default config to {}", target.display());
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("keeping existing {}", target.display());
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Platform data directory for the grade database, falling back to the
/// working directory when no home directory can be resolved.
fn default_db_path() -> String {
    directories::ProjectDirs::from("", "", "courtside")
        .map(|dirs| dirs.data_dir().join("courtside.db").display().to_string())
        .unwrap_or_else(|| "courtside.db".to_string())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.sources.snapshot_dir.trim().is_empty() {
        return Err(invalid("sources.snapshot_dir", "must not be empty"));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        return Err(invalid("retry.max_attempts", "must be at least 1"));
    }
    if !(retry.backoff_multiplier >= 1.0 && retry.backoff_multiplier.is_finite()) {
        return Err(invalid(
            "retry.backoff_multiplier",
            format!("must be a finite value >= 1.0, got {}", retry.backoff_multiplier),
        ));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(invalid(
            "retry.max_delay_ms",
            "must not be smaller than retry.initial_delay_ms",
        ));
    }

    for (name, formula) in config.grading.formulas.named() {
        validate_formula(name, formula)?;
    }

    let t = &config.grading.archetypes;
    let threshold_fields: &[(&str, f64)] = &[
        ("benchwarmer_max_avg_grade", t.benchwarmer_max_avg_grade),
        ("benchwarmer_max_minutes", t.benchwarmer_max_minutes),
        ("role_player_low", t.role_player_low),
        ("role_player_high", t.role_player_high),
        ("balanced_max_diff", t.balanced_max_diff),
        ("elite_min_score", t.elite_min_score),
        ("skewed_min_diff", t.skewed_min_diff),
        ("board_passer_max_third", t.board_passer_max_third),
        ("shooter_min_three_share", t.shooter_min_three_share),
        ("shooter_min_three_pct", t.shooter_min_three_pct),
        ("rim_finisher_min_dunks", t.rim_finisher_min_dunks),
        ("rim_finisher_min_paint_share", t.rim_finisher_min_paint_share),
        ("perimeter_steal_multiplier", t.perimeter_steal_multiplier),
        ("perimeter_opp_three_multiplier", t.perimeter_opp_three_multiplier),
        ("rim_protector_block_multiplier", t.rim_protector_block_multiplier),
        ("creator_secondary_ast_multiplier", t.creator_secondary_ast_multiplier),
    ];
    for (name, val) in threshold_fields {
        if !val.is_finite() {
            return Err(invalid(format!("archetypes.{name}"), format!("must be finite, got {val}")));
        }
    }
    if t.role_player_low > t.role_player_high {
        return Err(invalid(
            "archetypes.role_player_low",
            format!(
                "must not exceed role_player_high ({} > {})",
                t.role_player_low, t.role_player_high
            ),
        ));
    }

    Ok(())
}

fn validate_formula(name: &str, formula: &GradeFormula) -> Result<(), ConfigError> {
    if formula.terms.is_empty() {
        return Err(invalid(format!("grades.{name}.terms"), "must contain at least one term"));
    }
    if !(formula.spread > 0.0 && formula.spread.is_finite()) {
        return Err(invalid(
            format!("grades.{name}.spread"),
            format!("must be > 0, got {}", formula.spread),
        ));
    }
    for term in &formula.terms {
        if term.column.trim().is_empty() {
            return Err(invalid(format!("grades.{name}.terms"), "column must not be empty"));
        }
        if !term.weight.is_finite() {
            return Err(invalid(
                format!("grades.{name}.terms.{}", term.column),
                format!("weight must be finite, got {}", term.weight),
            ));
        }
    }
    let total: f64 = formula.terms.iter().map(|t| t.weight.abs()).sum();
    if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(invalid(
            format!("grades.{name}.terms"),
            format!("absolute weights must sum to 1.0, got {total:.6}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    const MINIMAL: &str = r#"
[season]
label = "2024-25"

[sources]
snapshot_dir = "data/snapshots/2024-25"

[database]
path = "test.db"
"#;

    #[test]
    fn load_shipped_defaults() {
        let tmp = std::env::temp_dir().join("courtside_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults").join(CONFIG_FILE),
            tmp.join("defaults").join(CONFIG_FILE),
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).expect("should copy default config");
        assert_eq!(copied, vec![tmp.join("config").join(CONFIG_FILE)]);

        let config = load_config_from(&tmp).expect("shipped defaults should load");
        assert_eq!(config.season.label, "2024-25");
        assert_eq!(config.sources.snapshot_dir, "data/snapshots/2024-25");
        assert_eq!(config.db_path, "courtside.db");
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.grading.formulas, GradeFormulas::default());
        assert_eq!(config.grading.archetypes, ArchetypeThresholds::default());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_second_run_keeps_edits() {
        let tmp = std::env::temp_dir().join("courtside_config_second_run");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), "default").unwrap();

        let first = ensure_config_files(&tmp).unwrap();
        assert_eq!(first, vec![tmp.join("config").join(CONFIG_FILE)]);
        assert_eq!(fs::read_to_string(&first[0]).unwrap(), "default");

        fs::write(&first[0], "edited").unwrap();
        let second = ensure_config_files(&tmp).unwrap();
        assert!(second.is_empty());
        assert_eq!(fs::read_to_string(&first[0]).unwrap(), "edited");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_does_not_overwrite() {
        let tmp = std::env::temp_dir().join("courtside_config_no_overwrite");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), "default").unwrap();
        fs::write(tmp.join("defaults").join("notes.toml.example"), "x").unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), "mine").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        assert_eq!(fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap(), "mine");
        assert!(!tmp.join("config").join("notes.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_and_config_is_error() {
        let tmp = std::env::temp_dir().join("courtside_config_empty");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_config_file_reports_path() {
        let tmp = std::env::temp_dir().join("courtside_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        match load_config_from(&tmp) {
            Err(ConfigError::FileNotFound { path }) => {
                assert!(path.ends_with(Path::new("config").join(CONFIG_FILE)));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn minimal_config_uses_builtin_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.db_path, "test.db");
        assert_eq!(config.grading.formulas, GradeFormulas::default());
        assert!((config.grading.formulas.defense.spread - 8.0).abs() < f64::EPSILON);
        assert!((config.retry.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_database_path_falls_back_to_data_dir() {
        let text = MINIMAL.replace("[database]\npath = \"test.db\"\n", "");
        let config = parse_config(&text).unwrap();
        assert!(config.db_path.ends_with("courtside.db"));
    }

    #[test]
    fn formula_override_replaces_only_that_grade() {
        let text = format!(
            "{MINIMAL}
[grades.rebounding]
spread = 9.0
terms = [
  {{ column = \"reb\", weight = 0.5 }},
  {{ column = \"oreb\", weight = 0.5 }},
]
"
        );
        let config = parse_config(&text).unwrap();
        let reb = &config.grading.formulas.rebounding;
        assert_eq!(reb.terms.len(), 2);
        assert!((reb.spread - 9.0).abs() < f64::EPSILON);
        assert_eq!(config.grading.formulas.scoring, GradeFormulas::default().scoring);
    }

    #[test]
    fn inverted_flag_parsed() {
        let text = format!(
            "{MINIMAL}
[grades.defense]
spread = 8.0
terms = [
  {{ column = \"blk\", weight = 0.5 }},
  {{ column = \"opp_fg_pct\", weight = 0.5, inverted = true }},
]
"
        );
        let config = parse_config(&text).unwrap();
        let terms = &config.grading.formulas.defense.terms;
        assert!(!terms[0].inverted);
        assert!(terms[1].inverted);
    }

    #[test]
    fn default_formulas_weights_sum_to_one() {
        for (name, formula) in GradeFormulas::default().named() {
            let total: f64 = formula.terms.iter().map(|t| t.weight.abs()).sum();
            assert!((total - 1.0).abs() < 1e-9, "{name} sums to {total}");
        }
    }

    #[test]
    fn negative_terms_present_where_expected() {
        let formulas = GradeFormulas::default();
        let tov = formulas.playmaking.terms.iter().find(|t| t.column == "tov").unwrap();
        assert!(tov.weight < 0.0);
        let pf = formulas.defense.terms.iter().find(|t| t.column == "pf").unwrap();
        assert!(pf.weight < 0.0);
        let opp = formulas.defense.terms.iter().find(|t| t.column == "opp_fg_pct").unwrap();
        assert!(opp.inverted && opp.weight > 0.0);
    }

    #[test]
    fn weights_not_summing_to_one_rejected() {
        let text = format!(
            "{MINIMAL}
[grades.scoring]
spread = 12.0
terms = [{{ column = \"pts\", weight = 0.7 }}]
"
        );
        match parse_config(&text) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "grades.scoring.terms");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn zero_spread_rejected() {
        let text = format!(
            "{MINIMAL}
[grades.scoring]
spread = 0.0
terms = [{{ column = \"pts\", weight = 1.0 }}]
"
        );
        assert!(matches!(
            parse_config(&text),
            Err(ConfigError::ValidationError { field, .. }) if field == "grades.scoring.spread"
        ));
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let text = format!("{MINIMAL}\n[retry]\nmax_attempts = 0\n");
        assert!(matches!(
            parse_config(&text),
            Err(ConfigError::ValidationError { field, .. }) if field == "retry.max_attempts"
        ));
    }

    #[test]
    fn inverted_role_band_rejected() {
        let text = format!("{MINIMAL}\n[archetypes]\nrole_player_low = 60.0\nrole_player_high = 50.0\n");
        assert!(matches!(
            parse_config(&text),
            Err(ConfigError::ValidationError { field, .. }) if field == "archetypes.role_player_low"
        ));
    }

    #[test]
    fn partial_archetype_section_keeps_other_defaults() {
        let text = format!("{MINIMAL}\n[archetypes]\nelite_min_score = 80.0\n");
        let config = parse_config(&text).unwrap();
        assert!((config.grading.archetypes.elite_min_score - 80.0).abs() < f64::EPSILON);
        assert!((config.grading.archetypes.skewed_min_diff - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            parse_config("[season\nlabel = "),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
