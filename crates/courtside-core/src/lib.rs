// Shared infrastructure for the grade pipeline: configuration and the
// SQLite grade store.

pub mod config;
pub mod db;
