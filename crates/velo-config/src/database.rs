//! Destination database configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "velo.duckdb".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the DuckDB database file.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
