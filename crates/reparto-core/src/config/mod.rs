//! Configuration system for reparto.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RepartoError, RepartoResult};

/// Persistence backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Durable relational store (SQLite).
    #[default]
    Sql,
    /// Transient in-process store, for environments without a database.
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> RepartoResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "sqlite" => Ok(Self::Sql),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(RepartoError::Configuration(format!(
                "unknown backend '{}', expected 'sql' or 'memory'",
                other
            ))),
        }
    }
}

/// Store configuration, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Which backend to run against.
    pub backend: StoreBackend,
    /// Database file path; only meaningful for the SQL backend. `:memory:`
    /// opens an ephemeral SQLite database.
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sql,
            database_path: PathBuf::from("data/reparto.db"),
        }
    }
}

impl StoreConfig {
    /// Read configuration from the environment.
    ///
    /// * `REPARTO_BACKEND` — `sql` (default) or `memory`.
    /// * `REPARTO_DB_PATH` — SQLite file path, default `data/reparto.db`.
    pub fn from_env() -> RepartoResult<Self> {
        let mut config = Self::default();
        if let Ok(backend) = std::env::var("REPARTO_BACKEND") {
            config.backend = StoreBackend::parse(&backend)?;
        }
        if let Ok(path) = std::env::var("REPARTO_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        Ok(config)
    }

    /// Configuration for the in-process backend.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// Configuration for the SQL backend at an explicit path.
    pub fn sql(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Sql,
            database_path: path.into(),
        }
    }
}
