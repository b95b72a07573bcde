use crate::core::{BridgeError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sqlite: Option<SqliteConfig>,
}

/// The four connection settings.
///
/// For the SQLite backend `database` is a file path (or `:memory:`);
/// `host`, `user` and `password` are accepted so the same file can describe a
/// networked server, but are not used when opening a SQLite session.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Session options, normally filled from the `[sqlite]` table.
    #[serde(skip)]
    pub sqlite: SqliteConfig,
}

// Hand-written so the password never reaches logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("sqlite", &self.sqlite)
            .finish()
    }
}

/// SQLite session pragmas applied at connect time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqliteConfig {
    pub foreign_keys: Option<bool>,
    pub journal_mode: Option<String>,
    pub busy_timeout_ms: Option<u32>,
}

impl DatabaseConfig {
    /// Configuration for a SQLite database file (or `:memory:`).
    pub fn sqlite<P: AsRef<Path>>(path: P) -> Self {
        DatabaseConfig {
            host: None,
            user: None,
            password: None,
            database: path.as_ref().to_string_lossy().into_owned(),
            sqlite: SqliteConfig::default(),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == ":memory:"
    }
}

impl Config {
    /// Parses configuration from TOML text.
    ///
    /// The optional `[sqlite]` table is copied into `database.sqlite` so the
    /// connection provider only needs the `DatabaseConfig`.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))?;
        if config.database.database.trim().is_empty() {
            return Err(BridgeError::Config(
                "database.database must name a database".to_string(),
            ));
        }
        if let Some(sqlite) = &config.sqlite {
            config.database.sqlite = sqlite.clone();
        }
        Ok(config)
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = rowbridge::config::load_config("rowbridge.toml").expect("Failed to load config");
/// println!("{:?}", config.database);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}
