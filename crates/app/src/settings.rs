//! Settings for the application, read from `settings.toml` and overridden by
//! `SKILLSWAP__*` environment variables (e.g. `SKILLSWAP__LEDGER__STARTING_GRANT=10`).
use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "skillswap", about = "Skill exchange token ledger")]
struct Cli {
    /// Path to the settings file, without or with the `.toml` extension.
    #[arg(long, env = "SKILLSWAP_CONFIG", default_value = "settings")]
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub starting_grant: i64,
    pub completion_amount: i64,
    pub op_timeout_ms: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            starting_grant: engine::DEFAULT_STARTING_GRANT,
            completion_amount: engine::DEFAULT_COMPLETION_AMOUNT,
            op_timeout_ms: engine::DEFAULT_OP_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let cli = Cli::parse();
        Self::from_path(&cli.config.to_string_lossy())
    }

    fn from_path(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SKILLSWAP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::from_path("does-not-exist").unwrap();
        assert_eq!(settings.app.level, "info");
        assert!(settings.server.is_none());
        assert_eq!(settings.ledger.starting_grant, 5);
        assert_eq!(settings.ledger.completion_amount, 1);
        assert_eq!(settings.ledger.op_timeout_ms, 5000);
    }

    #[test]
    fn reads_server_and_ledger_sections() {
        let raw = r#"
            [app]
            level = "debug"

            [server]
            port = 3000
            database = { sqlite = "skillswap.db" }

            [ledger]
            completion_amount = 2
        "#;
        let settings: Settings = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.app.level, "debug");
        let server = settings.server.unwrap();
        assert_eq!(server.port, 3000);
        assert!(matches!(server.database, Database::Sqlite(ref path) if path == "skillswap.db"));
        assert_eq!(settings.ledger.completion_amount, 2);
        assert_eq!(settings.ledger.starting_grant, 5);
    }
}
