//! Project configuration file support for insightloop.
//!
//! Loads configuration from `insightloop.toml` in the working directory.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use insightloop_core::{TranscriptGateway, DEFAULT_DECISION_TIMEOUT};
use insightloop_db::{BridgeConfig, BridgeGateway, Database, MockGateway, SqliteGateway};
use insightloop_oracle::{
    CommandOracle, DecisionOracle, ExtractionOracle, GeminiConfig, GeminiOracle, OracleKind,
    OutlineOracle,
};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "insightloop.toml";

const DEFAULT_API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Project-level configuration loaded from `insightloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// `[oracle]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OracleConfig {
    /// `gemini`, `command` or `offline`
    pub backend: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Bound on each interview decision
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Binary for the command backend
    pub command: Option<PathBuf>,
    pub args: Option<Vec<String>>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            backend: OracleKind::Gemini.to_string(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeout: DEFAULT_DECISION_TIMEOUT,
            command: None,
            args: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    Sqlite,
    Bridge,
    Mock,
}

/// `[persistence]` section
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PersistenceConfig {
    pub mode: PersistenceMode,
    /// SQLite file for the `sqlite` mode
    pub database: Option<PathBuf>,
    /// Relay URL for the `bridge` mode
    pub endpoint: Option<String>,
    pub table: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    /// Environment variable holding the relay's database password
    pub password_env: Option<String>,
    /// Database name on the relay's server
    pub schema: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mode: PersistenceMode::Sqlite,
            database: None,
            endpoint: None,
            table: None,
            host: None,
            user: None,
            password_env: None,
            schema: None,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}

impl OracleConfig {
    pub fn kind(&self) -> Result<OracleKind> {
        self.backend
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
    }

    pub fn decision_oracle(&self, kind: OracleKind) -> Result<Arc<dyn DecisionOracle>> {
        Ok(match kind {
            OracleKind::Gemini => Arc::new(self.gemini()?),
            OracleKind::Command => Arc::new(self.command()),
            OracleKind::Offline => Arc::new(OutlineOracle::new()),
        })
    }

    pub fn extraction_oracle(&self, kind: OracleKind) -> Result<Box<dyn ExtractionOracle>> {
        Ok(match kind {
            OracleKind::Gemini => Box::new(self.gemini()?),
            OracleKind::Command => Box::new(self.command()),
            OracleKind::Offline => Box::new(OutlineOracle::new()),
        })
    }

    fn gemini(&self) -> Result<GeminiOracle> {
        let vars: Vec<&str> = match self.api_key_env.as_deref() {
            Some(var) => vec![var],
            None => DEFAULT_API_KEY_VARS.to_vec(),
        };

        let mut config = GeminiConfig::from_env(&vars)?;
        if let Some(ref model) = self.model {
            config = config.with_model(model.clone());
        }
        if let Some(ref base_url) = self.base_url {
            config = config.with_base_url(base_url.clone());
        }

        GeminiOracle::new(config).context("Failed to create Gemini oracle")
    }

    fn command(&self) -> CommandOracle {
        let mut oracle = CommandOracle::new();
        if let Some(ref command) = self.command {
            oracle = oracle.with_binary_path(command.clone());
        }
        if let Some(ref args) = self.args {
            oracle = oracle.with_args(args.clone());
        }
        if let Some(ref model) = self.model {
            oracle = oracle.with_model(model.clone());
        }
        oracle
    }
}

impl PersistenceConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(Database::default_path)
    }

    pub fn open_database(&self) -> Result<Database> {
        let path = self.database_path();
        Database::open_at(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))
    }

    pub fn bridge_gateway(&self) -> Result<BridgeGateway> {
        let Some(ref endpoint) = self.endpoint else {
            bail!("Bridge persistence needs `endpoint` in [persistence]");
        };

        let mut config = BridgeConfig::new(endpoint.clone());
        if let Some(ref table) = self.table {
            config = config.with_table(table.clone());
        }
        if let Some(ref host) = self.host {
            config = config.with_host(host.clone());
        }
        if let Some(ref user) = self.user {
            config = config.with_user(user.clone());
        }
        if let Some(ref schema) = self.schema {
            config = config.with_database(schema.clone());
        }
        if let Some(ref var) = self.password_env {
            let password = std::env::var(var)
                .with_context(|| format!("Relay password variable {} is not set", var))?;
            config = config.with_password(SecretString::from(password));
        }

        BridgeGateway::new(config).context("Failed to create bridge gateway")
    }

    pub fn gateway(&self, mode: PersistenceMode) -> Result<Arc<dyn TranscriptGateway>> {
        Ok(match mode {
            PersistenceMode::Sqlite => Arc::new(SqliteGateway::new(Arc::new(self.open_database()?))),
            PersistenceMode::Bridge => Arc::new(self.bridge_gateway()?),
            PersistenceMode::Mock => {
                let mut gateway = MockGateway::new();
                if let Some(ref table) = self.table {
                    gateway = gateway.with_table(table.clone());
                }
                Arc::new(gateway)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[oracle]
backend = "command"
command = "/usr/local/bin/claude"
args = ["--print"]
timeout = "5s"

[persistence]
mode = "bridge"
endpoint = "http://localhost:3001/api/save"
table = "responses"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.oracle.kind().unwrap(), OracleKind::Command);
        assert_eq!(config.oracle.timeout, Duration::from_secs(5));
        assert_eq!(config.persistence.mode, PersistenceMode::Bridge);
        assert_eq!(config.persistence.table.as_deref(), Some("responses"));
        assert!(config.persistence.bridge_gateway().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::default();
        assert_eq!(config.oracle.kind().unwrap(), OracleKind::Gemini);
        assert_eq!(config.oracle.timeout, DEFAULT_DECISION_TIMEOUT);
        assert_eq!(config.persistence.mode, PersistenceMode::Sqlite);
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[oracle]\nbackend = \"offline\"\nretries = 3\n",
        )
        .unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_bridge_without_endpoint_is_error() {
        let config = PersistenceConfig {
            mode: PersistenceMode::Bridge,
            ..Default::default()
        };
        assert!(config.bridge_gateway().is_err());
    }

    #[test]
    fn test_unknown_backend_is_error() {
        let config = OracleConfig {
            backend: "oracle-of-delphi".to_string(),
            ..Default::default()
        };
        assert!(config.kind().is_err());
    }

    #[test]
    fn test_offline_oracle_needs_no_key() {
        let config = OracleConfig::default();
        assert!(config.decision_oracle(OracleKind::Offline).is_ok());
        assert!(config.extraction_oracle(OracleKind::Offline).is_ok());
    }
}
