// Configuration loading: config/golden-boot.toml plus GOLDEN_BOOT_*
// environment overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/golden-boot.toml";
const DEV_JWT_SECRET: &str = "golden-boot-dev-secret";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("environment variable {name} has an invalid value `{value}`")]
    Env { name: String, value: String },

    #[error("validation error for field `{field}`: {message}")]
    Validation { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub turns: TurnConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/golden-boot.db".into(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Filesystem path of the database, if the URL points at a file.
    pub fn file_path(&self) -> Option<PathBuf> {
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    /// Token subject allowed to start drafts, open windows and import players.
    pub commissioner: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.into(),
            commissioner: "admin".into(),
        }
    }
}

impl AuthConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Turn length for a team with a live client.
    pub attended_turn_secs: u64,
    /// Turn length for a team nobody is watching.
    pub unattended_turn_secs: u64,
    /// How long a heartbeat keeps a team attended.
    pub presence_ttl_secs: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            attended_turn_secs: 30,
            unattended_turn_secs: 3,
            presence_ttl_secs: 20,
        }
    }
}

impl TurnConfig {
    pub fn attended_turn(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.attended_turn_secs as i64)
    }

    pub fn unattended_turn(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.unattended_turn_secs as i64)
    }

    pub fn presence_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.presence_ttl_secs as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl PollConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load from `GOLDEN_BOOT_CONFIG` (or the default path) and apply the
/// process environment on top.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = std::env::var("GOLDEN_BOOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = load_config_from(Path::new(&path))?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Parse the file at `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text, path)
}

pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_env<T: std::str::FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name: name.to_string(),
        value,
    })
}

/// Apply `GOLDEN_BOOT_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("GOLDEN_BOOT_BIND_ADDR") {
        config.server.bind_addr = v;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_DATABASE_URL") {
        config.database.url = v;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_MAX_CONNECTIONS") {
        config.database.max_connections = parse_env("GOLDEN_BOOT_MAX_CONNECTIONS", v)?;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_JWT_SECRET") {
        config.auth.jwt_secret = v;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_COMMISSIONER") {
        config.auth.commissioner = v;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_ATTENDED_TURN_SECS") {
        config.turns.attended_turn_secs = parse_env("GOLDEN_BOOT_ATTENDED_TURN_SECS", v)?;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_UNATTENDED_TURN_SECS") {
        config.turns.unattended_turn_secs = parse_env("GOLDEN_BOOT_UNATTENDED_TURN_SECS", v)?;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_PRESENCE_TTL_SECS") {
        config.turns.presence_ttl_secs = parse_env("GOLDEN_BOOT_PRESENCE_TTL_SECS", v)?;
    }
    if let Some(v) = lookup("GOLDEN_BOOT_POLL_INTERVAL_SECS") {
        config.poll.interval_secs = parse_env("GOLDEN_BOOT_POLL_INTERVAL_SECS", v)?;
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(invalid("auth.jwt_secret", "must not be empty"));
        }
        if self.auth.commissioner.is_empty() {
            return Err(invalid("auth.commissioner", "must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be at least 1"));
        }
        if self.turns.attended_turn_secs == 0 {
            return Err(invalid("turns.attended_turn_secs", "must be at least 1"));
        }
        if self.turns.unattended_turn_secs == 0 {
            return Err(invalid("turns.unattended_turn_secs", "must be at least 1"));
        }
        if self.turns.unattended_turn_secs > self.turns.attended_turn_secs {
            return Err(invalid(
                "turns.unattended_turn_secs",
                "must not exceed turns.attended_turn_secs",
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(invalid("poll.interval_secs", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("", Path::new("inline.toml")).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.turns.attended_turn_secs, 30);
        assert_eq!(config.turns.unattended_turn_secs, 3);
        assert_eq!(config.poll.interval_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [turns]
            attended_turn_secs = 20

            [auth]
            jwt_secret = "s3cret"
        "#;
        let config = parse_config(text, Path::new("inline.toml")).unwrap();
        assert_eq!(config.turns.attended_turn_secs, 20);
        assert_eq!(config.turns.presence_ttl_secs, 20);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.commissioner, "admin");
        assert!(!config.auth.uses_dev_secret());
    }

    #[test]
    fn shipped_config_file_parses() {
        let text = include_str!("../config/golden-boot.toml");
        let config = parse_config(text, Path::new("config/golden-boot.toml")).unwrap();
        assert!(config.auth.uses_dev_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = parse_config("[turns\nattended = ", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config_from(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("GOLDEN_BOOT_DATABASE_URL", "sqlite::memory:"),
            ("GOLDEN_BOOT_UNATTENDED_TURN_SECS", "5"),
            ("GOLDEN_BOOT_POLL_INTERVAL_SECS", " 7 "),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.file_path(), None);
        assert_eq!(config.turns.unattended_turn_secs, 5);
        assert_eq!(config.poll.interval_secs, 7);
    }

    #[test]
    fn bad_numbers_in_the_environment_are_rejected() {
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == "GOLDEN_BOOT_ATTENDED_TURN_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn validation_rejects_inverted_turn_lengths() {
        let mut config = Config::default();
        config.turns.unattended_turn_secs = 60;
        let err = config.validate().unwrap_err();
        match err {
            ConfigError::Validation { field, .. } => assert_eq!(field, "turns.unattended_turn_secs"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn database_file_path_strips_the_scheme() {
        let config = DatabaseConfig::default();
        assert_eq!(config.file_path(), Some(PathBuf::from("./data/golden-boot.db")));
    }
}
