use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Comma separated list of allowed origins.
    pub cors_origins: String,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Override file values with `PORT`, `CORS_ORIGIN` and `DATABASE_PATH`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        if let Some(origins) = lookup("CORS_ORIGIN") {
            self.server.cors_origins = origins;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = path;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> AppConfig {
        let contents = std::fs::read_to_string("config/default.toml")
            .expect("config/default.toml should exist");
        toml::from_str(&contents).expect("should parse")
    }

    #[test]
    fn test_parse_default_config() {
        let config = default_config();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "data/cma.db");
        assert_eq!(config.monitoring.log_level, "info");
        assert_eq!(config.server.origins(), vec!["http://localhost:5173"]);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = default_config();
        config
            .apply_overrides(|key| match key {
                "PORT" => Some("8080".to_string()),
                "CORS_ORIGIN" => Some("http://a.test, http://b.test".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.origins(), vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.database.path, "data/cma.db");
    }

    #[test]
    fn test_invalid_port_override_fails() {
        let mut config = default_config();
        let result = config.apply_overrides(|key| (key == "PORT").then(|| "abc".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_database_url() {
        let db = DatabaseConfig {
            path: "test.db".to_string(),
        };
        assert_eq!(db.url(), "sqlite:test.db");
    }
}
