use crate::error::ArticleVecError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// articlevec application configuration
///
/// Built once per command invocation and passed explicitly to every
/// component that needs datastore credentials or model names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL host
    pub pg_host: String,

    /// PostgreSQL port
    pub pg_port: u16,

    /// PostgreSQL database name
    pub pg_db: String,

    /// PostgreSQL user
    pub pg_user: String,

    /// PostgreSQL password
    #[serde(skip_serializing)]
    pub pg_password: String,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embed_model: String,

    /// LLM summarization model name
    pub llm_model: String,

    /// Width of the stored embedding column
    pub embed_dim: usize,

    /// Attempts per embedding request (1 = no retry)
    pub embed_max_retries: u32,

    /// CSV imported by the default pipeline
    pub articles_csv: PathBuf,

    /// Cap on rows embedded by the default pipeline
    pub auto_embed_limit: Option<usize>,

    /// Log level
    pub log_level: String,

    /// Log directory (console only when unset)
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pg_host: "127.0.0.1".to_string(),
            pg_port: 5432,
            pg_db: "precise_articles".to_string(),
            pg_user: "postgres".to_string(),
            pg_password: String::new(),
            ollama_base_url: "http://localhost:11434".to_string(),
            embed_model: "all-minilm:l12-v2".to_string(),
            llm_model: "llama3.1".to_string(),
            embed_dim: 384,
            embed_max_retries: 1,
            articles_csv: PathBuf::from("data/InputData_IndustryEconomics_Jul24-Jun25.csv"),
            auto_embed_limit: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ArticleVecError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();
        let config = Self {
            pg_host: std::env::var("PG_HOST").unwrap_or(defaults.pg_host),
            pg_port: Self::get_env_parsed("PG_PORT")?.unwrap_or(defaults.pg_port),
            pg_db: std::env::var("PG_DB").unwrap_or(defaults.pg_db),
            pg_user: std::env::var("PG_USER").unwrap_or(defaults.pg_user),
            pg_password: std::env::var("PG_PASSWORD").unwrap_or(defaults.pg_password),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
            embed_model: std::env::var("EMBED_MODEL").unwrap_or(defaults.embed_model),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            embed_dim: Self::get_env_parsed("EMBED_DIM")?.unwrap_or(defaults.embed_dim),
            embed_max_retries: Self::get_env_parsed("EMBED_MAX_RETRIES")?
                .unwrap_or(defaults.embed_max_retries),
            articles_csv: std::env::var("ARTICLES_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.articles_csv),
            // An unparsable cap means "no cap" rather than a startup failure
            auto_embed_limit: std::env::var("AUTO_EMBED_LIMIT")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: std::env::var("LOG_DIR").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse an optional numeric environment variable
    fn get_env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ArticleVecError> {
        match std::env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ArticleVecError::config(format!("{} is not a valid number: {}", key, raw))),
            Err(_) => Ok(None),
        }
    }

    /// libpq-style connection string for the configured database
    pub fn connection_string(&self) -> String {
        self.connection_string_for(&self.pg_db)
    }

    /// Connection string targeting another database on the same server
    pub fn connection_string_for(&self, db: &str) -> String {
        let mut conn = format!(
            "host={} port={} dbname={} user={} connect_timeout=5",
            self.pg_host, self.pg_port, db, self.pg_user
        );
        if !self.pg_password.is_empty() {
            conn.push_str(&format!(" password='{}'", self.pg_password.replace('\\', "\\\\").replace('\'', "\\'")));
        }
        conn
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ArticleVecError> {
        if self.embed_model.trim().is_empty() {
            return Err(ArticleVecError::config("Embedding model name cannot be empty"));
        }

        if self.llm_model.trim().is_empty() {
            return Err(ArticleVecError::config("LLM model name cannot be empty"));
        }

        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://") {
            return Err(ArticleVecError::config(
                "Ollama base URL must start with http:// or https://"
            ));
        }

        if self.pg_port == 0 {
            return Err(ArticleVecError::config("PostgreSQL port cannot be 0"));
        }

        if self.embed_dim == 0 {
            return Err(ArticleVecError::config("Embedding dimension must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pg_port, 5432);
        assert_eq!(config.embed_dim, 384);
        assert_eq!(config.embed_model, "all-minilm:l12-v2");
        assert!(config.auto_embed_limit.is_none());
    }

    #[test]
    fn test_connection_string() {
        let config = AppConfig::default();
        assert_eq!(
            config.connection_string(),
            "host=127.0.0.1 port=5432 dbname=precise_articles user=postgres connect_timeout=5"
        );

        let mut with_password = AppConfig::default();
        with_password.pg_password = "s3cret".to_string();
        assert!(with_password
            .connection_string_for("postgres")
            .ends_with("dbname=postgres user=postgres connect_timeout=5 password='s3cret'"));
    }

    #[test]
    fn test_connection_string_escapes_password() {
        let mut config = AppConfig::default();
        config.pg_password = r"a\b'c".to_string();
        assert!(config.connection_string().ends_with(r"password='a\\b\'c'"));
    }

    #[test]
    fn test_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = AppConfig::default();
        invalid_config.embed_model = String::new();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.ollama_base_url = "localhost:11434".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = AppConfig::default();
        invalid_config.embed_dim = 0;
        assert!(invalid_config.validate().is_err());
    }
}
