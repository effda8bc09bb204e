use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::models::ResultShape;

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GOOGLE_API_KEY";

/// Main configuration structure for SCHEMA
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub books: BooksConfig,
    pub retail: RetailConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    /// host:port for the HTTP listener
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL up to and including the API version segment
    pub endpoint: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksConfig {
    pub endpoint: String,
    /// Google Books works unkeyed; a key only raises the quota.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailConfig {
    /// Search URL with a `{query}` placeholder for the encoded terms
    pub search_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub response_shape: ResultShape,
    /// Language the model writes analyses and tags in
    pub output_language: String,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("SCHEMA_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Config>(contents)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = var("SCHEMA_HTTP_BIND") {
            self.server.bind = bind;
        }

        // Gemini overrides
        if let Some(api_key) = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = var("SCHEMA_GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(endpoint) = var("SCHEMA_GEMINI_ENDPOINT") {
            self.gemini.endpoint = endpoint;
        }
        if let Some(temperature) = var("SCHEMA_GEMINI_TEMPERATURE") {
            match temperature.parse() {
                Ok(t) => self.gemini.temperature = Some(t),
                Err(_) => tracing::warn!(
                    "Ignoring SCHEMA_GEMINI_TEMPERATURE={}: not a number",
                    temperature
                ),
            }
        }

        // Books overrides
        if let Some(api_key) = var("GOOGLE_BOOKS_API_KEY") {
            self.books.api_key = Some(api_key);
        }
        if let Some(endpoint) = var("SCHEMA_BOOKS_ENDPOINT") {
            self.books.endpoint = endpoint;
        }

        if let Some(search_url) = var("SCHEMA_RETAIL_SEARCH_URL") {
            self.retail.search_url = search_url;
        }

        // Generation overrides
        if let Some(shape) = var("SCHEMA_RESPONSE_SHAPE") {
            match shape.parse() {
                Ok(s) => self.generation.response_shape = s,
                Err(e) => tracing::warn!("Ignoring SCHEMA_RESPONSE_SHAPE: {}", e),
            }
        }
        if let Some(language) = var("SCHEMA_OUTPUT_LANGUAGE") {
            self.generation.output_language = language;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.api_key == PLACEHOLDER_API_KEY || self.gemini.api_key.is_empty() {
            return Err("GOOGLE_API_KEY environment variable must be set".into());
        }

        if self.gemini.model.trim().is_empty() {
            return Err("gemini.model cannot be empty".into());
        }

        if let Some(t) = self.gemini.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err("gemini.temperature must be between 0.0 and 2.0".into());
            }
        }

        if !self.retail.search_url.contains("{query}") {
            return Err("retail.search_url must contain a {query} placeholder".into());
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("server.bind is not host:port: {}", self.server.bind).into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "schema".to_string(),
                bind: "127.0.0.1:3000".to_string(),
            },
            gemini: GeminiConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                model: "gemini-3-flash-preview".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                temperature: None,
            },
            books: BooksConfig {
                endpoint: "https://www.googleapis.com/books/v1/volumes".to_string(),
                api_key: None,
            },
            retail: RetailConfig {
                search_url: "https://www.amazon.co.jp/s?k={query}".to_string(),
            },
            generation: GenerationConfig {
                response_shape: ResultShape::Tagged,
                output_language: "Japanese".to_string(),
            },
        }
    }
}
