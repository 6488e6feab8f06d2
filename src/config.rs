use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_VERSION: &str = "2024-09-01";
pub const DEFAULT_SANDBOX_URL: &str = "https://sandbox-merchant.revolut.com";
pub const DEFAULT_LIVE_URL: &str = "https://merchant.revolut.com";
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub revolut: RevolutSettings,
    pub urls: UrlConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Merchant key pair and gateway knobs for one installation
#[derive(Clone, Deserialize)]
pub struct RevolutSettings {
    pub public_key: String,
    pub secret_key: String,
    pub api_version: String,
    pub sandbox_url: String,
    pub live_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl fmt::Debug for RevolutSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevolutSettings")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("sandbox_url", &self.sandbox_url)
            .field("live_url", &self.live_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl RevolutSettings {
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            sandbox_url: DEFAULT_SANDBOX_URL.to_string(),
            live_url: DEFAULT_LIVE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }

    /// Points both environments at `url` (local gateway stand-ins).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.sandbox_url = url.clone();
        self.live_url = url;
        self
    }

    /// Sandbox for orders placed in test mode, live otherwise
    pub fn base_api_url(&self, testmode: bool) -> &str {
        if testmode {
            &self.sandbox_url
        } else {
            &self.live_url
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_env() -> Result<Self> {
        let settings = Self {
            public_key: env::var("REVOLUT_PUBLIC_KEY").context("REVOLUT_PUBLIC_KEY not set")?,
            secret_key: env::var("REVOLUT_SECRET_KEY").context("REVOLUT_SECRET_KEY not set")?,
            api_version: env::var("REVOLUT_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            sandbox_url: env::var("REVOLUT_SANDBOX_URL")
                .unwrap_or_else(|_| DEFAULT_SANDBOX_URL.to_string()),
            live_url: env::var("REVOLUT_LIVE_URL")
                .unwrap_or_else(|_| DEFAULT_LIVE_URL.to_string()),
            timeout_secs: env::var("REVOLUT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("REVOLUT_TIMEOUT_SECS must be a valid number")?,
            max_retries: env::var("REVOLUT_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("REVOLUT_MAX_RETRIES must be a valid number")?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.public_key.trim().is_empty() {
            return Err(anyhow!("REVOLUT_PUBLIC_KEY cannot be empty"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(anyhow!("REVOLUT_SECRET_KEY cannot be empty"));
        }
        if !self.public_key.starts_with("pk_") {
            warn!("REVOLUT_PUBLIC_KEY does not have the pk_ prefix");
        }
        if !self.secret_key.starts_with("sk_") {
            warn!("REVOLUT_SECRET_KEY does not have the sk_ prefix");
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("REVOLUT_TIMEOUT_SECS must be greater than 0"));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(anyhow!(
                "REVOLUT_MAX_RETRIES must be at most {}",
                MAX_RETRIES_LIMIT
            ));
        }
        if self.sandbox_url.trim().is_empty() || self.live_url.trim().is_empty() {
            return Err(anyhow!("Revolut API URLs cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlConfig {
    /// Externally reachable base of this service, used in return URLs
    pub public_base_url: String,
    /// Base of the ticketing platform's order pages
    pub shop_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
        };

        let revolut = RevolutSettings::from_env()?;

        let urls = UrlConfig {
            public_base_url: env::var("PUBLIC_BASE_URL").context("PUBLIC_BASE_URL not set")?,
            shop_base_url: env::var("SHOP_BASE_URL").context("SHOP_BASE_URL not set")?,
        };

        let config = Config {
            server,
            database,
            revolut,
            urls,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.urls.public_base_url.trim().is_empty() {
            return Err(anyhow!("PUBLIC_BASE_URL cannot be empty"));
        }

        if self.urls.shop_base_url.trim().is_empty() {
            return Err(anyhow!("SHOP_BASE_URL cannot be empty"));
        }

        self.revolut.validate()
    }
}
