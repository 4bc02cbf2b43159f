//! # Storefront Configuration
//!
//! Process-level knobs. Pricing options (rates, modes, hide lists) are not
//! here: they live in the `settings` table and reach the engine through the
//! catalog snapshot.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`MAPLE_*`)
//! 2. Config file (`storefront.toml`, explicit path or platform config dir)
//! 3. Defaults (this file)
//!
//! ## Example `storefront.toml`
//! ```toml
//! bind_address = "0.0.0.0:8080"
//! database_path = "/var/lib/maple/maple.db"
//! site_url = "https://www.vapeshop.ca"
//! secure_cookies = true
//! purchase_guard = "everywhere"
//! cart_idle_secs = 86400
//!
//! [ttl]
//! cart_price_secs = 120
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use maple_core::context::{CacheTtls, EngineOptions};
use maple_core::jurisdiction::CookiePolicy;
use maple_core::visibility::PurchaseGuardScope;

/// Storefront process configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Address the HTTP server binds to.
    /// Default: "127.0.0.1:8080"
    pub bind_address: String,

    /// SQLite database file.
    pub database_path: PathBuf,

    /// Public site URL; its host derives the province cookie domain.
    pub site_url: String,

    /// Explicit cookie domain, overriding the one derived from `site_url`.
    pub cookie_domain: Option<String>,

    /// Mark cookies `Secure`.
    pub secure_cookies: bool,

    /// Log failures caught by the cart recompute guard.
    pub diagnostics: bool,

    /// Seconds between catalog snapshot reloads.
    /// Default: 60
    pub refresh_interval_secs: u64,

    /// Seconds a cart may go untouched before it is dropped.
    /// Default: 172800 (48 hours)
    pub cart_idle_secs: i64,

    /// Where add-to-cart is rejected for hidden products.
    pub purchase_guard: PurchaseGuardScope,

    pub ttl: TtlConfig,
}

/// Shared-cache lifetimes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub taxonomy_secs: i64,
    pub catalog_price_secs: i64,
    pub cart_price_secs: i64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        TtlConfig {
            taxonomy_secs: 3600,
            catalog_price_secs: 3600,
            cart_price_secs: 300,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        StorefrontConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            database_path: default_database_path(),
            site_url: "http://localhost:8080".to_string(),
            cookie_domain: None,
            secure_cookies: false,
            diagnostics: false,
            refresh_interval_secs: 60,
            cart_idle_secs: crate::state::DEFAULT_CART_IDLE_HOURS * 3600,
            purchase_guard: PurchaseGuardScope::default(),
            ttl: TtlConfig::default(),
        }
    }
}

impl StorefrontConfig {
    /// Loads the file (if any), then applies `MAPLE_*` overrides.
    ///
    /// With no explicit path, `storefront.toml` in the platform config
    /// directory is used when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.map(Path::to_path_buf).or_else(default_config_file);

        let mut config = match file {
            Some(file) if file.exists() => {
                let text = std::fs::read_to_string(&file)
                    .map_err(|e| ConfigError::Read(file.display().to_string(), e.to_string()))?;
                Self::from_toml(&text)?
            }
            Some(file) if path.is_some() => {
                return Err(ConfigError::Read(
                    file.display().to_string(),
                    "file not found".to_string(),
                ))
            }
            _ => StorefrontConfig::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Applies overrides from a variable lookup (the environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MAPLE_BIND") {
            self.bind_address = v;
        }
        if let Some(v) = lookup("MAPLE_DB_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAPLE_SITE_URL") {
            self.site_url = v;
        }
        if let Some(v) = lookup("MAPLE_COOKIE_DOMAIN") {
            self.cookie_domain = Some(v).filter(|d| !d.trim().is_empty());
        }
        if let Some(v) = lookup("MAPLE_SECURE_COOKIES") {
            self.secure_cookies = parse_flag("MAPLE_SECURE_COOKIES", &v)?;
        }
        if let Some(v) = lookup("MAPLE_DIAGNOSTICS") {
            self.diagnostics = parse_flag("MAPLE_DIAGNOSTICS", &v)?;
        }
        if let Some(v) = lookup("MAPLE_REFRESH_SECS") {
            self.refresh_interval_secs = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAPLE_REFRESH_SECS".to_string()))?;
        }
        if let Some(v) = lookup("MAPLE_CART_IDLE_SECS") {
            self.cart_idle_secs = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAPLE_CART_IDLE_SECS".to_string()))?;
        }
        if let Some(v) = lookup("MAPLE_PURCHASE_GUARD") {
            self.purchase_guard = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("MAPLE_PURCHASE_GUARD".to_string()))?;
        }
        Ok(())
    }

    /// Checks values that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site_host()?;
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("refresh_interval_secs".to_string()));
        }
        if self.cart_idle_secs <= 0 {
            return Err(ConfigError::InvalidValue("cart_idle_secs".to_string()));
        }
        let ttl = self.ttl;
        if ttl.taxonomy_secs <= 0 || ttl.catalog_price_secs <= 0 || ttl.cart_price_secs <= 0 {
            return Err(ConfigError::InvalidValue("ttl".to_string()));
        }
        Ok(())
    }

    /// Host part of `site_url`.
    pub fn site_host(&self) -> Result<String, ConfigError> {
        let url = Url::parse(&self.site_url)
            .map_err(|_| ConfigError::InvalidValue("site_url".to_string()))?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| ConfigError::InvalidValue("site_url".to_string()))
    }

    /// Attributes for the province cookie.
    pub fn cookie_policy(&self) -> Result<CookiePolicy, ConfigError> {
        Ok(CookiePolicy::for_site(
            &self.site_host()?,
            self.cookie_domain.as_deref(),
            self.secure_cookies,
        ))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            ttls: CacheTtls {
                taxonomy: Duration::seconds(self.ttl.taxonomy_secs),
                catalog_price: Duration::seconds(self.ttl.catalog_price_secs),
                cart_price: Duration::seconds(self.ttl.cart_price_secs),
            },
            diagnostics: self.diagnostics,
            purchase_guard: self.purchase_guard,
        }
    }

    pub fn cart_idle(&self) -> Duration {
        Duration::seconds(self.cart_idle_secs)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name.to_string())),
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ca", "maple", "storefront")
}

fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("storefront.toml"))
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("maple.db"))
        .unwrap_or_else(|| PathBuf::from("maple.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not read {0}: {1}")]
    Read(String, String),

    #[error("Invalid config file: {0}")]
    Parse(String),
}
