//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `PLANNING_CENTRAL_WAREHOUSE` - Warehouse code of the distribution center (default: CD)
//! - `PLANNING_SALES_DOCUMENT_PREFIX` - Invoice prefix of store sales documents (default: 39-)
//! - `PLANNING_EDIT_POLICY` - `replace_only` or `replace_or_insert` (default: `replace_only`)
//! - `PLANNING_DEFAULT_STORE_PRIORITY` - Comma separated store codes used when a
//!   request carries no priority
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use stockplan_core::replenishment::{EditMergePolicy, StorePriority};
use stockplan_core::types::StoreCode;
use thiserror::Error;

const DEFAULT_CENTRAL_WAREHOUSE: &str = "CD";
const DEFAULT_SALES_DOCUMENT_PREFIX: &str = "39-";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Planning behavior
    pub planning: PlanningConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Settings that shape how plans are computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningConfig {
    /// Warehouse whose stock is allocated to stores.
    pub central_warehouse: StoreCode,
    /// Sales documents that count as store sales start with this prefix.
    pub sales_document_prefix: String,
    /// How client segment edits for unknown SKUs are handled.
    pub edit_policy: EditMergePolicy,
    /// Used when a planning request leaves `storePriority` empty.
    pub default_store_priority: StorePriority,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            central_warehouse: StoreCode::from(DEFAULT_CENTRAL_WAREHOUSE),
            sales_document_prefix: DEFAULT_SALES_DOCUMENT_PREFIX.to_string(),
            edit_policy: EditMergePolicy::default(),
            default_store_priority: StorePriority::default(),
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let cert_pem = vars("ADMIN_TLS_CERT");
        let key_pem = vars("ADMIN_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl PlanningConfig {
    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let central_warehouse = vars("PLANNING_CENTRAL_WAREHOUSE")
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .map_or(defaults.central_warehouse, StoreCode::from);

        let sales_document_prefix = vars("PLANNING_SALES_DOCUMENT_PREFIX")
            .unwrap_or(defaults.sales_document_prefix);

        let edit_policy = match vars("PLANNING_EDIT_POLICY") {
            Some(raw) => raw.trim().parse::<EditMergePolicy>().map_err(|e| {
                ConfigError::InvalidEnvVar("PLANNING_EDIT_POLICY".to_string(), e)
            })?,
            None => defaults.edit_policy,
        };

        let default_store_priority = vars("PLANNING_DEFAULT_STORE_PRIORITY")
            .map_or(defaults.default_store_priority, |raw| {
                parse_store_list(&raw)
            });

        Ok(Self {
            central_warehouse,
            sales_document_prefix,
            edit_policy,
            default_store_priority,
        })
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // DATABASE_URL is what Fly.io postgres attach sets
        let database_url = vars("ADMIN_DATABASE_URL")
            .or_else(|| vars("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_DATABASE_URL".to_string()))?;

        let host = vars("ADMIN_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;

        let port = vars("ADMIN_PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let planning = PlanningConfig::from_vars(&vars)?;

        let sentry_dsn = vars("SENTRY_DSN");
        let sentry_environment = vars("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = vars("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        let tls = TlsConfig::from_vars(&vars)?;

        Ok(Self {
            database_url,
            host,
            port,
            planning,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse a comma separated store list, ignoring blanks.
fn parse_store_list(raw: &str) -> StorePriority {
    StorePriority::new(
        raw.split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty()),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AdminConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AdminConfig::from_vars(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("ADMIN_DATABASE_URL", "postgres://localhost/stockplan")]).unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.planning, PlanningConfig::default());
        assert_eq!(config.planning.central_warehouse.as_str(), "CD");
        assert_eq!(config.planning.sales_document_prefix, "39-");
        assert!(config.tls.is_none());
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "ADMIN_DATABASE_URL"));
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fly/stockplan")]).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fly/stockplan");
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("ADMIN_DATABASE_URL", "postgres://localhost/stockplan"),
            ("ADMIN_PORT", "not-a-port"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ADMIN_PORT"));
    }

    #[test]
    fn test_planning_overrides() {
        let config = load(&[
            ("ADMIN_DATABASE_URL", "postgres://localhost/stockplan"),
            ("PLANNING_CENTRAL_WAREHOUSE", "DC2"),
            ("PLANNING_EDIT_POLICY", "replace_or_insert"),
            ("PLANNING_DEFAULT_STORE_PRIORITY", "LASCONDES, COSTANERA,,LASCONDES"),
        ])
        .unwrap();

        assert_eq!(config.planning.central_warehouse.as_str(), "DC2");
        assert_eq!(config.planning.edit_policy, EditMergePolicy::ReplaceOrInsert);
        assert_eq!(
            config.planning.default_store_priority.joined(),
            "LASCONDES,COSTANERA"
        );
    }

    #[test]
    fn test_invalid_edit_policy() {
        let err = load(&[
            ("ADMIN_DATABASE_URL", "postgres://localhost/stockplan"),
            ("PLANNING_EDIT_POLICY", "sum"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "PLANNING_EDIT_POLICY"));
    }

    #[test]
    fn test_tls_requires_both_parts() {
        let err = load(&[
            ("ADMIN_DATABASE_URL", "postgres://localhost/stockplan"),
            ("ADMIN_TLS_CERT", "-----BEGIN CERTIFICATE-----"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }
}
