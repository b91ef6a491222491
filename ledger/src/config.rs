//! Configuration management for the ledger server.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::aggregates::RegistryPolicy;
use crate::types::{Address, MAX_TICKETS_PER_EVENT};

/// Why the configuration was refused.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{name} has invalid value {value:?}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// The ledger account is not a valid address.
    #[error("LEDGER_ADDRESS is not a valid address: {0}")]
    LedgerAddress(String),

    /// The ticket cap is outside `1..=10000`.
    #[error("MAX_TICKETS_PER_EVENT must be between 1 and {MAX_TICKETS_PER_EVENT}, got {0}")]
    TicketCap(u64),

    /// The bind address cannot be formed.
    #[error("invalid bind address {0}")]
    BindAddress(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application server configuration
    pub server: ServerConfig,
    /// Ledger policy configuration
    pub ledger: LedgerConfig,
    /// Where committed facts are stored
    pub journal: JournalConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The ledger's own account, manager and reserve of ticket assets
    pub address: String,
    /// Largest ticket supply per event
    pub max_tickets_per_event: u64,
    /// Ticket asset ids start after this value
    pub asset_id_base: u64,
    /// URL recorded on ticket assets
    pub asset_url: String,
    /// Unit name of ticket assets
    pub unit_name: String,
}

/// Journal configuration
///
/// With `DATABASE_URL` set the ledger journals to `PostgreSQL`; otherwise it
/// appends to the file at `JOURNAL_PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// `PostgreSQL` connection URL
    pub database_url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Journal file used when no database is configured
    pub path: String,
}

/// The journal backend a [`JournalConfig`] selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalBackend {
    /// One table row per fact
    Postgres {
        /// Connection URL
        url: String,
        /// Pool size
        max_connections: u32,
    },
    /// Append-only file
    File(PathBuf),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable is set but does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8080)?,
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: parsed("METRICS_PORT", 9090)?,
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT", 30)?,
            },
            ledger: LedgerConfig {
                address: env::var("LEDGER_ADDRESS")
                    .unwrap_or_else(|_| "CLUBTICKETLEDGER".to_string()),
                max_tickets_per_event: parsed("MAX_TICKETS_PER_EVENT", MAX_TICKETS_PER_EVENT)?,
                asset_id_base: parsed("ASSET_ID_BASE", 1000)?,
                asset_url: env::var("TICKET_ASSET_URL")
                    .unwrap_or_else(|_| "https://campus-tix.algo".to_string()),
                unit_name: env::var("TICKET_UNIT_NAME").unwrap_or_else(|_| "TKT".to_string()),
            },
            journal: JournalConfig {
                database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                path: env::var("JOURNAL_PATH")
                    .unwrap_or_else(|_| "data/clubticket.journal".to_string()),
            },
        })
    }

    /// Check values that parse but make no sense.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LedgerAddress`] or [`ConfigError::TicketCap`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.policy().map(|_| ())
    }

    /// Address the HTTP API binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BindAddress`] if host and port do not form one.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.server.host, self.server.port)
    }

    /// Address the Prometheus exporter binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BindAddress`] if host and port do not form one.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.server.metrics_host, self.server.metrics_port)
    }
}

impl ServerConfig {
    /// Graceful shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl LedgerConfig {
    /// The registry policy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LedgerAddress`] for an invalid account, or
    /// [`ConfigError::TicketCap`] for a cap of 0 or above the hard ceiling.
    pub fn policy(&self) -> Result<RegistryPolicy, ConfigError> {
        let address =
            Address::parse(&self.address).map_err(|e| ConfigError::LedgerAddress(e.to_string()))?;

        if self.max_tickets_per_event == 0 || self.max_tickets_per_event > MAX_TICKETS_PER_EVENT {
            return Err(ConfigError::TicketCap(self.max_tickets_per_event));
        }

        let mut policy = RegistryPolicy::new(address);
        policy.max_tickets_per_event = self.max_tickets_per_event;
        policy.asset_id_base = self.asset_id_base;
        policy.asset_url.clone_from(&self.asset_url);
        policy.unit_name.clone_from(&self.unit_name);
        Ok(policy)
    }
}

impl JournalConfig {
    /// The backend these settings select.
    #[must_use]
    pub fn backend(&self) -> JournalBackend {
        match &self.database_url {
            Some(url) => JournalBackend::Postgres {
                url: url.clone(),
                max_connections: self.max_connections,
            },
            None => JournalBackend::File(PathBuf::from(&self.path)),
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let raw = format!("{host}:{port}");
    raw.parse().map_err(|_| ConfigError::BindAddress(raw))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ledger_config() -> LedgerConfig {
        LedgerConfig {
            address: "CLUBTICKETLEDGER".to_string(),
            max_tickets_per_event: 500,
            asset_id_base: 5000,
            asset_url: "https://tickets.example".to_string(),
            unit_name: "PASS".to_string(),
        }
    }

    #[test]
    fn policy_carries_every_setting() {
        let policy = ledger_config().policy().unwrap();

        assert_eq!(policy.ledger_address.as_str(), "CLUBTICKETLEDGER");
        assert_eq!(policy.max_tickets_per_event, 500);
        assert_eq!(policy.asset_id_base, 5000);
        assert_eq!(policy.unit_name, "PASS");
        assert_eq!(policy.asset_url, "https://tickets.example");
    }

    #[test]
    fn ticket_cap_must_stay_within_ceiling() {
        let mut config = ledger_config();

        config.max_tickets_per_event = 0;
        assert!(matches!(config.policy(), Err(ConfigError::TicketCap(0))));

        config.max_tickets_per_event = MAX_TICKETS_PER_EVENT + 1;
        assert!(matches!(config.policy(), Err(ConfigError::TicketCap(_))));
    }

    #[test]
    fn malformed_ledger_address_is_refused() {
        let mut config = ledger_config();
        config.address = "not an address".to_string();

        assert!(matches!(config.policy(), Err(ConfigError::LedgerAddress(_))));
    }

    #[test]
    fn database_url_selects_postgres_over_the_file() {
        let mut journal = JournalConfig {
            database_url: None,
            max_connections: 4,
            path: "var/ledger.journal".to_string(),
        };
        assert_eq!(
            journal.backend(),
            JournalBackend::File(PathBuf::from("var/ledger.journal"))
        );

        journal.database_url = Some("postgres://localhost/clubticket".to_string());
        assert_eq!(
            journal.backend(),
            JournalBackend::Postgres {
                url: "postgres://localhost/clubticket".to_string(),
                max_connections: 4,
            }
        );
    }

    #[test]
    fn bind_addresses_are_formed_from_host_and_port() {
        assert_eq!(
            socket_addr("127.0.0.1", 8080).unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(socket_addr("not a host", 8080).is_err());
    }
}
