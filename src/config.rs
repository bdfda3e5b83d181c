//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: every setting comes from an `ETH_CRAWLER_`
//! prefixed environment variable, optionally provided through `.env`
//! files loaded with `dotenvy`. `ETH_CRAWLER_ENV_STATE` selects the
//! environment (`dev` or `prod`), which picks the matching
//! `.env.development` / `.env.production` file and the defaults that
//! differ between the two.
//!
//! The loaded [`AppConfig`] is a plain value. It is passed to whatever
//! needs it; there is no process-wide current configuration.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Prefix shared by every configuration key.
pub const ENV_PREFIX: &str = "ETH_CRAWLER_";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A key was set to a value that could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Fully prefixed key.
        key: String,
        /// Raw value found.
        value: String,
    },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvState {
    /// Development (default).
    #[default]
    Dev,
    /// Production.
    Prod,
}

impl EnvState {
    /// Parses an environment name. Anything but `prod` means `dev`.
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(name) if name.eq_ignore_ascii_case("prod") => Self::Prod,
            _ => Self::Dev,
        }
    }

    /// Name of the environment-specific dotenv file.
    #[must_use]
    pub const fn env_file(self) -> &'static str {
        match self {
            Self::Dev => ".env.development",
            Self::Prod => ".env.production",
        }
    }

    /// Returns the short name (`dev` / `prod`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for EnvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the HTTP server is hosted, which decides the lifecycle listeners
/// that get registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerType {
    /// The service owns the whole server lifecycle.
    #[default]
    BuiltIn,
    /// Startup and teardown are driven by an external process manager
    /// (`external`, or `uvicorn` in older deployments); only the inner
    /// lifecycle hooks are observed.
    External,
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "built_in" | "builtin" => Ok(Self::BuiltIn),
            "external" | "uvicorn" => Ok(Self::External),
            other => Err(other.to_string()),
        }
    }
}

/// Cassandra connection settings. Carried for the storage layer; nothing
/// in this crate connects to the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database name.
    pub name: Option<String>,
    /// User name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Keyspace.
    pub keyspace: Option<String>,
    /// Contact host.
    pub host: Option<String>,
}

/// Infura credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfuraConfig {
    /// Project identifier.
    pub project_id: Option<String>,
    /// Project secret.
    pub project_secret: Option<String>,
    /// WebSocket endpoint.
    pub ws_url: Option<String>,
}

/// Kafka producer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KafkaProducerConfig {
    /// Bootstrap server addresses.
    pub bootstrap_servers: Vec<String>,
    /// Topics to publish to.
    pub topics: Vec<String>,
}

/// Kafka consumer settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KafkaConsumerConfig {
    /// Bootstrap server addresses.
    pub bootstrap_servers: Vec<String>,
    /// Topics to subscribe to.
    pub topics: Vec<String>,
    /// Consumer group.
    pub group: Option<String>,
}

/// A contract call: 4-byte selector plus ABI argument types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractCall {
    /// Hex selector without the `0x` prefix.
    pub selector: &'static str,
    /// ABI types of the arguments.
    pub arg_types: &'static [&'static str],
}

/// Fixed parameters of the balance-scanner contract. Not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthScannerConfig {
    /// Scanner contract address.
    pub contract_address: &'static str,
    /// Addresses per batched call.
    pub batch_size: usize,
    /// `tokenBalances(address[],address)`.
    pub token_balances: ContractCall,
    /// `etherBalances(address[])`.
    pub ether_balances: ContractCall,
    /// `tokensBalance(address,address[])`.
    pub tokens_balance: ContractCall,
    /// ERC-20 `balanceOf(address)`.
    pub balance_of: ContractCall,
}

/// Scanner contract parameters.
pub const ETH_SCANNER: EthScannerConfig = EthScannerConfig {
    contract_address: "0x08A8fDBddc160A7d5b957256b903dCAb1aE512C5",
    batch_size: 1000,
    token_balances: ContractCall {
        selector: "aad33091",
        arg_types: &["address[]", "address"],
    },
    ether_balances: ContractCall {
        selector: "dbdbb51b",
        arg_types: &["address[]"],
    },
    tokens_balance: ContractCall {
        selector: "e5da1b68",
        arg_types: &["address", "address[]"],
    },
    balance_of: ContractCall {
        selector: "70a08231",
        arg_types: &["address"],
    },
};

/// Top-level service configuration.
///
/// Loaded once at startup via [`AppConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Selected environment.
    pub env_state: EnvState,
    /// Interface to bind to.
    pub host: IpAddr,
    /// Port to bind to.
    pub port: u16,
    /// Verbose logging. Defaults to `true` in dev, `false` in prod.
    pub debug: bool,
    /// Number of tokio worker threads.
    pub workers: usize,
    /// Whether to log every HTTP request.
    pub access_log: bool,
    /// Free-form lifespan mode passed through to the hosting process.
    pub lifespan: Option<String>,
    /// Hosting mode.
    pub server_type: ServerType,
    /// Cassandra settings.
    pub database: DatabaseConfig,
    /// Infura settings.
    pub infura: InfuraConfig,
    /// Kafka producer settings.
    pub kafka_producer: KafkaProducerConfig,
    /// Kafka consumer settings.
    pub kafka_consumer: KafkaConsumerConfig,
    /// Scanner contract parameters.
    pub eth_scanner: EthScannerConfig,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Loads `.env`, then the environment-specific dotenv file. Variables
    /// already set in the process win over both files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set key cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_overrides(&HashMap::new())
    }

    /// Same as [`AppConfig::from_env`], but values in `overrides` (keyed
    /// by the unprefixed name, e.g. `APP_PORT`) take precedence over the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set key cannot be parsed.
    pub fn from_env_with_overrides(
        overrides: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env_state = EnvState::from_name(
            overrides
                .get("ENV_STATE")
                .cloned()
                .or_else(|| std::env::var(format!("{ENV_PREFIX}ENV_STATE")).ok())
                .as_deref(),
        );
        dotenvy::from_filename(env_state.env_file()).ok();

        Self::from_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
        })
    }

    /// Builds the configuration from an arbitrary source. `lookup` is
    /// called with unprefixed keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set key cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };
        let env_state = EnvState::from_name(source.string("ENV_STATE").as_deref());

        Ok(Self {
            env_state,
            host: source.parse("APP_HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: source.parse("APP_PORT", 8000)?,
            debug: source.boolean("APP_DEBUG", env_state == EnvState::Dev)?,
            workers: source.parse("APP_WORKERS", 1)?,
            access_log: source.boolean("ACCESS_LOG", false)?,
            lifespan: source.string("APP_LIFESPAN"),
            server_type: source.parse("SERVER_TYPE", ServerType::default())?,
            database: DatabaseConfig {
                name: source.string("CASSANDRA_NAME"),
                user: source.string("CASSANDRA_USER"),
                password: source.string("CASSANDRA_PASSWORD"),
                keyspace: source.string("CASSANDRA_KEYSPACE"),
                host: source.string("CASSANDRA_HOST"),
            },
            infura: InfuraConfig {
                project_id: source.string("INFURA_PROJECT_ID"),
                project_secret: source.string("INFURA_PROJECT_SECRET"),
                ws_url: source.string("INFURA_WS_URL"),
            },
            kafka_producer: KafkaProducerConfig {
                bootstrap_servers: source.list("KAFKA_PRODUCER_BOOTSTRAP_SERVERS"),
                topics: source.list("KAFKA_PRODUCER_TOPICS"),
            },
            kafka_consumer: KafkaConsumerConfig {
                bootstrap_servers: source.list("KAFKA_CONSUMER_BOOTSTRAP_SERVERS"),
                topics: source.list("KAFKA_CONSUMER_TOPICS"),
                group: source.string("KAFKA_CONSUMER_GROUP"),
            },
            eth_scanner: ETH_SCANNER,
        })
    }

    /// Socket address to bind the HTTP server to.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env_state: EnvState::Dev,
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            debug: true,
            workers: 1,
            access_log: false,
            lifespan: None,
            server_type: ServerType::default(),
            database: DatabaseConfig::default(),
            infura: InfuraConfig::default(),
            kafka_producer: KafkaProducerConfig::default(),
            kafka_consumer: KafkaConsumerConfig::default(),
            eth_scanner: ETH_SCANNER,
        }
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Returns the trimmed value of `key`, treating empty values as unset.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.string(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| invalid(key, value)),
        }
    }

    /// Accepts `true`/`false`/`1`/`0`/`yes`/`no` (case-insensitive).
    fn boolean(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.string(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(invalid(key, value)),
            },
        }
    }

    /// Comma-separated list; blank items are dropped.
    fn list(&self, key: &str) -> Vec<String> {
        self.string(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn invalid(key: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{key}"),
        value,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let Ok(config) = load(&[]) else {
            panic!("empty source should load");
        };
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.listen_addr(), SocketAddr::from(([0, 0, 0, 0], 8000)));
    }

    #[test]
    fn prod_turns_debug_off_by_default() {
        let Ok(config) = load(&[("ENV_STATE", "prod")]) else {
            panic!("prod config should load");
        };
        assert_eq!(config.env_state, EnvState::Prod);
        assert!(!config.debug);
    }

    #[test]
    fn unknown_env_state_falls_back_to_dev() {
        let Ok(config) = load(&[("ENV_STATE", "staging")]) else {
            panic!("config should load");
        };
        assert_eq!(config.env_state, EnvState::Dev);
        assert!(config.debug);
    }

    #[test]
    fn explicit_values_are_parsed() {
        let Ok(config) = load(&[
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "9100"),
            ("APP_DEBUG", "false"),
            ("APP_WORKERS", "4"),
            ("ACCESS_LOG", "yes"),
            ("SERVER_TYPE", "external"),
            ("CASSANDRA_KEYSPACE", "faces"),
            ("KAFKA_CONSUMER_TOPICS", "blocks, txs,,"),
            ("KAFKA_CONSUMER_GROUP", "crawler"),
        ]) else {
            panic!("config should load");
        };
        assert_eq!(config.listen_addr(), SocketAddr::from(([127, 0, 0, 1], 9100)));
        assert!(!config.debug);
        assert_eq!(config.workers, 4);
        assert!(config.access_log);
        assert_eq!(config.server_type, ServerType::External);
        assert_eq!(config.database.keyspace.as_deref(), Some("faces"));
        assert_eq!(config.kafka_consumer.topics, vec!["blocks", "txs"]);
        assert_eq!(config.kafka_consumer.group.as_deref(), Some("crawler"));
        assert!(config.kafka_producer.topics.is_empty());
    }

    #[test]
    fn invalid_port_is_reported_with_prefixed_key() {
        let result = load(&[("APP_PORT", "eighty")]);
        let Err(ConfigError::InvalidValue { key, value }) = result else {
            panic!("expected invalid value error");
        };
        assert_eq!(key, "ETH_CRAWLER_APP_PORT");
        assert_eq!(value, "eighty");
    }

    #[test]
    fn invalid_bool_and_server_type_are_rejected() {
        assert!(load(&[("ACCESS_LOG", "maybe")]).is_err());
        assert!(load(&[("SERVER_TYPE", "uwsgi")]).is_err());
    }

    #[test]
    fn uvicorn_selects_external_server() {
        let Ok(config) = load(&[("SERVER_TYPE", "uvicorn")]) else {
            panic!("uvicorn server type should load");
        };
        assert_eq!(config.server_type, ServerType::External);
        assert_eq!("UVICORN".parse::<ServerType>(), Ok(ServerType::External));
        assert_eq!("built_in".parse::<ServerType>(), Ok(ServerType::BuiltIn));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let Ok(config) = load(&[("APP_PORT", "  "), ("INFURA_WS_URL", "")]) else {
            panic!("config should load");
        };
        assert_eq!(config.port, 8000);
        assert_eq!(config.infura.ws_url, None);
    }

    #[test]
    fn scanner_constants_are_fixed() {
        let config = AppConfig::default();
        assert_eq!(config.eth_scanner.batch_size, 1000);
        assert_eq!(config.eth_scanner.balance_of.selector, "70a08231");
        assert_eq!(config.eth_scanner.tokens_balance.arg_types, ["address", "address[]"]);
    }

    #[test]
    fn env_file_per_state() {
        assert_eq!(EnvState::Dev.env_file(), ".env.development");
        assert_eq!(EnvState::Prod.env_file(), ".env.production");
        assert_eq!(EnvState::from_name(Some("PROD")), EnvState::Prod);
        assert_eq!(EnvState::from_name(None), EnvState::Dev);
    }
}
