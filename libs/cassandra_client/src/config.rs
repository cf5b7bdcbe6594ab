use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::common::ClientError;
use crate::types::{ConsistencyLevel, ConsistencyLevels};

/// Default Thrift port of a Cassandra node
pub const DEFAULT_PORT: u16 = 9160;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Helper to load an environment variable or return an error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Helper to load and parse an optional environment variable
pub fn env_parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Where and how to reach a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    /// Framed (true) or buffered (false) Thrift transport
    pub framed_transport: bool,
    /// Connection timeout in seconds, enforced by the transport
    pub connect_timeout_secs: u64,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            framed_transport: true,
            connect_timeout_secs: 10,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = ClientError;

    /// Parse a `"host:port"` pair. A missing port means 9160.
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let address = address.trim();
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| ClientError::InvalidAddress(format!("{}: {}", address, e)))?;
                (host, port)
            }
            None => (address, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(ClientError::InvalidAddress(format!(
                "{}: missing host",
                address
            )));
        }

        Ok(Self::new(host, port))
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client connection configuration
///
/// # Example
///
/// ```
/// use cassandra_client::{ClientConfig, ConsistencyLevel, Credentials};
///
/// let config = ClientConfig::from_address("localhost:9160")
///     .unwrap()
///     .with_keyspace("node_cassandra_test")
///     .with_credentials(Credentials::new("root", "thrift"))
///     .with_read_consistency(ConsistencyLevel::One);
///
/// assert_eq!(config.address.port, 9160);
/// assert_eq!(config.keyspace(), Some("node_cassandra_test"));
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub address: ServerAddress,

    /// Keyspace to resolve during connect
    pub keyspace: Option<String>,

    /// Optional credentials for `login`
    pub credentials: Option<Credentials>,

    /// Initial default consistency levels
    pub consistency: ConsistencyLevels,
}

impl ClientConfig {
    pub fn new(address: ServerAddress) -> Self {
        Self {
            address,
            keyspace: None,
            credentials: None,
            consistency: ConsistencyLevels::default(),
        }
    }

    /// Build a config from a `"host:port"` string
    pub fn from_address(address: &str) -> Result<Self, ClientError> {
        Ok(Self::new(address.parse()?))
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_framed_transport(mut self, framed: bool) -> Self {
        self.address.framed_transport = framed;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.address.connect_timeout_secs = secs;
        self
    }

    pub fn with_consistency_levels(mut self, levels: ConsistencyLevels) -> Self {
        self.consistency = levels;
        self
    }

    pub fn with_read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency.read = level;
        self
    }

    pub fn with_write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency.write = level;
        self
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(ServerAddress::new("127.0.0.1", DEFAULT_PORT))
    }
}

/// Load ClientConfig from environment variables
///
/// Environment variables:
/// - `CASSANDRA_ADDRESS` (required) - "host:port" of the node
/// - `CASSANDRA_KEYSPACE` (optional) - Keyspace to resolve on connect
/// - `CASSANDRA_USERNAME` / `CASSANDRA_PASSWORD` (optional) - Login credentials,
///   used only when both are set
/// - `CASSANDRA_FRAMED_TRANSPORT` (optional, default: true)
/// - `CASSANDRA_CONNECT_TIMEOUT_SECS` (optional, default: 10)
/// - `CASSANDRA_READ_CONSISTENCY` (optional, default: QUORUM)
/// - `CASSANDRA_WRITE_CONSISTENCY` (optional, default: QUORUM)
impl FromEnv for ClientConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_address = env_required("CASSANDRA_ADDRESS")?;
        let address: ServerAddress =
            raw_address.parse().map_err(|e: ClientError| ConfigError::ParseError {
                key: "CASSANDRA_ADDRESS".to_string(),
                details: e.to_string(),
            })?;

        let mut config = ClientConfig::new(address)
            .with_framed_transport(env_parse_or("CASSANDRA_FRAMED_TRANSPORT", true)?)
            .with_connect_timeout(env_parse_or("CASSANDRA_CONNECT_TIMEOUT_SECS", 10)?)
            .with_read_consistency(env_parse_or(
                "CASSANDRA_READ_CONSISTENCY",
                ConsistencyLevel::Quorum,
            )?)
            .with_write_consistency(env_parse_or(
                "CASSANDRA_WRITE_CONSISTENCY",
                ConsistencyLevel::Quorum,
            )?);

        config.keyspace = env::var("CASSANDRA_KEYSPACE").ok();

        if let (Ok(username), Ok(password)) = (
            env::var("CASSANDRA_USERNAME"),
            env::var("CASSANDRA_PASSWORD"),
        ) {
            config.credentials = Some(Credentials::new(username, password));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let address: ServerAddress = "localhost:9160".parse().unwrap();
        assert_eq!(address.host, "localhost");
        assert_eq!(address.port, 9160);
        assert_eq!(address.to_string(), "localhost:9160");
    }

    #[test]
    fn test_parse_missing_port_uses_default() {
        let address: ServerAddress = "10.0.0.5".parse().unwrap();
        assert_eq!(address.port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_invalid_port() {
        let result = "localhost:thrift".parse::<ServerAddress>();
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));

        let result = ":9160".parse::<ServerAddress>();
        assert!(matches!(result, Err(ClientError::InvalidAddress(_))));
    }

    #[test]
    fn test_client_config_builder_pattern() {
        let config = ClientConfig::from_address("127.0.0.1:9161")
            .unwrap()
            .with_keyspace("metrics")
            .with_credentials(Credentials::new("user", "pass"))
            .with_framed_transport(false)
            .with_write_consistency(ConsistencyLevel::All);

        assert_eq!(config.keyspace(), Some("metrics"));
        assert_eq!(config.credentials, Some(Credentials::new("user", "pass")));
        assert!(!config.address.framed_transport);
        assert_eq!(config.consistency.read, ConsistencyLevel::Quorum);
        assert_eq!(config.consistency.write, ConsistencyLevel::All);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("root", "secret"));
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.address.to_string(), "127.0.0.1:9160");
        assert!(config.keyspace.is_none());
        assert!(config.credentials.is_none());
        assert_eq!(config.consistency, ConsistencyLevels::default());
    }

    #[test]
    fn test_client_config_from_env() {
        temp_env::with_vars(
            [
                ("CASSANDRA_ADDRESS", Some("db.internal:9170")),
                ("CASSANDRA_KEYSPACE", Some("testkeyspace")),
                ("CASSANDRA_USERNAME", Some("root")),
                ("CASSANDRA_PASSWORD", Some("thrift")),
                ("CASSANDRA_READ_CONSISTENCY", Some("one")),
                ("CASSANDRA_WRITE_CONSISTENCY", None),
                ("CASSANDRA_FRAMED_TRANSPORT", Some("false")),
                ("CASSANDRA_CONNECT_TIMEOUT_SECS", None),
            ],
            || {
                let config = ClientConfig::from_env().unwrap();
                assert_eq!(config.address.host, "db.internal");
                assert_eq!(config.address.port, 9170);
                assert!(!config.address.framed_transport);
                assert_eq!(config.address.connect_timeout_secs, 10);
                assert_eq!(config.keyspace(), Some("testkeyspace"));
                assert_eq!(config.credentials, Some(Credentials::new("root", "thrift")));
                assert_eq!(config.consistency.read, ConsistencyLevel::One);
                assert_eq!(config.consistency.write, ConsistencyLevel::Quorum);
            },
        );
    }

    #[test]
    fn test_client_config_from_env_missing() {
        temp_env::with_vars([("CASSANDRA_ADDRESS", None::<&str>)], || {
            let err = ClientConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("CASSANDRA_ADDRESS"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_client_config_from_env_bad_level() {
        temp_env::with_vars(
            [
                ("CASSANDRA_ADDRESS", Some("localhost:9160")),
                ("CASSANDRA_READ_CONSISTENCY", Some("most")),
            ],
            || {
                let result = ClientConfig::from_env();
                assert!(matches!(
                    result,
                    Err(ConfigError::ParseError { ref key, .. }) if key == "CASSANDRA_READ_CONSISTENCY"
                ));
            },
        );
    }
}
