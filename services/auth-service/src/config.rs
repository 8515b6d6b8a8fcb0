//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The signing secret is loaded from JWT_SECRET or `[signing] secret_file`,
//! never stored in the TOML directly.

use auth_token::{KeyError, SIGNING_KEY_ENV, SigningKey};
use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    #[serde(default)]
    pub users: UsersConfig,
    #[serde(default)]
    pub signing: SigningConfig,
}

/// Public API listener
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Internal validation listener
#[derive(Debug, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_addr")]
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Session store back end and per-call deadline
#[derive(Debug, Deserialize)]
pub struct SessionStoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

/// User directory. No database URL means an in-memory directory.
#[derive(Debug, Default, Deserialize)]
pub struct UsersConfig {
    #[serde(default)]
    pub database_url: Option<Secret<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SigningConfig {
    /// Contents of `secret_file`, read during load unless JWT_SECRET is set.
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    /// Path to a file holding the signing secret (alternative to JWT_SECRET)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_rpc_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 50051))
}

fn default_max_connections() -> usize {
    1000
}

fn default_backend() -> StoreBackend {
    StoreBackend::Redis
}

fn default_store_timeout_ms() -> u64 {
    2000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_rpc_addr(),
        }
    }
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: None,
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Build configuration from defaults and environment variables only,
    /// for deployments that ship no config file.
    pub fn from_env_defaults() -> common::Result<Self> {
        Config::default().finish()
    }

    fn finish(mut self) -> common::Result<Self> {
        self.apply_env()?;
        self.validate()?;
        Ok(self)
    }

    /// Environment overrides:
    /// - REDIS_ADDR (host:port) selects the redis back end at `redis://{addr}`
    /// - DB_URL sets the Postgres user directory
    /// - AUTH_SERVICE_PORT / GRPC_AUTH_PORT replace the listener ports
    /// - JWT_SECRET takes precedence over `secret_file`, which is then not read
    fn apply_env(&mut self) -> common::Result<()> {
        if let Some(addr) = non_empty_env("REDIS_ADDR") {
            self.session_store.backend = StoreBackend::Redis;
            self.session_store.redis_url = Some(format!("redis://{addr}"));
        }

        if let Some(url) = non_empty_env("DB_URL") {
            self.users.database_url = Some(Secret::new(url));
        }

        if let Some(port) = non_empty_env("AUTH_SERVICE_PORT") {
            self.http.listen_addr.set_port(parse_port("AUTH_SERVICE_PORT", &port)?);
        }

        if let Some(port) = non_empty_env("GRPC_AUTH_PORT") {
            self.rpc.listen_addr.set_port(parse_port("GRPC_AUTH_PORT", &port)?);
        }

        if non_empty_env(SIGNING_KEY_ENV).is_some() {
            self.signing.secret = None;
        } else if let Some(ref secret_file) = self.signing.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                self.signing.secret = Some(Secret::new(secret));
            }
        }

        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if self.http.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.session_store.store_timeout_ms == 0 {
            return Err(common::Error::Config(
                "store_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.session_store.backend == StoreBackend::Redis {
            match self.session_store.redis_url.as_deref() {
                Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {}
                Some(url) => {
                    return Err(common::Error::Config(format!(
                        "redis_url must start with redis:// or rediss://, got: {url}"
                    )));
                }
                None => {
                    return Err(common::Error::Config(
                        "redis backend requires redis_url or REDIS_ADDR".into(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Build the signing key from JWT_SECRET, falling back to the
    /// `secret_file` contents. Neither present is `MissingSecret`.
    pub fn signing_key(&self) -> common::Result<SigningKey> {
        match SigningKey::from_env(SIGNING_KEY_ENV) {
            Ok(key) => Ok(key),
            Err(KeyError::Missing(_)) => {
                let secret = self.signing.secret.as_ref().ok_or_else(|| {
                    common::Error::MissingSecret(format!(
                        "set {SIGNING_KEY_ENV} or [signing] secret_file"
                    ))
                })?;
                SigningKey::new(secret.expose().as_bytes())
                    .map_err(|e| common::Error::Config(e.to_string()))
            }
            Err(e) => Err(common::Error::Config(e.to_string())),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("auth-service.toml")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_port(var: &str, value: &str) -> common::Result<u16> {
    value
        .parse()
        .map_err(|_| common::Error::Config(format!("{var} must be a port number, got: {value}")))
}
