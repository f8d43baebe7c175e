//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SOLANA_RPC_URL` - ledger JSON-RPC endpoint
//! - `STORE_WALLET` - wallet receiving customer payments
//! - `METADATA_STORAGE_URL` - NFT metadata storage service
//! - `MINTER_URL` - NFT minting service
//!
//! ## Optional
//! - `HOST` / `PORT` - bind address (default: 0.0.0.0:5001)
//! - `PUBLIC_BASE_URL` - storefront URL used in NFT image links (default: http://localhost:3000)
//! - `MINTER_API_KEY` - bearer token for the minting service
//! - `ADMIN_WALLETS` - comma separated wallets with admin rights
//! - `DB_POOL_SIZE` (10), `HTTP_TIMEOUT_SECS` (10)
//! - `CONFIRM_MAX_ATTEMPTS` (6), `CONFIRM_INITIAL_DELAY_MS` (500), `CONFIRM_MAX_DELAY_MS` (8000)
//! - `UPLOAD_MAX_ATTEMPTS` (4), `UPLOAD_INITIAL_DELAY_MS` (250), `UPLOAD_MAX_DELAY_MS` (4000)
//! - `CHALLENGE_TTL_SECS` (300), `SESSION_TTL_SECS` (86400)
//! - `TRACK_INVENTORY` (false)
//! - `LOG_FORMAT` - `json` for JSON lines, anything else for human readable output

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::services::retry::RetryPolicy;
use crate::wallet::WalletAddress;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    pub rewards: RewardsConfig,
    pub payments: PaymentsConfig,
    pub auth: AuthConfig,
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Contains the password.
    pub url: SecretString,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub store_wallet: WalletAddress,
    /// Per-request timeout for every outbound HTTP call.
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RewardsConfig {
    pub storage_url: String,
    pub minter_url: String,
    pub minter_api_key: Option<SecretString>,
    pub public_base_url: String,
    pub upload_retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub confirm_retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub challenge_ttl: Duration,
    pub session_ttl: Duration,
    pub admin_wallets: Vec<WalletAddress>,
}

#[derive(Debug, Clone, Default)]
pub struct OrdersConfig {
    pub track_inventory: bool,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first variable that is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        Ok(Self {
            server: ServerConfig {
                host: env.parse_or("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
                port: env.parse_or("PORT", 5001)?,
            },
            database: DatabaseConfig {
                url: SecretString::from(env.required("DATABASE_URL")?),
                pool_size: env.parse_or("DB_POOL_SIZE", 10)?,
            },
            chain: ChainConfig {
                rpc_url: env.required("SOLANA_RPC_URL")?,
                store_wallet: env.parse_required("STORE_WALLET")?,
                http_timeout: Duration::from_secs(env.parse_or("HTTP_TIMEOUT_SECS", 10)?),
            },
            rewards: RewardsConfig {
                storage_url: env.required("METADATA_STORAGE_URL")?,
                minter_url: env.required("MINTER_URL")?,
                minter_api_key: env.optional("MINTER_API_KEY").map(SecretString::from),
                public_base_url: env
                    .optional("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                upload_retry: env.retry_policy("UPLOAD", 4, 250, 4_000)?,
            },
            payments: PaymentsConfig {
                confirm_retry: env.retry_policy("CONFIRM", 6, 500, 8_000)?,
            },
            auth: AuthConfig {
                challenge_ttl: Duration::from_secs(env.parse_or("CHALLENGE_TTL_SECS", 300)?),
                session_ttl: Duration::from_secs(env.parse_or("SESSION_TTL_SECS", 86_400)?),
                admin_wallets: env.wallet_list("ADMIN_WALLETS")?,
            },
            orders: OrdersConfig {
                track_inventory: env.parse_or("TRACK_INVENTORY", false)?,
            },
        })
    }
}

fn invalid<E: Display>(key: &str) -> impl Fn(E) -> ConfigError + '_ {
    move |err| ConfigError::InvalidEnvVar(key.to_string(), err.to_string())
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Unset and blank values are treated the same.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.required(key)?.parse().map_err(invalid(key))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(value) => value.parse().map_err(invalid(key)),
            None => Ok(default),
        }
    }

    fn wallet_list(&self, key: &str) -> Result<Vec<WalletAddress>, ConfigError> {
        self.optional(key)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|wallet| !wallet.is_empty())
            .map(|wallet| wallet.parse().map_err(invalid(key)))
            .collect()
    }

    fn retry_policy(
        &self,
        prefix: &str,
        attempts: u32,
        initial_ms: u64,
        max_ms: u64,
    ) -> Result<RetryPolicy, ConfigError> {
        let max_attempts_key = format!("{prefix}_MAX_ATTEMPTS");
        let max_attempts: u32 = self.parse_or(&max_attempts_key, attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                max_attempts_key,
                "must be at least 1".to_string(),
            ));
        }

        Ok(RetryPolicy::new(
            max_attempts,
            Duration::from_millis(self.parse_or(&format!("{prefix}_INITIAL_DELAY_MS"), initial_ms)?),
            Duration::from_millis(self.parse_or(&format!("{prefix}_MAX_DELAY_MS"), max_ms)?),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    const STORE: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://lemon:pw@localhost/lemonade".to_string()),
            ("SOLANA_RPC_URL", "https://api.devnet.solana.com".to_string()),
            ("STORE_WALLET", STORE.to_string()),
            ("METADATA_STORAGE_URL", "http://storage.local".to_string()),
            ("MINTER_URL", "http://minter.local".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn applies_defaults() {
        let config = load(&base()).unwrap();

        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:5001");
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(
            config.database.url.expose_secret(),
            "postgres://lemon:pw@localhost/lemonade"
        );
        assert_eq!(config.chain.store_wallet.as_str(), STORE);
        assert_eq!(config.chain.http_timeout, Duration::from_secs(10));
        assert_eq!(config.rewards.public_base_url, "http://localhost:3000");
        assert!(config.rewards.minter_api_key.is_none());
        assert_eq!(config.payments.confirm_retry.max_attempts, 6);
        assert_eq!(
            config.rewards.upload_retry.initial_delay,
            Duration::from_millis(250)
        );
        assert_eq!(config.auth.session_ttl, Duration::from_secs(86_400));
        assert!(config.auth.admin_wallets.is_empty());
        assert!(!config.orders.track_inventory);
    }

    #[test]
    fn reads_overrides() {
        let mut vars = base();
        vars.insert("PORT", "8080".into());
        vars.insert("ADMIN_WALLETS", format!(" {STORE} , ,{STORE}"));
        vars.insert("TRACK_INVENTORY", "true".into());
        vars.insert("PUBLIC_BASE_URL", "https://joeys.example/".into());
        vars.insert("CONFIRM_MAX_ATTEMPTS", "2".into());

        let config = load(&vars).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.admin_wallets.len(), 2);
        assert!(config.orders.track_inventory);
        assert_eq!(config.rewards.public_base_url, "https://joeys.example");
        assert_eq!(config.payments.confirm_retry.max_attempts, 2);
    }

    #[test]
    fn names_the_missing_variable() {
        let mut vars = base();
        vars.remove("MINTER_URL");

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "MINTER_URL"));
    }

    #[test]
    fn names_the_invalid_variable() {
        let mut vars = base();
        vars.insert("STORE_WALLET", "not-a-wallet".into());
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(ref key, _) if key == "STORE_WALLET"
        ));

        let mut vars = base();
        vars.insert("UPLOAD_MAX_ATTEMPTS", "0".into());
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::InvalidEnvVar(ref key, _) if key == "UPLOAD_MAX_ATTEMPTS"
        ));
    }
}
