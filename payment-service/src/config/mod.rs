use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tron: TronConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Chain oracle (TronGrid) configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct TronConfig {
    /// Base URL of the TronGrid API, e.g. `https://api.trongrid.io`.
    pub api_base_url: String,
    /// Optional TronGrid API key, sent as `TRON-PRO-API-KEY`.
    pub api_key: Option<Secret<String>>,
    /// Platform wallet address that incoming USDT transfers must target.
    pub platform_address: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("PAYMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PAYMENT_SERVICE_PORT")
            .unwrap_or_else(|_| "3003".to_string())
            .parse()?;

        let db_url = env::var("PAYMENT_DATABASE_URL").expect("PAYMENT_DATABASE_URL must be set");
        let max_connections = env::var("PAYMENT_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("PAYMENT_DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let tron_api_base_url =
            env::var("TRON_API_BASE_URL").unwrap_or_else(|_| "https://api.trongrid.io".to_string());
        let tron_api_key = env::var("TRON_API_KEY").ok().map(Secret::new);
        let platform_address =
            env::var("TRON_PLATFORM_ADDRESS").expect("TRON_PLATFORM_ADDRESS must be set");

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            tron: TronConfig {
                api_base_url: tron_api_base_url,
                api_key: tron_api_key,
                platform_address,
            },
            service_name: "payment-service".to_string(),
        })
    }
}
