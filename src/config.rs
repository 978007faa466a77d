use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
}

/// Settings for the external payment gateway: the "ready" endpoint we call
/// plus the public base URL the gateway redirects customers back to.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub cid: String,
    pub secret_key: String,
    pub public_base_url: String,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            gateway: GatewayConfig::from_env(),
        })
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://open-api.kakaopay.com".to_string());
        let cid = env::var("GATEWAY_CID").unwrap_or_else(|_| "TC0ONETIME".to_string());
        let secret_key = env::var("GATEWAY_SECRET_KEY").unwrap_or_default();
        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let timeout = env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));
        Self {
            base_url,
            cid,
            secret_key,
            public_base_url,
            timeout,
        }
    }
}
