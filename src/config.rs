use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let gateway_key_id = env::var("GATEWAY_KEY_ID").context("GATEWAY_KEY_ID is not set")?;
        let gateway_key_secret =
            env::var("GATEWAY_KEY_SECRET").context("GATEWAY_KEY_SECRET is not set")?;
        let gateway_endpoint =
            env::var("GATEWAY_ENDPOINT").unwrap_or_else(|_| "https://api.razorpay.com".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            gateway_key_id,
            gateway_key_secret,
            gateway_endpoint,
        })
    }
}
