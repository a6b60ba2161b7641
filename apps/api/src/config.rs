use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown store backend '{other}' (expected mongo or memory)")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jobs_collection: String,
    pub customers_collection: String,
    /// Whether job creation rejects bodies without an `industry` object.
    pub require_industry: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            store_backend: env_or("STORE_BACKEND", "mongo")
                .parse()
                .context("STORE_BACKEND is invalid")?,
            mongodb_uri: env_or("MONGODB_URI", "mongodb://localhost:27017"),
            database_name: env_or("DATABASE_NAME", "careerhub"),
            jobs_collection: env_or("JOBS_COLLECTION", "jobs"),
            customers_collection: env_or("CUSTOMERS_COLLECTION", "customers"),
            require_industry: parse_bool(&env_or("REQUIRE_INDUSTRY", "false"))
                .context("REQUIRE_INDUSTRY must be true or false")?,
            port: env_or("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(anyhow!("'{other}' is not a boolean")),
    }
}
