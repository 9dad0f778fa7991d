use anyhow::Context;
use serde::Deserialize;

/// Argon2 cost settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub cost: u32,       // iterations
    pub memory_kib: u32, // memory cost
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            cost: 2,
            memory_kib: argon2::Params::DEFAULT_M_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub hashing: HashConfig,
}

fn env_u32(key: &str, default: u32) -> anyhow::Result<u32> {
    match std::env::var(key) {
        Ok(v) => v.parse::<u32>().with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let defaults = HashConfig::default();
        let hashing = HashConfig {
            cost: env_u32("HASH_COST", defaults.cost)?,
            memory_kib: env_u32("HASH_MEMORY_KIB", defaults.memory_kib)?,
        };
        Ok(Self {
            database_url,
            hashing,
        })
    }
}
