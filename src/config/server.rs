use super::env_or;
use crate::core::{AppError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// actix worker threads
    pub workers: usize,
}

impl ServerConfig {
    /// Listener on `host:port` with two workers per available core
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());

        Self {
            host: host.into(),
            port,
            workers: cores * 2,
        }
    }

    /// `SERVER_HOST`, `SERVER_PORT` and optional `SERVER_WORKERS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            env_or("SERVER_HOST", DEFAULT_HOST.to_string())?,
            env_or("SERVER_PORT", DEFAULT_PORT)?,
        );
        config.workers = env_or("SERVER_WORKERS", config.workers)?;

        if config.workers == 0 {
            return Err(AppError::Configuration(
                "SERVER_WORKERS must be greater than 0".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}
