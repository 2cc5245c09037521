//! API service settings

use serde::Deserialize;

/// Where the service keeps its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Settings for the API service
///
/// # Environment Variables
/// - `SERVER_HOST`: bind address (default: 0.0.0.0)
/// - `SERVER_PORT`: bind port (default: 3001)
/// - `API_STORAGE`: `postgres` (default) or `memory`
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(rename = "api_storage", default = "default_storage")]
    pub storage: StorageBackend,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_storage() -> StorageBackend {
    StorageBackend::Postgres
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(common::settings::load("api")?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.bind_address(), "0.0.0.0:3001");
        assert_eq!(settings.storage, StorageBackend::Postgres);
    }

    #[test]
    fn test_memory_backend() {
        let settings: Settings =
            serde_json::from_str(r#"{"api_storage": "memory", "server_port": 8080}"#).unwrap();
        assert_eq!(settings.storage, StorageBackend::Memory);
        assert_eq!(settings.server_port, 8080);
    }
}
