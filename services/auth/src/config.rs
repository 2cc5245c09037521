//! Authentication service settings

use serde::Deserialize;

/// # Environment Variables
/// - `SERVER_HOST`: bind address (default: 0.0.0.0)
/// - `SERVER_PORT`: bind port (default: 3000)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(common::settings::load("auth")?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    #[serial]
    fn test_port_from_environment() {
        unsafe {
            std::env::set_var("SERVER_PORT", "4100");
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.server_port, 4100);

        unsafe {
            std::env::remove_var("SERVER_PORT");
        }
    }
}
