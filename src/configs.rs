use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::model::{LEAF_VALIDITY_DAYS, ROOT_VALIDITY_DAYS};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub root_ca: RootCaConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            root_ca: RootCaConfig::default(),
            gateway: GatewayConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("ca_state")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RootCaConfig {
    #[serde(default = "default_root_ca_cn")]
    pub common_name: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default)]
    pub organizational_unit: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_root_validity")]
    pub validity_days: u32,
}

impl Default for RootCaConfig {
    fn default() -> Self {
        Self {
            common_name: default_root_ca_cn(),
            organization: default_organization(),
            organizational_unit: String::new(),
            locality: String::new(),
            state: String::new(),
            country: default_country(),
            validity_days: default_root_validity(),
        }
    }
}

fn default_root_ca_cn() -> String {
    "example-ca.local".to_string()
}

fn default_organization() -> String {
    "ExampleCA".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

fn default_root_validity() -> u32 {
    ROOT_VALIDITY_DAYS
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_cn")]
    pub common_name: String,
    #[serde(default = "default_gateway_dns_names")]
    pub dns_names: Vec<String>,
    #[serde(default = "default_gateway_ip_addresses")]
    pub ip_addresses: Vec<String>,
    #[serde(default = "default_leaf_validity")]
    pub validity_days: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            common_name: default_gateway_cn(),
            dns_names: default_gateway_dns_names(),
            ip_addresses: default_gateway_ip_addresses(),
            validity_days: default_leaf_validity(),
        }
    }
}

fn default_gateway_cn() -> String {
    "example-gateway.local".to_string()
}

fn default_gateway_dns_names() -> Vec<String> {
    vec!["example-gateway.local".to_string(), "localhost".to_string()]
}

fn default_gateway_ip_addresses() -> Vec<String> {
    vec!["127.0.0.1".to_string()]
}

fn default_leaf_validity() -> u32 {
    LEAF_VALIDITY_DAYS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_client_cn")]
    pub common_name: String,
    #[serde(default = "default_client_user_id")]
    pub user_id: u64,
    #[serde(default = "default_client_platform")]
    pub platform: String,
    /// Pin the client certificate to a specific serial number
    #[serde(default)]
    pub pinned_serial: Option<u64>,
    #[serde(default = "default_leaf_validity")]
    pub validity_days: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            common_name: default_client_cn(),
            user_id: default_client_user_id(),
            platform: default_client_platform(),
            pinned_serial: None,
            validity_days: default_leaf_validity(),
        }
    }
}

fn default_client_cn() -> String {
    "client0.example.local".to_string()
}

fn default_client_user_id() -> u64 {
    100
}

fn default_client_platform() -> String {
    "Linux".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        let config: AppConfig =
            toml::from_str(&config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration with default path (config.toml), falling back to
    /// built-in defaults when the file does not exist
    pub fn load() -> Result<Self> {
        if std::path::Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else {
            Ok(Self::default())
        }
    }
}
