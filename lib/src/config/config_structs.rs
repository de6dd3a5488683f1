// lib/src/config/config_structs.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::config_constants::*;
use crate::config::config_serializers::storage_engine_type_serde;

/// Storage engine types. Serialized through `storage_engine_type_serde`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageEngineType {
    #[default]
    InMemory,
    Sled,
}

impl FromStr for StorageEngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inmemory" | "in-memory" | "memory" => Ok(StorageEngineType::InMemory),
            "sled" => Ok(StorageEngineType::Sled),
            other => Err(format!("Unknown storage engine type: {}", other)),
        }
    }
}

impl fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineType::InMemory => write!(f, "inmemory"),
            StorageEngineType::Sled => write!(f, "sled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(with = "storage_engine_type_serde", default)]
    pub storage_engine_type: StorageEngineType,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            storage_engine_type: StorageEngineType::default(),
            path: default_storage_path(),
        }
    }
}

/// Connection settings for the external drug label registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugRegistryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_base_url() -> String {
    DEFAULT_DRUG_REGISTRY_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_DRUG_REGISTRY_TIMEOUT_MS
}

fn default_description_limit() -> usize {
    DEFAULT_DESCRIPTION_LIMIT
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl DrugRegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DrugRegistryConfig {
    fn default() -> Self {
        DrugRegistryConfig {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            description_limit: default_description_limit(),
            search_limit: default_search_limit(),
        }
    }
}

/// Credentials for the first administrator, created at start-up when absent.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

impl fmt::Debug for BootstrapAdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub drug_registry: DrugRegistryConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ClinicConfig {
    fn default() -> Self {
        ClinicConfig {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            drug_registry: DrugRegistryConfig::default(),
            log_level: default_log_level(),
            bootstrap_admin: None,
        }
    }
}

/// Wrapper for clinic configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct ClinicConfigWrapper {
    pub config_root_directory: String,
    pub clinic: ClinicConfig,
}

#[derive(Debug, Parser, Clone, Default)]
#[clap(name = "clinic_server", about = "Clinic scheduling and prescription REST service")]
pub struct ClinicCliArgs {
    #[clap(
        long,
        env = "CLINIC_CONFIG",
        help = "Path to the clinic YAML configuration file"
    )]
    pub config: Option<PathBuf>,
    #[clap(long, env = "CLINIC_PORT", help = "Port to listen on")]
    pub port: Option<u16>,
    #[clap(
        long,
        env = "CLINIC_STORAGE",
        help = "Storage engine to use (inmemory or sled)"
    )]
    pub storage: Option<StorageEngineType>,
    #[clap(long, help = "Directory for the sled engine")]
    pub storage_path: Option<PathBuf>,
    #[clap(long, env = "CLINIC_LOG_LEVEL", help = "Log level filter, overridden by RUST_LOG")]
    pub log_level: Option<String>,
    #[clap(long, help = "Write the effective configuration to the --config path and exit")]
    pub init_config: bool,
}
