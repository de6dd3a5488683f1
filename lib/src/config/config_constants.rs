// lib/src/config/config_constants.rs

pub const DEFAULT_CONFIG_ROOT_DIRECTORY_STR: &str = "./config";
pub const DEFAULT_CLINIC_CONFIG_PATH_RELATIVE: &str = "./config/clinic_config.yaml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_STORAGE_PATH: &str = "./data/clinic";

pub const DEFAULT_DRUG_REGISTRY_URL: &str = "https://api.fda.gov/drug/label.json";
pub const DEFAULT_DRUG_REGISTRY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DESCRIPTION_LIMIT: usize = 200;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

pub const DEFAULT_LOG_LEVEL: &str = "info";
