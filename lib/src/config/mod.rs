// lib/src/config/mod.rs

pub mod config_constants;
pub mod config_helpers;
pub mod config_serializers;
pub mod config_structs;

pub use config_constants::*;
pub use config_helpers::{apply_cli_overrides, load_clinic_config, save_clinic_config};
pub use config_structs::*;
