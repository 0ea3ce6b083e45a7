use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_STORAGE: &str = "memory";

/// Top-level config (flotilla.toml + FLOTILLA_* env overrides). CLI flags
/// are applied on top by the gateway binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlotillaConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind: "memory", "postgresql" or "redis". Only "memory" is
    /// implemented; the others abort startup.
    #[serde(default = "default_storage")]
    pub kind: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: DEFAULT_STORAGE.to_string(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_storage() -> String {
    DEFAULT_STORAGE.to_string()
}

impl FlotillaConfig {
    /// Load config from a TOML file with FLOTILLA_* env var overrides.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("flotilla.toml");

        let config: FlotillaConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLOTILLA_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}
