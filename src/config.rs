use serde::Deserialize;
use std::convert::TryFrom;
use std::path::PathBuf;

use crate::resolver::{CONTROLLER_SUFFIX, MODULE_EXTENSION};
use crate::router::DEFAULT_BODY_LIMIT;

/// Configuration for resolving controllers and serving the resulting router.
///
/// It can be initialized from environment variables with the "WAYPOST_" prefix
/// or from a `waypost` config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server host address. Defaults to "127.0.0.1".
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port number. Defaults to 3000.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory scanned for controller module artifacts. Defaults to "controllers".
    #[serde(default = "default_controllers_dir")]
    pub controllers_dir: PathBuf,
    /// Extension of module artifacts. Defaults to "ctl".
    #[serde(default = "default_module_extension")]
    pub module_extension: String,
    /// Suffix an export name must carry to be treated as a controller.
    #[serde(default = "default_controller_suffix")]
    pub controller_suffix: String,
    #[serde(default = "default_http1_keep_alive")]
    pub http1_keep_alive: bool,
    /// Largest request body, in bytes, collected before dispatch. Defaults to 2 MiB.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[cfg(feature = "http2")]
    #[serde(default)]
    pub http2_only: bool,
}

/// Implements conversion from the config crate's Config type to AppConfig.
impl TryFrom<config::Config> for AppConfig {
    type Error = config::ConfigError;

    fn try_from(config: config::Config) -> Result<Self, Self::Error> {
        config.try_deserialize()
    }
}

impl AppConfig {
    /// Creates a new AppConfig instance from environment variables and config file.
    ///
    /// This method will:
    /// 1. Load environment variables from a .env file if present
    /// 2. Load configuration from a "waypost" file (if it exists)
    /// 3. Override with environment variables prefixed with "WAYPOST_"
    ///
    /// # Errors
    /// Returns a ConfigError if configuration loading or parsing fails.
    pub fn new() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("waypost").required(false))
            .add_source(config::Environment::with_prefix("WAYPOST"));

        builder.build()?.try_into()
    }

    /// `host:port` the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_controllers_dir() -> PathBuf {
    PathBuf::from("controllers")
}

fn default_module_extension() -> String {
    MODULE_EXTENSION.to_string()
}

fn default_controller_suffix() -> String {
    CONTROLLER_SUFFIX.to_string()
}

fn default_http1_keep_alive() -> bool {
    true
}

fn default_max_body_size() -> usize {
    DEFAULT_BODY_LIMIT
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            controllers_dir: default_controllers_dir(),
            module_extension: default_module_extension(),
            controller_suffix: default_controller_suffix(),
            http1_keep_alive: default_http1_keep_alive(),
            max_body_size: default_max_body_size(),
            #[cfg(feature = "http2")]
            http2_only: false,
        }
    }
}
