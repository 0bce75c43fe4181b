//! Configuration management for the conversion service.
//!
//! Configuration comes from three places:
//! - Command-line arguments via clap (where the config file lives, log verbosity)
//! - A YAML file, written with defaults on first run
//! - Environment variables with the `CONVERT_SVC__` prefix, overriding the file
//!
//! # Example
//!
//! ```ignore
//! use convert_svc::config::{AppConfig, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! let config = AppConfig::load(&cli.config)?;
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # File Format
//!
//! ```yaml
//! server:
//!   address: ":8080"
//!   mode: debug
//! storage:
//!   upload_dir: storage/uploads
//!   converted_dir: storage/converted
//!   archive_dir: storage/archive
//! conversion:
//!   dpi: 300
//!   delete_original: false
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `CONVERT_SVC__<SECTION>__<KEY>`, e.g.
//! `CONVERT_SVC__CONVERSION__DPI=150` or `CONVERT_SVC__SERVER__MODE=release`.

use std::path::{Path, PathBuf};

use clap::Parser;
use config::{Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::ConfigError;

// =============================================================================
// Default Values
// =============================================================================

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Default listen address; a bare `:port` binds every interface.
pub const DEFAULT_ADDRESS: &str = ":8080";

/// Default rasterization resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Highest accepted rasterization resolution.
pub const MAX_DPI: u32 = 2400;

/// Written to disk when no config file exists yet.
pub const DEFAULT_CONFIG_YAML: &str = r#"server:
  address: ":8080"
  # debug or release
  mode: debug

storage:
  upload_dir: storage/uploads
  converted_dir: storage/converted
  archive_dir: storage/archive

conversion:
  dpi: 300
  delete_original: false
  keep_intermediate_pdf: true

tools:
  pdftoppm: pdftoppm
  libreoffice: libreoffice
  convert: convert
"#;

// =============================================================================
// CLI Arguments
// =============================================================================

/// convert-svc - Convert PDF, Office and image files to PNG pages over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "convert-svc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file (created with defaults if missing).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "CONVERT_SVC_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose logging (debug level) regardless of server mode.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

// =============================================================================
// File Configuration
// =============================================================================

/// Server run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Debug,
    Release,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_mode")]
    pub mode: Mode,

    /// Allowed CORS origins (None = any origin)
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Base URL used in returned file links, overriding the listen address
    #[serde(default)]
    pub public_url: Option<String>,
}

/// Storage directories.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_converted_dir")]
    pub converted_dir: PathBuf,

    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
}

/// Conversion defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Remove the source file after it converted successfully
    #[serde(default)]
    pub delete_original: bool,

    /// Keep the PDF produced from an Office document next to its pages
    #[serde(default = "default_true")]
    pub keep_intermediate_pdf: bool,
}

/// External tool commands.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,

    #[serde(default = "default_libreoffice")]
    pub libreoffice: String,

    #[serde(default = "default_convert")]
    pub convert: String,
}

/// Complete service configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_conversion")]
    pub conversion: ConversionConfig,

    #[serde(default = "default_tools")]
    pub tools: ToolsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            conversion: default_conversion(),
            tools: default_tools(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, creating it with defaults if missing.
    ///
    /// Environment overrides are applied on top of the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let load_err = |message: String| ConfigError::Load {
            path: path.display().to_string(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| load_err(e.to_string()))?;
        }

        if !path.exists() {
            std::fs::write(path, DEFAULT_CONFIG_YAML).map_err(|e| load_err(e.to_string()))?;
        }

        config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix("CONVERT_SVC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| load_err(e.to_string()))?
            .try_deserialize()
            .map_err(|e| load_err(e.to_string()))
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.address must not be empty".to_string(),
            ));
        }

        if self.conversion.dpi == 0 || self.conversion.dpi > MAX_DPI {
            return Err(ConfigError::Invalid(format!(
                "conversion.dpi must be between 1 and {}",
                MAX_DPI
            )));
        }

        let dirs = [
            ("storage.upload_dir", &self.storage.upload_dir),
            ("storage.converted_dir", &self.storage.converted_dir),
            ("storage.archive_dir", &self.storage.archive_dir),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        let tools = [
            ("tools.pdftoppm", &self.tools.pdftoppm),
            ("tools.libreoffice", &self.tools.libreoffice),
            ("tools.convert", &self.tools.convert),
        ];
        for (key, command) in tools {
            if command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", key)));
            }
        }

        Ok(())
    }

    /// Socket address to bind, with a bare `:port` expanded to all interfaces.
    pub fn bind_address(&self) -> String {
        let address = self.server.address.trim();
        if address.starts_with(':') {
            format!("0.0.0.0{}", address)
        } else {
            address.to_string()
        }
    }

    /// Base URL for links to converted files, without a trailing slash.
    pub fn public_base_url(&self) -> String {
        if let Some(url) = self.server.public_url.as_deref().filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }

        let address = self.server.address.trim();
        if address.starts_with(':') {
            format!("http://localhost{}", address)
        } else if address.starts_with("http") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address)
        }
    }

    /// Create the upload, converted and archive directories.
    pub fn ensure_storage_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.storage.upload_dir)?;
        std::fs::create_dir_all(&self.storage.converted_dir)?;
        std::fs::create_dir_all(&self.storage.archive_dir)?;
        Ok(())
    }

    /// Default tracing filter for this configuration.
    pub fn log_filter(&self, verbose: bool) -> &'static str {
        if verbose || self.server.mode == Mode::Debug {
            "convert_svc=debug,tower_http=debug"
        } else {
            "convert_svc=info,tower_http=info"
        }
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        address: default_address(),
        mode: default_mode(),
        cors_origins: None,
        public_url: None,
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_mode() -> Mode {
    Mode::Debug
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        upload_dir: default_upload_dir(),
        converted_dir: default_converted_dir(),
        archive_dir: default_archive_dir(),
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("storage/uploads")
}

fn default_converted_dir() -> PathBuf {
    PathBuf::from("storage/converted")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("storage/archive")
}

fn default_conversion() -> ConversionConfig {
    ConversionConfig {
        dpi: default_dpi(),
        delete_original: false,
        keep_intermediate_pdf: true,
    }
}

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

fn default_true() -> bool {
    true
}

fn default_tools() -> ToolsConfig {
    ToolsConfig {
        pdftoppm: default_pdftoppm(),
        libreoffice: default_libreoffice(),
        convert: default_convert(),
    }
}

fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}

fn default_libreoffice() -> String {
    "libreoffice".to_string()
}

fn default_convert() -> String {
    "convert".to_string()
}

// =============================================================================
// Tests
// =============================================================================
