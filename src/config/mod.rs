//! Configuration module
//!
//! Handles loading and saving playset configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::endpoint::LinkConfig;
use crate::protocol::{ChecksumKind, Direction};
use crate::radio::{PipeAddress, RadioConfig};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Pipe addresses must differ (both {0})")]
    SamePipes(PipeAddress),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Radio settings shared by both ends
    #[serde(default)]
    pub radio: RadioSettings,

    /// Link timing and emulated radio sockets
    #[serde(default)]
    pub link: LinkSettings,
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Name shown in logs
    #[serde(default = "default_name")]
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_name() -> String {
    "cubetto-playset".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            verbose: false,
        }
    }
}

/// Radio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSettings {
    /// Checksum both ends apply to command packets
    #[serde(default)]
    pub checksum: ChecksumKind,
    /// Pipe carrying commands
    #[serde(default = "default_interface_to_cubetto_pipe")]
    pub interface_to_cubetto_pipe: PipeAddress,
    /// Pipe carrying acknowledgments
    #[serde(default = "default_cubetto_to_interface_pipe")]
    pub cubetto_to_interface_pipe: PipeAddress,
}

fn default_interface_to_cubetto_pipe() -> PipeAddress {
    PipeAddress::for_direction(Direction::InterfaceToCubetto)
}

fn default_cubetto_to_interface_pipe() -> PipeAddress {
    PipeAddress::for_direction(Direction::CubettoToInterface)
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            checksum: ChecksumKind::default(),
            interface_to_cubetto_pipe: default_interface_to_cubetto_pipe(),
            cubetto_to_interface_pipe: default_cubetto_to_interface_pipe(),
        }
    }
}

impl RadioSettings {
    /// Pipe assignment for the Interface radio
    pub fn interface_radio(&self) -> RadioConfig {
        RadioConfig::interface()
            .with_pipes(self.interface_to_cubetto_pipe, self.cubetto_to_interface_pipe)
    }

    /// Pipe assignment for the Robot radio
    pub fn robot_radio(&self) -> RadioConfig {
        RadioConfig::robot()
            .with_pipes(self.cubetto_to_interface_pipe, self.interface_to_cubetto_pipe)
    }
}

/// Link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// UDP address of the emulated Interface radio
    #[serde(default = "default_interface_bind")]
    pub interface_bind: SocketAddr,
    /// UDP address of the emulated Robot radio
    #[serde(default = "default_robot_bind")]
    pub robot_bind: SocketAddr,
    /// Time to wait for an ack after each transmission (ms)
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,
    /// Retransmissions after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_interface_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 24870))
}

fn default_robot_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 24871))
}

fn default_ack_timeout() -> u64 {
    200
}

fn default_max_retries() -> u32 {
    5
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            interface_bind: default_interface_bind(),
            robot_bind: default_robot_bind(),
            ack_timeout_ms: default_ack_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl LinkSettings {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::new(Duration::from_millis(self.ack_timeout_ms), self.max_retries)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("primo/config.toml")),
            Some(PathBuf::from("./primo.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject configurations the transceivers could not tell apart
    pub fn validate(&self) -> ConfigResult<()> {
        if self.radio.interface_to_cubetto_pipe == self.radio.cubetto_to_interface_pipe {
            return Err(ConfigError::SamePipes(self.radio.interface_to_cubetto_pipe));
        }
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    let config = Config {
        general: GeneralConfig {
            name: "classroom-playset".to_string(),
            verbose: false,
        },
        ..Default::default()
    };

    Ok(toml::to_string_pretty(&config)?)
}
