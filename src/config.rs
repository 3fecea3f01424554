//! Configuration module
//!
//! Reads/writes job configuration from ~/.config/plant-telemetry/config.toml

use crate::cloud::Acl;
use crate::sensors::registers::LPS22HB_ADDRESS;
use crate::sensors::tcs34725::{Gain, TCS34725_ADDRESS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Job configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensors: SensorConfig,
    pub camera: CameraConfig,
    pub upload: UploadConfig,
    pub run: RunConfig,
}

/// Sensor wiring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// I2C bus device shared by the LPS22HB and TCS34725
    pub i2c_bus: PathBuf,
    pub lps22hb_address: u8,
    pub tcs34725_address: u8,
    /// TCS34725 ATIME register value (integration time = (256 - atime) * 2.4 ms)
    pub tcs34725_atime: u8,
    pub tcs34725_gain: Gain,
    /// Set to false on a board without the SHTC3
    pub humidity_enabled: bool,
    pub humidity_library: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: PathBuf::from("/dev/i2c-1"),
            lps22hb_address: LPS22HB_ADDRESS,
            tcs34725_address: TCS34725_ADDRESS,
            tcs34725_atime: 0xC0,
            tcs34725_gain: Gain::X60,
            humidity_enabled: true,
            humidity_library: PathBuf::from("/home/pi/projects/SHTC3.so"),
        }
    }
}

impl SensorConfig {
    /// The SHTC3 library to load, or `None` when humidity is switched off
    pub fn humidity_library(&self) -> Option<&Path> {
        self.humidity_enabled.then_some(self.humidity_library.as_path())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    /// Where photos are written, and the only directory `cleanup` touches
    pub photo_dir: PathBuf,
    /// Preview time before capture, for exposure and focus
    pub settle_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            photo_dir: PathBuf::from("/home/pi/projects"),
            settle_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub region: String,
    /// Every photo lands here under its own file name
    pub photo_bucket: String,
    /// Static site bucket; holds only the latest photo
    pub site_bucket: String,
    pub site_key: String,
    pub site_acl: Option<Acl>,
    pub table: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            region: "us-east-2".to_string(),
            photo_bucket: "pi-zero-plant-photos".to_string(),
            site_bucket: "static-plant-site".to_string(),
            site_key: "plant.jpg".to_string(),
            site_acl: Some(Acl::PublicRead),
            table: "pi_zero_plant_sensor_measurements".to_string(),
        }
    }
}

/// Which sensors are read, and whether the reading is uploaded, on a dark run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingPolicy {
    /// Read every sensor and upload the reading on every run
    #[default]
    Always,
    /// Read only lux on a dark run and upload nothing
    DaylightOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// A photo is taken only when lux is strictly above this
    pub lux_threshold: f64,
    pub sampling: SamplingPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lux_threshold: 15.0,
            sampling: SamplingPolicy::Always,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("plant-telemetry").join("config.toml"))
    }

    /// Load config from `path`, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read config file: {}", e);
                Self::default()
            }
        }
    }
}
