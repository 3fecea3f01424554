//! plant-telemetry: one-shot sensor sampling and upload job for a plant camera
//!
//! Run it from cron or a systemd timer. Each run reads light, pressure,
//! temperature and humidity, writes the reading to DynamoDB and, in daylight,
//! photographs the plant and uploads the photo to S3.
//!
//! Features:
//! - sensors: LPS22HB and TCS34725 over Linux I2C, SHTC3 through its shared library
//! - camera: V4L2 capture through nokhwa, JPEG encoding through image

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// === Modules ===

mod config;

mod sensors;

mod actuators;

mod cloud;

mod pipeline;

mod shared;

use config::Config;

// === CLI ===

#[derive(Parser)]
#[command(name = "plant-telemetry")]
#[command(about = "Sample plant sensors, photograph in daylight, upload to AWS")]
struct Cli {
    /// Config file to use instead of ~/.config/plant-telemetry/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the config file in your editor
    Config,
    /// Delete every .jpg left in the photo directory
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
    };

    match cli.command {
        Some(Commands::Config) => {
            run_config_command(&config_path)?;
        }
        Some(Commands::Cleanup) => {
            let config = Config::load_from(&config_path);
            let removed = actuators::camera::delete_all_photos(&config.camera.photo_dir)?;
            println!("Deleted {} photo(s) from {}", removed, config.camera.photo_dir.display());
        }
        None => {
            let config = Config::load_from(&config_path);
            run_collection(&config).await?;
        }
    }

    Ok(())
}

/// Open config file in user's editor
fn run_config_command(config_path: &Path) -> anyhow::Result<()> {
    // Create config file from template if it doesn't exist
    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let template = include_str!("../config.toml.example");
        std::fs::write(config_path, template)?;
        println!("Created config file: {}", config_path.display());
    }

    // Get editor from environment or use defaults
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "nano".to_string());

    println!("Opening {} with {}", config_path.display(), editor);

    std::process::Command::new(&editor)
        .arg(config_path)
        .status()?;

    Ok(())
}

/// Sample, upload, and photograph once
#[cfg(all(feature = "sensors", feature = "camera"))]
async fn run_collection(config: &Config) -> anyhow::Result<()> {
    use actuators::camera::NokhwaCamera;
    use anyhow::Context;
    use cloud::aws::{load_sdk_config, DynamoTable, S3Store};
    use cloud::UploadClient;
    use linux_embedded_hal::{Delay, I2cdev};
    use pipeline::{Pipeline, RunSettings};
    use sensors::lps22hb::Lps22hb;
    use sensors::shtc3::Shtc3;
    use sensors::tcs34725::Tcs34725;
    use sensors::Sensors;

    tracing::info!("Starting plant-telemetry run");
    let sensor_config = &config.sensors;
    let bus = &sensor_config.i2c_bus;

    let light_bus = I2cdev::new(bus).with_context(|| format!("Failed to open {}", bus.display()))?;
    let light = Tcs34725::new(
        light_bus,
        Delay,
        sensor_config.tcs34725_address,
        sensor_config.tcs34725_atime,
        sensor_config.tcs34725_gain,
    )
    .context("Failed to initialise TCS34725")?;

    let barometer_bus = I2cdev::new(bus).with_context(|| format!("Failed to open {}", bus.display()))?;
    let barometer = Lps22hb::new(barometer_bus, Delay, sensor_config.lps22hb_address)
        .context("Failed to initialise LPS22HB")?;

    let humidity = match sensor_config.humidity_library() {
        Some(path) => Some(Shtc3::open(path).context("Failed to initialise SHTC3")?),
        None => {
            tracing::warn!("Humidity disabled in config, humidity will not be recorded");
            None
        }
    };

    let sdk_config = load_sdk_config(&config.upload.region).await;
    let uploader = UploadClient::new(
        S3Store::new(&sdk_config),
        DynamoTable::new(&sdk_config),
        config.upload.table.clone(),
    );

    let sensors = Sensors {
        light,
        barometer,
        humidity,
    };
    let mut pipeline = Pipeline::new(sensors, uploader, RunSettings::from_config(config));
    let camera_index = config.camera.index;
    let report = pipeline.run(|| NokhwaCamera::open(camera_index)).await?;

    match report.photo {
        Some(photo) => tracing::info!("Run complete, lux {}, uploaded {}", report.lux, photo),
        None => tracing::info!("Run complete, lux {}, no photo", report.lux),
    }
    Ok(())
}

#[cfg(not(all(feature = "sensors", feature = "camera")))]
async fn run_collection(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("plant-telemetry was built without the `sensors` and `camera` features")
}
