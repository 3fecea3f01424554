//! One collection run: sample, upload the reading, photograph in daylight
//!
//! Steps run strictly in order and the first error ends the run. A photo
//! whose upload fails is left on disk for `cleanup`.

use crate::actuators::camera::{CameraError, CaptureDevice, PhotoClient};
use crate::cloud::{Acl, ObjectStore, RecordTable, UploadClient};
use crate::config::{Config, SamplingPolicy};
use crate::sensors::{BarometricSensor, HumiditySensor, LightSensor, SensorReading, Sensors};
use crate::shared::unix_timestamp;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

/// Photos are taken only when it is brighter than `threshold`
pub fn should_capture_photo(lux: f64, threshold: f64) -> bool {
    lux > threshold
}

/// Everything a run needs besides its devices
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub lux_threshold: f64,
    pub sampling: SamplingPolicy,
    pub photo_dir: PathBuf,
    pub settle: Duration,
    pub photo_bucket: String,
    pub site_bucket: String,
    pub site_key: String,
    pub site_acl: Option<Acl>,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lux_threshold: config.run.lux_threshold,
            sampling: config.run.sampling,
            photo_dir: config.camera.photo_dir.clone(),
            settle: Duration::from_millis(config.camera.settle_ms),
            photo_bucket: config.upload.photo_bucket.clone(),
            site_bucket: config.upload.site_bucket.clone(),
            site_key: config.upload.site_key.clone(),
            site_acl: config.upload.site_acl,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub lux: f64,
    /// The uploaded reading, if the policy sampled one
    pub reading: Option<SensorReading>,
    /// File name of the uploaded photo
    pub photo: Option<String>,
}

pub struct Pipeline<L, B, H, S, T> {
    sensors: Sensors<L, B, H>,
    uploader: UploadClient<S, T>,
    settings: RunSettings,
}

impl<L, B, H, S, T> Pipeline<L, B, H, S, T>
where
    L: LightSensor,
    B: BarometricSensor,
    H: HumiditySensor,
    S: ObjectStore,
    T: RecordTable,
{
    pub fn new(sensors: Sensors<L, B, H>, uploader: UploadClient<S, T>, settings: RunSettings) -> Self {
        Self {
            sensors,
            uploader,
            settings,
        }
    }

    /// Run once. The camera is opened only if the photo gate passes.
    pub async fn run<C, F>(&mut self, open_camera: F) -> anyhow::Result<RunReport>
    where
        C: CaptureDevice,
        F: FnOnce() -> Result<C, CameraError>,
    {
        let lux = self.sensors.light.lux().context("Failed to read lux")?;
        let daylight = should_capture_photo(lux, self.settings.lux_threshold);

        let reading = match self.settings.sampling {
            SamplingPolicy::Always => Some(self.sample(lux)?),
            SamplingPolicy::DaylightOnly if daylight => Some(self.sample(lux)?),
            SamplingPolicy::DaylightOnly => None,
        };

        match &reading {
            Some(reading) => {
                tracing::info!(
                    "Pressure: {} hPa, temperature: {} °C, humidity: {:?} %, lux: {}",
                    reading.pressure,
                    reading.temperature,
                    reading.humidity,
                    reading.lux
                );
                self.uploader
                    .upload_sensor_data(reading)
                    .await
                    .context("Failed to upload sensor reading")?;
            }
            None => tracing::info!("Lux {} is dark, skipping sampling and upload", lux),
        }

        if !daylight {
            tracing::info!(
                "Lux {} at or below threshold {}, no photo",
                lux,
                self.settings.lux_threshold
            );
            return Ok(RunReport {
                lux,
                reading,
                photo: None,
            });
        }

        let photo_name = self.photograph(open_camera).await?;
        Ok(RunReport {
            lux,
            reading,
            photo: Some(photo_name),
        })
    }

    fn sample(&mut self, lux: f64) -> anyhow::Result<SensorReading> {
        let pressure = self
            .sensors
            .barometer
            .pressure()
            .context("Failed to read pressure")?;
        let temperature = self
            .sensors
            .barometer
            .temperature()
            .context("Failed to read temperature")?;
        let humidity = match self.sensors.humidity.as_mut() {
            Some(sensor) => Some(sensor.humidity().context("Failed to read humidity")?),
            None => None,
        };

        Ok(SensorReading {
            timestamp: unix_timestamp(),
            lux,
            pressure,
            temperature,
            humidity,
        })
    }

    async fn photograph<C, F>(&self, open_camera: F) -> anyhow::Result<String>
    where
        C: CaptureDevice,
        F: FnOnce() -> Result<C, CameraError>,
    {
        let settings = &self.settings;
        let device = open_camera().context("Failed to open camera")?;
        let mut photo = PhotoClient::new(device, &settings.photo_dir, &unix_timestamp(), settings.settle);
        photo.take_photo().context("Failed to take photo")?;

        let path = photo.photo_path();
        self.uploader
            .upload_photo(&path, photo.photo_name(), &settings.photo_bucket, None)
            .await
            .context("Failed to upload photo")?;
        self.uploader
            .upload_photo(&path, &settings.site_key, &settings.site_bucket, settings.site_acl)
            .await
            .context("Failed to upload photo to site bucket")?;

        photo.delete_recent_photo().context("Failed to delete photo")?;
        Ok(photo.photo_name().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuators::camera::tests::FakeCamera;
    use crate::cloud::tests::{FakeStore, FakeTable};
    use crate::cloud::AttributeValue;
    use crate::sensors::SensorError;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FixedLight(f64);

    impl LightSensor for FixedLight {
        fn lux(&mut self) -> Result<f64, SensorError> {
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct FixedBarometer {
        pressure: f64,
        temperature: f64,
        reads: Rc<Cell<u32>>,
    }

    impl BarometricSensor for FixedBarometer {
        fn pressure(&mut self) -> Result<f64, SensorError> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.pressure)
        }

        fn temperature(&mut self) -> Result<f64, SensorError> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.temperature)
        }
    }

    struct FixedHumidity(f64);

    impl HumiditySensor for FixedHumidity {
        fn humidity(&mut self) -> Result<f64, SensorError> {
            Ok(self.0)
        }
    }

    struct Harness {
        store: FakeStore,
        table: FakeTable,
        barometer: FixedBarometer,
        dir: tempfile::TempDir,
        camera_opened: Rc<Cell<bool>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: FakeStore::default(),
                table: FakeTable::default(),
                barometer: FixedBarometer {
                    pressure: 1013.25,
                    temperature: 22.5,
                    reads: Rc::default(),
                },
                dir: tempfile::tempdir().unwrap(),
                camera_opened: Rc::default(),
            }
        }

        fn settings(&self, sampling: SamplingPolicy) -> RunSettings {
            let mut config = Config::default();
            config.run.sampling = sampling;
            config.camera.photo_dir = self.dir.path().to_path_buf();
            config.camera.settle_ms = 0;
            RunSettings::from_config(&config)
        }

        async fn run(&self, lux: f64, sampling: SamplingPolicy) -> anyhow::Result<RunReport> {
            let sensors = Sensors {
                light: FixedLight(lux),
                barometer: self.barometer.clone(),
                humidity: Some(FixedHumidity(45.0)),
            };
            let uploader = UploadClient::new(self.store.clone(), self.table.clone(), "measurements");
            let mut pipeline = Pipeline::new(sensors, uploader, self.settings(sampling));

            let opened = self.camera_opened.clone();
            pipeline
                .run(move || {
                    opened.set(true);
                    Ok(FakeCamera::default())
                })
                .await
        }

        fn photos_on_disk(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    #[test]
    fn test_photo_gate_is_strict() {
        assert!(!should_capture_photo(10.0, 15.0));
        assert!(!should_capture_photo(15.0, 15.0));
        assert!(should_capture_photo(15.0001, 15.0));
    }

    #[tokio::test]
    async fn test_dark_run_uploads_reading_only() {
        let harness = Harness::new();
        let report = harness.run(10.0, SamplingPolicy::Always).await.unwrap();

        assert_eq!(report.photo, None);
        assert!(!harness.camera_opened.get());
        assert!(harness.store.puts.borrow().is_empty());

        let rows = harness.table.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1["lux"], AttributeValue::N("10.0".into()));
        assert_eq!(rows[0].1["pressure"], AttributeValue::N("1013.25".into()));
    }

    #[tokio::test]
    async fn test_dark_run_daylight_only_skips_everything() {
        let harness = Harness::new();
        let report = harness.run(10.0, SamplingPolicy::DaylightOnly).await.unwrap();

        assert_eq!(report.reading, None);
        assert_eq!(report.photo, None);
        assert_eq!(harness.barometer.reads.get(), 0);
        assert!(harness.table.rows.borrow().is_empty());
        assert!(harness.store.puts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_lux_takes_no_photo() {
        let harness = Harness::new();
        let report = harness.run(15.0, SamplingPolicy::Always).await.unwrap();
        assert_eq!(report.photo, None);
        assert!(!harness.camera_opened.get());
    }

    #[tokio::test]
    async fn test_bright_run_uploads_photo_twice() {
        let harness = Harness::new();
        let report = harness.run(20.0, SamplingPolicy::Always).await.unwrap();

        let reading = report.reading.unwrap();
        assert_eq!(reading.pressure, 1013.25);
        assert_eq!(reading.temperature, 22.5);
        assert_eq!(reading.humidity, Some(45.0));

        let rows = harness.table.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "measurements");
        assert_eq!(rows[0].1.len(), 5);
        assert_eq!(rows[0].1["humidity"], AttributeValue::N("45.0".into()));

        let photo_name = report.photo.unwrap();
        assert!(photo_name.ends_with("_plant.jpg"));

        let puts = harness.store.puts.borrow();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].bucket, "pi-zero-plant-photos");
        assert_eq!(puts[0].key, photo_name);
        assert_eq!(puts[0].acl, None);
        assert_eq!(puts[1].bucket, "static-plant-site");
        assert_eq!(puts[1].key, "plant.jpg");
        assert_eq!(puts[1].acl, Some(Acl::PublicRead));
        assert!(puts.iter().all(|p| p.existed));
        assert_eq!(puts[0].local_path, harness.dir.path().join(&photo_name));

        assert_eq!(harness.photos_on_disk(), 0);
    }

    #[tokio::test]
    async fn test_bright_run_daylight_only_samples_everything() {
        let harness = Harness::new();
        let report = harness.run(20.0, SamplingPolicy::DaylightOnly).await.unwrap();

        assert!(report.reading.is_some());
        assert_eq!(harness.barometer.reads.get(), 2);
        assert_eq!(harness.table.rows.borrow().len(), 1);
        assert_eq!(harness.store.puts.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_photo() {
        let mut harness = Harness::new();
        harness.store.fail = true;

        let result = harness.run(20.0, SamplingPolicy::Always).await;
        assert!(result.is_err());
        // reading went out before the photo
        assert_eq!(harness.table.rows.borrow().len(), 1);
        assert_eq!(harness.photos_on_disk(), 1);
    }
}
