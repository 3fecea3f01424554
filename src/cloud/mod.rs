//! Cloud upload: photos to object storage, readings to a key-value table
//!
//! Every call is fire-and-forget. There is no retry, no idempotency key and
//! no deduplication; writing the same reading twice makes two rows.

pub mod aws;

use crate::sensors::SensorReading;
use crate::shared::{decimal_string, format_bytes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("object storage upload to {bucket}/{key} failed: {message}")]
    ObjectStore {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("put_item into {table} failed: {message}")]
    Table { table: String, message: String },
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// Canned access control applied to an uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    PublicRead,
}

/// A typed table attribute. Numbers travel as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    S(String),
    N(String),
}

pub type Item = BTreeMap<String, AttributeValue>;

/// Object storage port
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn put_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        acl: Option<Acl>,
    ) -> Result<(), CloudError>;
}

/// Key-value table port
#[allow(async_fn_in_trait)]
pub trait RecordTable {
    async fn put_item(&self, table: &str, item: Item) -> Result<(), CloudError>;
}

/// Table row for one reading: `timestamp` as a string, the measurements as numbers.
///
/// `humidity` is left out when the run had no humidity sensor.
pub fn sensor_record(reading: &SensorReading) -> Item {
    let mut item = Item::new();
    item.insert("timestamp".into(), AttributeValue::S(reading.timestamp.clone()));
    item.insert("lux".into(), AttributeValue::N(decimal_string(reading.lux)));
    item.insert("pressure".into(), AttributeValue::N(decimal_string(reading.pressure)));
    item.insert(
        "temperature".into(),
        AttributeValue::N(decimal_string(reading.temperature)),
    );
    if let Some(humidity) = reading.humidity {
        item.insert("humidity".into(), AttributeValue::N(decimal_string(humidity)));
    }
    item
}

pub struct UploadClient<S, T> {
    store: S,
    table: T,
    table_name: String,
}

impl<S: ObjectStore, T: RecordTable> UploadClient<S, T> {
    pub fn new(store: S, table: T, table_name: impl Into<String>) -> Self {
        Self {
            store,
            table,
            table_name: table_name.into(),
        }
    }

    pub async fn upload_photo(
        &self,
        local_path: &Path,
        remote_key: &str,
        bucket: &str,
        acl: Option<Acl>,
    ) -> Result<(), CloudError> {
        let size = std::fs::metadata(local_path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(
            "Uploading {} ({}) to {}/{}",
            local_path.display(),
            format_bytes(size),
            bucket,
            remote_key
        );
        self.store.put_file(local_path, bucket, remote_key, acl).await
    }

    pub async fn upload_sensor_data(&self, reading: &SensorReading) -> Result<(), CloudError> {
        tracing::info!("Writing reading {} to {}", reading.timestamp, self.table_name);
        self.table.put_item(&self.table_name, sensor_record(reading)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct PutFile {
        pub local_path: PathBuf,
        pub existed: bool,
        pub bucket: String,
        pub key: String,
        pub acl: Option<Acl>,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeStore {
        pub puts: Rc<RefCell<Vec<PutFile>>>,
        pub fail: bool,
    }

    impl ObjectStore for FakeStore {
        async fn put_file(
            &self,
            local_path: &Path,
            bucket: &str,
            key: &str,
            acl: Option<Acl>,
        ) -> Result<(), CloudError> {
            if self.fail {
                return Err(CloudError::ObjectStore {
                    bucket: bucket.into(),
                    key: key.into(),
                    message: "access denied".into(),
                });
            }
            self.puts.borrow_mut().push(PutFile {
                local_path: local_path.to_path_buf(),
                existed: local_path.is_file(),
                bucket: bucket.into(),
                key: key.into(),
                acl,
            });
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeTable {
        pub rows: Rc<RefCell<Vec<(String, Item)>>>,
    }

    impl RecordTable for FakeTable {
        async fn put_item(&self, table: &str, item: Item) -> Result<(), CloudError> {
            self.rows.borrow_mut().push((table.into(), item));
            Ok(())
        }
    }

    fn reading(humidity: Option<f64>) -> SensorReading {
        SensorReading {
            timestamp: "1700000000.000001".into(),
            lux: 20.0,
            pressure: 1013.25,
            temperature: 22.5,
            humidity,
        }
    }

    #[test]
    fn test_sensor_record_schema() {
        let item = sensor_record(&reading(Some(45.0)));
        let keys: Vec<&str> = item.keys().map(String::as_str).collect();
        assert_eq!(keys, ["humidity", "lux", "pressure", "temperature", "timestamp"]);

        assert_eq!(item["timestamp"], AttributeValue::S("1700000000.000001".into()));
        assert_eq!(item["lux"], AttributeValue::N("20.0".into()));
        assert_eq!(item["pressure"], AttributeValue::N("1013.25".into()));
        assert_eq!(item["temperature"], AttributeValue::N("22.5".into()));
        assert_eq!(item["humidity"], AttributeValue::N("45.0".into()));
    }

    #[test]
    fn test_sensor_record_without_humidity() {
        let item = sensor_record(&reading(None));
        assert_eq!(item.len(), 4);
        assert!(!item.contains_key("humidity"));
    }

    #[tokio::test]
    async fn test_upload_sensor_data_uses_table_name() {
        let table = FakeTable::default();
        let client = UploadClient::new(FakeStore::default(), table.clone(), "measurements");
        client.upload_sensor_data(&reading(Some(45.0))).await.unwrap();

        let rows = table.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "measurements");
        assert_eq!(rows[0].1, sensor_record(&reading(Some(45.0))));
    }

    #[tokio::test]
    async fn test_upload_photo_passes_acl() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("1_plant.jpg");
        std::fs::write(&photo, b"jpeg").unwrap();

        let store = FakeStore::default();
        let client = UploadClient::new(store.clone(), FakeTable::default(), "t");
        client
            .upload_photo(&photo, "plant.jpg", "static-plant-site", Some(Acl::PublicRead))
            .await
            .unwrap();

        let puts = store.puts.borrow();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].bucket, "static-plant-site");
        assert_eq!(puts[0].key, "plant.jpg");
        assert_eq!(puts[0].acl, Some(Acl::PublicRead));
        assert!(puts[0].existed);
    }
}
