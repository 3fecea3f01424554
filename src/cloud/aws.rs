//! AWS implementations of the upload ports (S3 + DynamoDB)

use super::{Acl, AttributeValue, CloudError, Item, ObjectStore, RecordTable};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::types::AttributeValue as DynamoValue;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use std::collections::HashMap;
use std::path::Path;

/// Shared SDK config: credentials from the default chain, region from config
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_owned()))
        .load()
        .await
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

fn canned_acl(acl: Acl) -> ObjectCannedAcl {
    match acl {
        Acl::Private => ObjectCannedAcl::Private,
        Acl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

impl ObjectStore for S3Store {
    async fn put_file(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        acl: Option<Acl>,
    ) -> Result<(), CloudError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| CloudError::Io {
                path: local_path.display().to_string(),
                message: e.to_string(),
            })?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("image/jpeg")
            .set_acl(acl.map(canned_acl))
            .body(body)
            .send()
            .await
            .map_err(|e| CloudError::ObjectStore {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!(
            "Uploaded {}/{} (etag {})",
            bucket,
            key,
            output.e_tag().unwrap_or("-")
        );
        Ok(())
    }
}

pub struct DynamoTable {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoTable {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(config),
        }
    }
}

fn to_dynamo(item: Item) -> HashMap<String, DynamoValue> {
    item.into_iter()
        .map(|(name, value)| {
            let value = match value {
                AttributeValue::S(s) => DynamoValue::S(s),
                AttributeValue::N(n) => DynamoValue::N(n),
            };
            (name, value)
        })
        .collect()
}

impl RecordTable for DynamoTable {
    async fn put_item(&self, table: &str, item: Item) -> Result<(), CloudError> {
        let output = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_dynamo(item)))
            .send()
            .await
            .map_err(|e| CloudError::Table {
                table: table.to_owned(),
                message: aws_sdk_dynamodb::error::DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!("put_item into {} succeeded: {:?}", table, output.consumed_capacity());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_acl() {
        assert_eq!(canned_acl(Acl::PublicRead), ObjectCannedAcl::PublicRead);
        assert_eq!(canned_acl(Acl::Private), ObjectCannedAcl::Private);
    }

    #[test]
    fn test_to_dynamo() {
        let mut item = Item::new();
        item.insert("timestamp".into(), AttributeValue::S("1.5".into()));
        item.insert("lux".into(), AttributeValue::N("20.0".into()));

        let converted = to_dynamo(item);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted["timestamp"], DynamoValue::S("1.5".into()));
        assert_eq!(converted["lux"], DynamoValue::N("20.0".into()));
    }
}
