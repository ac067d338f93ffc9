// crates/yc-storage-mcp/src/s3_gateway.rs
// ============================================================================
// Module: S3 Storage Gateway
// Description: aws-sdk-s3 implementation of the storage gateway.
// Purpose: Talk to Yandex Cloud Object Storage through its S3-compatible API.
// Dependencies: aws-config, aws-sdk-s3, yc-storage-config
// ============================================================================

//! ## Overview
//! [`S3StorageGateway`] owns one long-lived S3 client configured from
//! [`StorageConfig`] and environment-sourced [`StorageCredentials`]. The client
//! is immutable after construction and shared across tool calls. Retries are
//! disabled: a failed call surfaces immediately as a [`GatewayError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::error::Error as StdError;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::primitives::DateTimeFormat;
use bytes::Bytes;
use yc_storage_config::StorageConfig;
use yc_storage_config::StorageCredentials;

use crate::gateway::BoxedObjectBody;
use crate::gateway::BucketSummary;
use crate::gateway::GatewayError;
use crate::gateway::ListObjectsQuery;
use crate::gateway::ObjectBody;
use crate::gateway::ObjectSummary;
use crate::gateway::StorageGateway;

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER_NAME: &str = "yc-storage-mcp";

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// S3-backed storage gateway.
#[derive(Clone, Debug)]
pub struct S3StorageGateway {
    /// Underlying S3 client.
    client: Client,
}

impl S3StorageGateway {
    /// Builds the gateway from storage configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the configuration is invalid.
    pub async fn connect(
        config: &StorageConfig,
        credentials: StorageCredentials,
    ) -> Result<Self, GatewayError> {
        config.validate().map_err(|err| GatewayError::Invalid(err.to_string()))?;
        let credentials = Credentials::new(
            credentials.access_key_id,
            credentials.secret_access_key,
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.trim())
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
        })
    }
}

#[async_trait]
impl StorageGateway for S3StorageGateway {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, GatewayError> {
        let output = self.client.list_buckets().send().await.map_err(backend_error)?;
        let buckets = output
            .buckets()
            .iter()
            .filter_map(|bucket| {
                bucket.name().map(|name| BucketSummary {
                    name: name.to_string(),
                    creation_date: bucket.creation_date().and_then(iso_timestamp),
                })
            })
            .collect();
        Ok(buckets)
    }

    async fn list_objects(
        &self,
        query: &ListObjectsQuery,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        let max_keys = i32::try_from(query.max_keys).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_objects_v2()
            .bucket(&query.bucket)
            .set_prefix(query.prefix.clone())
            .max_keys(max_keys)
            .send()
            .await
            .map_err(backend_error)?;
        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectSummary {
                    key: key.to_string(),
                    size: object.size(),
                    last_modified: object.last_modified().and_then(iso_timestamp),
                    etag: object.e_tag().map(str::to_string),
                })
            })
            .collect();
        Ok(objects)
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<BoxedObjectBody>, GatewayError> {
        let output =
            self.client.get_object().bucket(bucket).key(key).send().await.map_err(backend_error)?;
        Ok(Some(Box::new(S3ObjectBody {
            stream: output.body,
        })))
    }
}

// ============================================================================
// SECTION: Object Body
// ============================================================================

/// Streaming body of a `GetObject` response.
struct S3ObjectBody {
    /// SDK byte stream.
    stream: ByteStream,
}

#[async_trait]
impl ObjectBody for S3ObjectBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, GatewayError> {
        self.stream.try_next().await.map_err(|err| GatewayError::Stream(err.to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an SDK error into a backend error with its full source chain.
fn backend_error<E>(err: E) -> GatewayError
where
    E: StdError,
{
    GatewayError::Backend(DisplayErrorContext(&err).to_string())
}

/// Formats an SDK timestamp as ISO-8601 with millisecond precision.
///
/// Milliseconds are always present (`2023-01-02T03:04:05.000Z`).
fn iso_timestamp(value: &DateTime) -> Option<String> {
    let whole_seconds = DateTime::from_secs(value.secs()).fmt(DateTimeFormat::DateTime).ok()?;
    let stem = whole_seconds.strip_suffix('Z')?;
    Some(format!("{stem}.{:03}Z", value.subsec_nanos() / 1_000_000))
}
