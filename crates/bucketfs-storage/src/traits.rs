use async_trait::async_trait;
use bucketfs_common::error::{FsError, Result};
use bucketfs_common::types::{ContainerInfo, ObjectInfo};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListObjectsResult {
    pub objects: Vec<ObjectInfo>,
    pub prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

impl ListObjectsResult {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.prefixes.len()
    }
}

/// Narrow client contract of a flat key/value object store.
///
/// Containers are the top-level namespace, objects are addressed by opaque
/// keys inside a container. Implementations perform no caching, every call
/// is a fresh round trip to the backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>>;
    async fn get_container(&self, container: &str) -> Result<ContainerInfo>;

    /// Creates `container`, returning the existing one when it is already there.
    async fn create_container(&self, container: &str) -> Result<ContainerInfo>;

    /// Lists objects whose keys start with `prefix`, ordered by key.
    ///
    /// Keys lexically `<= marker` are skipped. With a non-empty `delimiter`,
    /// keys containing the delimiter after the prefix are rolled up into
    /// `prefixes`. A `max_keys` of zero means no bound.
    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<ListObjectsResult>;

    async fn get_object_info(&self, container: &str, key: &str) -> Result<ObjectInfo>;
    async fn put_object(&self, container: &str, key: &str, data: Bytes) -> Result<ObjectInfo>;
    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes>;
    async fn delete_object(&self, container: &str, key: &str) -> Result<()>;

    async fn container_exists(&self, container: &str) -> Result<bool> {
        match self.get_container(container).await {
            Ok(_) => Ok(true),
            Err(FsError::ContainerNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn object_exists(&self, container: &str, key: &str) -> Result<bool> {
        match self.get_object_info(container, key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn object_length(&self, container: &str, key: &str) -> Result<u64> {
        Ok(self.get_object_info(container, key).await?.size)
    }

    async fn object_last_modified(&self, container: &str, key: &str) -> Result<DateTime<Utc>> {
        Ok(self.get_object_info(container, key).await?.last_modified)
    }
}
