use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bucketfs_common::error::{FsError, Result};
use bucketfs_common::time;
use bucketfs_common::types::{ContainerInfo, ObjectInfo};
use bytes::Bytes;
use md5::{Digest, Md5};
use tokio::sync::RwLock;

use crate::credentials::{Connector, Credentials, StaticCredentialProvider};
use crate::listing::paginate;
use crate::traits::{ListObjectsResult, ObjectStore};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug)]
struct StoredObject {
    info: ObjectInfo,
    data: Bytes,
}

#[derive(Debug)]
struct Container {
    info: ContainerInfo,
    objects: BTreeMap<String, StoredObject>,
}

/// Process-local store keeping every container and object in memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    containers: RwLock<BTreeMap<String, Container>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let containers = self.containers.read().await;
        Ok(containers.values().map(|c| c.info.clone()).collect())
    }

    async fn get_container(&self, container: &str) -> Result<ContainerInfo> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .map(|c| c.info.clone())
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))
    }

    async fn create_container(&self, container: &str) -> Result<ContainerInfo> {
        validate_container_name(container)?;
        let mut containers = self.containers.write().await;
        let entry = containers
            .entry(container.to_string())
            .or_insert_with(|| Container {
                info: ContainerInfo {
                    name: container.to_string(),
                    created: time::now(),
                },
                objects: BTreeMap::new(),
            });
        Ok(entry.info.clone())
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<ListObjectsResult> {
        let containers = self.containers.read().await;
        let bucket = containers
            .get(container)
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))?;

        let objects = bucket
            .objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, stored)| stored.info.clone());
        Ok(paginate(objects, prefix, marker, delimiter, max_keys))
    }

    async fn get_object_info(&self, container: &str, key: &str) -> Result<ObjectInfo> {
        let containers = self.containers.read().await;
        let bucket = containers
            .get(container)
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))?;
        bucket
            .objects
            .get(key)
            .map(|stored| stored.info.clone())
            .ok_or_else(|| object_not_found(container, key))
    }

    async fn put_object(&self, container: &str, key: &str, data: Bytes) -> Result<ObjectInfo> {
        validate_object_key(key)?;
        let mut containers = self.containers.write().await;
        let bucket = containers
            .get_mut(container)
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))?;

        let info = ObjectInfo {
            container: container.to_string(),
            key: key.to_string(),
            size: data.len() as u64,
            etag: format!("{:x}", Md5::digest(&data)),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            last_modified: time::now(),
            metadata: HashMap::new(),
        };
        bucket.objects.insert(
            key.to_string(),
            StoredObject {
                info: info.clone(),
                data,
            },
        );
        Ok(info)
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes> {
        let containers = self.containers.read().await;
        let bucket = containers
            .get(container)
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))?;
        bucket
            .objects
            .get(key)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| object_not_found(container, key))
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let mut containers = self.containers.write().await;
        let bucket = containers
            .get_mut(container)
            .ok_or_else(|| FsError::ContainerNotFound(container.to_string()))?;
        bucket
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| object_not_found(container, key))
    }
}

/// Hands out one shared in-memory store to every authenticated session.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryObjectStore>,
    provider: StaticCredentialProvider,
}

impl MemoryConnector {
    pub fn new(provider: StaticCredentialProvider) -> Self {
        Self::with_store(Arc::new(MemoryObjectStore::new()), provider)
    }

    pub fn with_store(store: Arc<MemoryObjectStore>, provider: StaticCredentialProvider) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> Arc<MemoryObjectStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>> {
        self.provider.authenticate(credentials)?;
        let store: Arc<dyn ObjectStore> = self.store.clone();
        Ok(store)
    }
}

pub(crate) fn validate_container_name(container: &str) -> Result<()> {
    if container.is_empty() || container.contains('/') || container.contains('\\') {
        return Err(FsError::InvalidArgument(format!(
            "invalid container name: {container}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_object_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(FsError::InvalidArgument("object key must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn object_not_found(container: &str, key: &str) -> FsError {
    FsError::ObjectNotFound {
        container: container.to_string(),
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use bucketfs_common::error::FsError;
    use bytes::Bytes;

    use super::{MemoryConnector, MemoryObjectStore};
    use crate::credentials::{AuthMethod, Connector, Credentials, StaticCredentialProvider};
    use crate::traits::ObjectStore;

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let store = MemoryObjectStore::new();
        store.create_container("data").await.unwrap();

        let info = store
            .put_object("data", "logs/a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(info.size, 5);
        assert_eq!(store.object_length("data", "logs/a.txt").await.unwrap(), 5);
        assert_eq!(
            store.get_object("data", "logs/a.txt").await.unwrap(),
            Bytes::from_static(b"hello")
        );

        store.delete_object("data", "logs/a.txt").await.unwrap();
        assert!(!store.object_exists("data", "logs/a.txt").await.unwrap());
        assert!(matches!(
            store.delete_object("data", "logs/a.txt").await,
            Err(FsError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn create_container_is_idempotent() {
        let store = MemoryObjectStore::new();
        let first = store.create_container("data").await.unwrap();
        let second = store.create_container("data").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_containers().await.unwrap().len(), 1);
        assert!(!store.container_exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn missing_container_is_reported() {
        let store = MemoryObjectStore::new();
        let err = store.list_objects("nope", "", "", "", 0).await.unwrap_err();
        assert!(matches!(err, FsError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn connector_rejects_bad_credentials() {
        let connector = MemoryConnector::new(StaticCredentialProvider::new("alice", "secret"));
        let mut credentials = Credentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
            endpoint: "memory://".to_string(),
            tenant: None,
            domain: None,
            auth_method: AuthMethod::Basic,
        };
        assert!(connector.connect(&credentials).await.is_ok());

        credentials.password = "nope".to_string();
        assert!(matches!(
            connector.connect(&credentials).await,
            Err(FsError::AuthFailure(_))
        ));
    }
}
