use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bucketfs_common::error::{FsError, Result};
use bucketfs_common::types::{ContainerInfo, ObjectInfo};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::credentials::{Connector, Credentials, StaticCredentialProvider};
use crate::listing::paginate;
use crate::memory::{object_not_found, validate_container_name, validate_object_key};
use crate::traits::{ListObjectsResult, ObjectStore};

const META_SUFFIX: &str = ".meta";
const PART_SUFFIX: &str = ".part";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
/// Leads the file name of keys whose encoding is too long. Never produced by
/// [`encode_key`], because `~` is always escaped.
const HASHED_PREFIX: char = '~';
/// Longest encoded key used verbatim as a file name. Keeps every name, suffix
/// included, under the usual 255-byte `NAME_MAX`.
const MAX_ENCODED_NAME: usize = 200;
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'=');

/// Store backed by a local directory.
///
/// Each container is a directory under `root_dir`. Each object is a pair of
/// flat files: a JSON metadata file named after the percent-encoded key and
/// a data part referenced from it. Keys whose encoding would overflow a file
/// name are stored under the md5 of the key instead, and the metadata file
/// records the key itself.
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectMeta {
    version: String,
    #[serde(default)]
    key: String,
    data_file: String,
    size: u64,
    etag: String,
    content_type: String,
    mod_time: DateTime<Utc>,
    metadata: HashMap<String, String>,
}

impl ObjectMeta {
    fn into_info(self, container: &str, key: &str) -> ObjectInfo {
        ObjectInfo {
            container: container.to_string(),
            key: key.to_string(),
            size: self.size,
            etag: self.etag,
            content_type: self.content_type,
            last_modified: self.mod_time,
            metadata: self.metadata,
        }
    }
}

impl DiskObjectStore {
    pub async fn new(root_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root_dir).await?;
        Ok(Self { root_dir })
    }

    fn container_path(&self, container: &str) -> PathBuf {
        self.root_dir.join(container)
    }

    fn meta_path(&self, container: &str, key: &str) -> PathBuf {
        self.container_path(container)
            .join(format!("{}{META_SUFFIX}", meta_stem(key)))
    }

    async fn ensure_container(&self, container: &str) -> Result<PathBuf> {
        validate_container_name(container)?;
        let path = self.container_path(container);
        if !is_existing_directory(&path).await? {
            return Err(FsError::ContainerNotFound(container.to_string()));
        }
        Ok(path)
    }

    async fn read_meta(&self, container: &str, key: &str) -> Result<ObjectMeta> {
        self.ensure_container(container).await?;
        let meta_bytes = match fs::read(self.meta_path(container, key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(object_not_found(container, key));
            }
            Err(err) => return Err(FsError::Io(err)),
        };
        let meta: ObjectMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|err| FsError::Internal(format!("failed to parse object metadata: {err}")))?;
        if !meta.key.is_empty() && meta.key != key {
            return Err(object_not_found(container, key));
        }
        Ok(meta)
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut entries = fs::read_dir(&self.root_dir).await?;
        let mut containers = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_dir() {
                continue;
            }
            containers.push(ContainerInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                created: created_time(&metadata),
            });
        }

        containers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(containers)
    }

    async fn get_container(&self, container: &str) -> Result<ContainerInfo> {
        let path = self.ensure_container(container).await?;
        let metadata = fs::metadata(&path).await?;
        Ok(ContainerInfo {
            name: container.to_string(),
            created: created_time(&metadata),
        })
    }

    async fn create_container(&self, container: &str) -> Result<ContainerInfo> {
        validate_container_name(container)?;
        fs::create_dir_all(self.container_path(container)).await?;
        self.get_container(container).await
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: usize,
    ) -> Result<ListObjectsResult> {
        let container_path = self.ensure_container(container).await?;
        let mut entries = fs::read_dir(&container_path).await?;
        let mut objects = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(stem) = file_name.strip_suffix(META_SUFFIX) else {
                continue;
            };
            let hashed = stem.starts_with(HASHED_PREFIX);
            let decoded = if hashed { None } else { decode_key(stem) };
            if !hashed && decoded.is_none() {
                debug!(container = %container, file = %file_name, "skipping undecodable entry");
                continue;
            }
            if decoded.as_deref().is_some_and(|key| !key.starts_with(prefix)) {
                continue;
            }

            let meta_bytes = fs::read(entry.path()).await?;
            let meta: ObjectMeta = serde_json::from_slice(&meta_bytes).map_err(|err| {
                FsError::Internal(format!("failed to parse object metadata during list: {err}"))
            })?;
            let key = match decoded {
                Some(key) => key,
                None => meta.key.clone(),
            };
            if key.is_empty() || !key.starts_with(prefix) {
                continue;
            }
            objects.push(meta.into_info(container, &key));
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(paginate(objects, prefix, marker, delimiter, max_keys))
    }

    async fn get_object_info(&self, container: &str, key: &str) -> Result<ObjectInfo> {
        Ok(self.read_meta(container, key).await?.into_info(container, key))
    }

    async fn put_object(&self, container: &str, key: &str, data: Bytes) -> Result<ObjectInfo> {
        validate_object_key(key)?;
        let container_path = self.ensure_container(container).await?;
        let previous = match self.read_meta(container, key).await {
            Ok(meta) => Some(meta.data_file),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let data_file = format!("{}{PART_SUFFIX}", Uuid::new_v4());
        let meta = ObjectMeta {
            version: "1.0".to_string(),
            key: key.to_string(),
            data_file: data_file.clone(),
            size: data.len() as u64,
            etag: format!("{:x}", Md5::digest(&data)),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            mod_time: Utc::now(),
            metadata: HashMap::new(),
        };

        fs::write(container_path.join(&data_file), data).await?;
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|err| FsError::Internal(format!("failed to serialize object metadata: {err}")))?;
        fs::write(self.meta_path(container, key), meta_json).await?;

        if let Some(old) = previous {
            remove_if_present(&container_path.join(old)).await?;
        }

        Ok(meta.into_info(container, key))
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Bytes> {
        let meta = self.read_meta(container, key).await?;
        let data = fs::read(self.container_path(container).join(meta.data_file))
            .await
            .map_err(|_| object_not_found(container, key))?;
        Ok(Bytes::from(data))
    }

    async fn delete_object(&self, container: &str, key: &str) -> Result<()> {
        let meta = self.read_meta(container, key).await?;
        fs::remove_file(self.meta_path(container, key)).await?;
        remove_if_present(&self.container_path(container).join(meta.data_file)).await
    }
}

/// Opens a [`DiskObjectStore`] rooted at a fixed directory for authenticated users.
#[derive(Debug, Clone)]
pub struct DiskConnector {
    root_dir: PathBuf,
    provider: StaticCredentialProvider,
}

impl DiskConnector {
    pub fn new(root_dir: impl Into<PathBuf>, provider: StaticCredentialProvider) -> Self {
        Self {
            root_dir: root_dir.into(),
            provider,
        }
    }
}

#[async_trait]
impl Connector for DiskConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>> {
        self.provider.authenticate(credentials)?;
        let store: Arc<dyn ObjectStore> = Arc::new(DiskObjectStore::new(self.root_dir.clone()).await?);
        Ok(store)
    }
}

fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ENCODE_SET).to_string()
}

fn meta_stem(key: &str) -> String {
    let encoded = encode_key(key);
    if encoded.len() <= MAX_ENCODED_NAME {
        encoded
    } else {
        format!("{HASHED_PREFIX}{:x}", Md5::digest(key.as_bytes()))
    }
}

fn decode_key(encoded: &str) -> Option<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

async fn is_existing_directory(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(FsError::Io(err)),
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(FsError::Io(err)),
    }
}

fn created_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use bucketfs_common::error::FsError;
    use bytes::Bytes;
    use uuid::Uuid;

    use super::{DiskObjectStore, MAX_ENCODED_NAME, decode_key, encode_key, meta_stem};
    use crate::traits::ObjectStore;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("bucketfs-disk-{}", Uuid::new_v4()))
    }

    #[test]
    fn key_encoding_keeps_markers_distinct() {
        assert_ne!(encode_key("a"), encode_key("a/"));
        assert_eq!(encode_key("part-0_v=1.csv"), "part-0_v=1.csv");
        assert!(encode_key("a~b").contains("%7E"));
        assert_eq!(decode_key(&encode_key("dir/file name.txt")).as_deref(), Some("dir/file name.txt"));
    }

    #[tokio::test]
    async fn objects_survive_reopen() {
        let root = scratch_dir();
        let store = DiskObjectStore::new(root.clone()).await.unwrap();
        store.create_container("data").await.unwrap();
        store
            .put_object("data", "dir/", Bytes::new())
            .await
            .unwrap();
        store
            .put_object("data", "dir/part-0", Bytes::from_static(b"rows"))
            .await
            .unwrap();

        let reopened = DiskObjectStore::new(root.clone()).await.unwrap();
        let listing = reopened.list_objects("data", "dir/", "", "", 0).await.unwrap();
        let keys: Vec<_> = listing.objects.iter().map(|obj| obj.key.as_str()).collect();
        assert_eq!(keys, vec!["dir/", "dir/part-0"]);
        assert_eq!(
            reopened.get_object("data", "dir/part-0").await.unwrap(),
            Bytes::from_static(b"rows")
        );

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_replaces_data_and_delete_removes_it() {
        let root = scratch_dir();
        let store = DiskObjectStore::new(root.clone()).await.unwrap();
        store.create_container("data").await.unwrap();

        store.put_object("data", "k", Bytes::from_static(b"one")).await.unwrap();
        store.put_object("data", "k", Bytes::from_static(b"three")).await.unwrap();
        assert_eq!(store.object_length("data", "k").await.unwrap(), 5);

        store.delete_object("data", "k").await.unwrap();
        assert!(matches!(
            store.get_object("data", "k").await,
            Err(FsError::ObjectNotFound { .. })
        ));

        let mut entries = tokio::fs::read_dir(root.join("data")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn long_keys_fit_in_a_file_name() {
        let root = scratch_dir();
        let store = DiskObjectStore::new(root.clone()).await.unwrap();
        store.create_container("data").await.unwrap();

        let key = format!("dir/{}", "x".repeat(200));
        assert!(encode_key(&key).len() > MAX_ENCODED_NAME);
        assert!(meta_stem(&key).len() < MAX_ENCODED_NAME);

        store
            .put_object("data", &key, Bytes::from_static(b"long"))
            .await
            .unwrap();
        store
            .put_object("data", "dir/short", Bytes::from_static(b"short"))
            .await
            .unwrap();
        assert_eq!(store.get_object("data", &key).await.unwrap(), Bytes::from_static(b"long"));
        assert_eq!(store.get_object_info("data", &key).await.unwrap().key, key);

        let listing = store.list_objects("data", "dir/", "", "", 0).await.unwrap();
        let keys: Vec<_> = listing.objects.iter().map(|obj| obj.key.as_str()).collect();
        assert_eq!(keys, vec!["dir/short", key.as_str()]);

        let mut entries = tokio::fs::read_dir(root.join("data")).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(entry.file_name().len() <= 255);
        }

        store.delete_object("data", &key).await.unwrap();
        assert!(!store.object_exists("data", &key).await.unwrap());

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn missing_container_is_reported() {
        let root = scratch_dir();
        let store = DiskObjectStore::new(root.clone()).await.unwrap();
        assert!(matches!(
            store.get_container("nope").await,
            Err(FsError::ContainerNotFound(_))
        ));
        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
