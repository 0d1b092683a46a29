//! Classification of a path as file, directory or nothing.
//!
//! There is no directory primitive in the backend: a path is a directory
//! exactly when objects exist under its key followed by a separator.

use bucketfs_common::error::{FsError, Result};
use bucketfs_common::time;
use bucketfs_common::types::ObjectInfo;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::FsContext;
use crate::path::{self, FsPath};

/// Upper bound of the existence probe issued at a key.
const EXISTENCE_PROBE_LIMIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: FsPath,
    pub length: u64,
    pub modification_time: DateTime<Utc>,
    pub block_size: u64,
    pub owner: String,
    pub is_directory: bool,
}

impl FileStatus {
    /// Directories always report a length of zero.
    pub fn directory(ctx: &FsContext, path: FsPath, modification_time: DateTime<Utc>) -> Self {
        Self {
            path,
            length: 0,
            modification_time,
            block_size: ctx.block_size(),
            owner: ctx.username().to_string(),
            is_directory: true,
        }
    }

    pub fn file(
        ctx: &FsContext,
        path: FsPath,
        length: u64,
        modification_time: DateTime<Utc>,
    ) -> Self {
        Self {
            path,
            length,
            modification_time,
            block_size: ctx.block_size(),
            owner: ctx.username().to_string(),
            is_directory: false,
        }
    }

    pub(crate) fn from_object(ctx: &FsContext, path: FsPath, object: &ObjectInfo) -> Self {
        Self::file(ctx, path, object.size, object.last_modified)
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// Resolves the status of a qualified path.
///
/// A file's length and modification time come from two separate backend
/// calls. A concurrent overwrite between them can mix values from two
/// versions of the object.
pub async fn status_of(ctx: &FsContext, path: &FsPath) -> Result<FileStatus> {
    let key = path::to_key(path);
    if key.is_empty() {
        return Ok(FileStatus::directory(ctx, path.clone(), time::unknown()));
    }

    let container = ctx.container_of(path);
    let store = ctx.store();

    let probe = store
        .list_objects(container, &key, "", "", EXISTENCE_PROBE_LIMIT)
        .await
        .map_err(|err| path_error(err, path))?;
    let Some(first) = probe.objects.first() else {
        return Err(FsError::NotFound(path.to_string()));
    };

    let children = store
        .list_objects(container, &path::dir_key(&key), "", "", 1)
        .await
        .map_err(|err| path_error(err, path))?;
    if !children.is_empty() {
        debug!(container = %container, key = %key, "resolved directory");
        return Ok(FileStatus::directory(ctx, path.clone(), first.last_modified));
    }

    let length = store
        .object_length(container, &key)
        .await
        .map_err(|err| path_error(err, path))?;
    let modified = store
        .object_last_modified(container, &key)
        .await
        .map_err(|err| path_error(err, path))?;
    Ok(FileStatus::file(ctx, path.clone(), length, modified))
}

/// Rewrites backend "missing" errors as a missing path.
pub(crate) fn path_error(err: FsError, path: &FsPath) -> FsError {
    if err.is_not_found() {
        FsError::NotFound(path.to_string())
    } else {
        err
    }
}

/// `Ok(None)` when the path does not exist.
pub(crate) async fn try_status_of(ctx: &FsContext, path: &FsPath) -> Result<Option<FileStatus>> {
    match status_of(ctx, path).await {
        Ok(status) => Ok(Some(status)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use bucketfs_common::error::FsError;
    use bucketfs_storage::memory::MemoryObjectStore;
    use bucketfs_storage::traits::ObjectStore;
    use bytes::Bytes;
    use url::Url;

    use super::status_of;
    use crate::config::FsConfig;
    use crate::context::FsContext;
    use crate::path::FsPath;

    pub(crate) const CONTAINER: &str = "data";

    pub(crate) fn test_config() -> FsConfig {
        FsConfig::new(
            "alice",
            "secret",
            Url::parse("http://localhost:8080").unwrap(),
        )
    }

    pub(crate) async fn context_with(store: Arc<dyn ObjectStore>, config: &FsConfig) -> FsContext {
        store.create_container(CONTAINER).await.unwrap();
        FsContext::new(store, FsPath::root("bucketfs", CONTAINER), config)
    }

    pub(crate) async fn context() -> FsContext {
        context_with(Arc::new(MemoryObjectStore::new()), &test_config()).await
    }

    pub(crate) async fn put(ctx: &FsContext, key: &str, data: &'static [u8]) {
        ctx.store()
            .put_object(CONTAINER, key, Bytes::from_static(data))
            .await
            .unwrap();
    }

    pub(crate) fn path(key: &str) -> FsPath {
        format!("bucketfs://{CONTAINER}/{key}").parse().unwrap()
    }

    #[tokio::test]
    async fn root_is_a_directory() {
        let ctx = context().await;
        let status = status_of(&ctx, &path("")).await.unwrap();
        assert!(status.is_directory);
        assert_eq!(status.length, 0);
        assert_eq!(status.owner, "alice");
    }

    #[tokio::test]
    async fn root_of_missing_container_is_not_queried() {
        let store = Arc::new(MemoryObjectStore::new());
        let ctx = FsContext::new(store, FsPath::root("bucketfs", "absent"), &test_config());
        assert!(status_of(&ctx, ctx.uri()).await.unwrap().is_directory);
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let ctx = context().await;
        put(&ctx, "other", b"x").await;
        let err = status_of(&ctx, &path("nothing/here")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn sibling_with_shared_prefix_does_not_make_a_path_exist() {
        let ctx = context().await;
        put(&ctx, "abc", b"x").await;
        let err = status_of(&ctx, &path("ab")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn file_reports_length_and_time() {
        let ctx = context().await;
        put(&ctx, "logs/a.txt", b"hello").await;
        let status = status_of(&ctx, &path("logs/a.txt")).await.unwrap();
        assert!(status.is_file());
        assert_eq!(status.length, 5);
        assert_eq!(status.block_size, ctx.block_size());

        let info = ctx.store().get_object_info(CONTAINER, "logs/a.txt").await.unwrap();
        assert_eq!(status.modification_time, info.last_modified);
    }

    #[tokio::test]
    async fn implicit_directory_has_zero_length_and_first_entry_time() {
        let ctx = context().await;
        put(&ctx, "logs/a.txt", b"hello").await;
        put(&ctx, "logs/b.txt", b"world!").await;

        let status = status_of(&ctx, &path("logs")).await.unwrap();
        assert!(status.is_directory);
        assert_eq!(status.length, 0);

        let first = ctx.store().get_object_info(CONTAINER, "logs/a.txt").await.unwrap();
        assert_eq!(status.modification_time, first.last_modified);
    }

    #[tokio::test]
    async fn marker_alone_makes_a_directory() {
        let ctx = context().await;
        put(&ctx, "empty/", b"").await;
        assert!(status_of(&ctx, &path("empty")).await.unwrap().is_directory);
    }
}
