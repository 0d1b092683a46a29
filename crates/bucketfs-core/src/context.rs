use std::sync::Arc;

use bucketfs_storage::traits::ObjectStore;

use crate::config::FsConfig;
use crate::path::{self, FsPath};

/// Session state fixed at initialization and shared read-only by every
/// operation.
#[derive(Clone)]
pub struct FsContext {
    store: Arc<dyn ObjectStore>,
    uri: FsPath,
    working_dir: FsPath,
    username: String,
    block_size: u64,
    list_page_size: usize,
    rename_batch_limit: usize,
}

impl FsContext {
    /// `uri` is the container root the session is bound to.
    pub fn new(store: Arc<dyn ObjectStore>, uri: FsPath, config: &FsConfig) -> Self {
        let working_dir = uri.child("user").child(&config.username);
        Self {
            store,
            uri,
            working_dir,
            username: config.username.clone(),
            block_size: config.block_size,
            list_page_size: config.list_page_size,
            rename_batch_limit: config.rename_batch_limit,
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn shared_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    pub fn uri(&self) -> &FsPath {
        &self.uri
    }

    pub fn working_dir(&self) -> &FsPath {
        &self.working_dir
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn list_page_size(&self) -> usize {
        self.list_page_size
    }

    pub fn rename_batch_limit(&self) -> usize {
        self.rename_batch_limit
    }

    pub fn qualify(&self, path: &FsPath) -> FsPath {
        path::qualify(path, &self.working_dir)
    }

    /// Container addressed by a qualified path.
    pub fn container_of<'a>(&'a self, path: &'a FsPath) -> &'a str {
        path.container()
            .or_else(|| self.uri.container())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for FsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsContext")
            .field("uri", &self.uri.to_string())
            .field("working_dir", &self.working_dir.to_string())
            .field("username", &self.username)
            .field("block_size", &self.block_size)
            .field("list_page_size", &self.list_page_size)
            .field("rename_batch_limit", &self.rename_batch_limit)
            .finish_non_exhaustive()
    }
}
