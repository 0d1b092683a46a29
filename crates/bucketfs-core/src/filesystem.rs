use std::io::Write;

use bucketfs_common::error::{FsError, Result};
use bucketfs_storage::credentials::Connector;
use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use crate::config::FsConfig;
use crate::context::FsContext;
use crate::path::{self, FsPath};
use crate::status::{FileStatus, path_error, status_of, try_status_of};
use crate::{delete, listing, mkdirs, rename};

/// Hierarchical filesystem view of one object-store container.
#[derive(Debug, Clone)]
pub struct BucketFileSystem {
    ctx: FsContext,
}

impl BucketFileSystem {
    /// Authenticates against the backend and binds the session to the
    /// container named by `uri` (`scheme://container`).
    pub async fn initialize(uri: &str, config: &FsConfig, connector: &dyn Connector) -> Result<Self> {
        config.validate()?;
        let parsed: FsPath = uri.parse()?;
        let (Some(scheme), Some(container)) = (parsed.scheme(), parsed.container()) else {
            return Err(FsError::InvalidPath(format!(
                "{uri}: expected scheme://container"
            )));
        };
        let root = FsPath::root(scheme, container);

        let store = connector
            .connect(&config.credentials())
            .await
            .map_err(|err| match err {
                FsError::AuthFailure(_) => err,
                other => FsError::AuthFailure(other.to_string()),
            })?;

        info!(uri = %root, user = %config.username, "filesystem initialized");
        Ok(Self::from_context(FsContext::new(store, root, config)))
    }

    pub fn from_context(ctx: FsContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &FsContext {
        &self.ctx
    }

    pub fn uri(&self) -> &FsPath {
        self.ctx.uri()
    }

    pub fn working_directory(&self) -> &FsPath {
        self.ctx.working_dir()
    }

    /// The working directory is fixed for the lifetime of the filesystem.
    pub fn set_working_directory(&self, dir: &FsPath) -> Result<()> {
        Err(FsError::Unsupported(format!(
            "cannot change working directory to {dir}"
        )))
    }

    pub fn qualify(&self, path: &FsPath) -> FsPath {
        self.ctx.qualify(path)
    }

    pub async fn status(&self, path: &FsPath) -> Result<FileStatus> {
        status_of(&self.ctx, &self.qualify(path)).await
    }

    pub async fn exists(&self, path: &FsPath) -> Result<bool> {
        Ok(try_status_of(&self.ctx, &self.qualify(path)).await?.is_some())
    }

    pub async fn list_status(&self, path: &FsPath) -> Result<Vec<FileStatus>> {
        listing::list_children(&self.ctx, &self.qualify(path)).await
    }

    pub async fn mkdirs(&self, path: &FsPath) -> Result<bool> {
        mkdirs::mkdirs(&self.ctx, &self.qualify(path)).await
    }

    pub async fn delete(&self, path: &FsPath, recursive: bool) -> Result<bool> {
        delete::delete(&self.ctx, &self.qualify(path), recursive).await
    }

    pub async fn rename(&self, src: &FsPath, dst: &FsPath) -> Result<bool> {
        rename::rename(&self.ctx, &self.qualify(src), &self.qualify(dst)).await
    }

    /// Full contents of the file at `path`.
    pub async fn open(&self, path: &FsPath) -> Result<Bytes> {
        let path = self.qualify(path);
        let status = status_of(&self.ctx, &path).await?;
        if status.is_directory {
            return Err(FsError::IsDirectory(path.to_string()));
        }
        self.ctx
            .store()
            .get_object(self.ctx.container_of(&path), &path::to_key(&path))
            .await
            .map_err(|err| path_error(err, &path))
    }

    /// Starts a new file at `path`; nothing is stored until [`FsWriter::close`].
    pub async fn create(&self, path: &FsPath, overwrite: bool) -> Result<FsWriter> {
        let path = self.qualify(path);
        if path.is_root() {
            return Err(FsError::IsDirectory(path.to_string()));
        }

        match try_status_of(&self.ctx, &path).await? {
            Some(status) if status.is_directory => {
                return Err(FsError::IsDirectory(path.to_string()));
            }
            Some(_) if !overwrite => return Err(FsError::AlreadyExists(path.to_string())),
            _ => {}
        }

        mkdirs::ensure_no_file_ancestor(&self.ctx, &path).await?;

        debug!(path = %path, overwrite, "opened writer");
        Ok(FsWriter {
            ctx: self.ctx.clone(),
            path,
            buffer: BytesMut::new(),
        })
    }

    pub async fn append(&self, path: &FsPath) -> Result<FsWriter> {
        Err(FsError::Unsupported(format!("append to {path}")))
    }
}

/// Buffers a file's bytes and uploads them as one object on close.
#[derive(Debug)]
pub struct FsWriter {
    ctx: FsContext,
    path: FsPath,
    buffer: BytesMut,
}

impl FsWriter {
    pub fn path(&self) -> &FsPath {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Uploads the buffered bytes, creating the container when missing.
    pub async fn close(self) -> Result<FileStatus> {
        let container = self.ctx.container_of(&self.path);
        let key = path::to_key(&self.path);
        let store = self.ctx.store();

        if !store.container_exists(container).await? {
            debug!(container = %container, "creating container");
            store.create_container(container).await?;
        }

        let object = store
            .put_object(container, &key, self.buffer.freeze())
            .await?;
        debug!(container = %container, key = %key, size = object.size, "uploaded file");
        Ok(FileStatus::from_object(&self.ctx, self.path.clone(), &object))
    }
}

impl Write for FsWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
