use bucketfs_common::error::{FsError, Result};
use bytes::Bytes;
use tracing::debug;

use crate::context::FsContext;
use crate::path::{self, FsPath};
use crate::status::try_status_of;

/// Creates the directory `dir` (qualified).
///
/// Ancestors are checked nearest first and the walk stops at the first
/// existing directory; a file anywhere on the way fails with
/// `AlreadyExists`. Only the target itself is materialized, as a zero-length
/// marker object at its key plus a separator. Intermediate directories exist
/// implicitly through that marker's key prefix.
pub async fn mkdirs(ctx: &FsContext, dir: &FsPath) -> Result<bool> {
    match try_status_of(ctx, dir).await? {
        Some(status) if status.is_directory => return Ok(true),
        Some(_) => return Err(FsError::AlreadyExists(dir.to_string())),
        None => {}
    }

    ensure_no_file_ancestor(ctx, dir).await?;

    let container = ctx.container_of(dir);
    let store = ctx.store();
    if !store.container_exists(container).await? {
        debug!(container = %container, "creating container");
        store.create_container(container).await?;
    }

    let marker = path::dir_key(&path::to_key(dir));
    if !marker.is_empty() {
        debug!(container = %container, key = %marker, "writing directory marker");
        store.put_object(container, &marker, Bytes::new()).await?;
    }
    Ok(true)
}

/// Walks the ancestors of `path` nearest first, stopping at the first
/// directory. A file on the way fails with `AlreadyExists`.
pub(crate) async fn ensure_no_file_ancestor(ctx: &FsContext, path: &FsPath) -> Result<()> {
    for ancestor in path.ancestors() {
        match try_status_of(ctx, &ancestor).await? {
            Some(status) if status.is_directory => return Ok(()),
            Some(_) => return Err(FsError::AlreadyExists(ancestor.to_string())),
            None => continue,
        }
    }
    Ok(())
}
