use bucketfs_common::error::{FsError, Result};
use tracing::{debug, warn};

use crate::context::FsContext;
use crate::path::{self, FsPath};
use crate::status::status_of;

/// Deletes a qualified path.
///
/// Backend failures are logged and reported as `Ok(false)` rather than
/// propagated. A directory with contents is only removed when `recursive`
/// is set; otherwise `DirectoryNotEmpty` is returned and nothing is deleted.
/// The root is never deleted.
pub async fn delete(ctx: &FsContext, target: &FsPath, recursive: bool) -> Result<bool> {
    if target.is_root() {
        warn!(path = %target, "refusing to delete the root");
        return Ok(false);
    }

    let status = match status_of(ctx, target).await {
        Ok(status) => status,
        Err(err) if err.is_not_found() => return Ok(false),
        Err(err) => {
            warn!(path = %target, error = %err, "failed to resolve path for delete");
            return Ok(false);
        }
    };

    let container = ctx.container_of(target);
    let key = path::to_key(target);
    if status.is_file() {
        return Ok(delete_key(ctx, container, &key).await);
    }

    let prefix = path::dir_key(&key);
    let keys = match descendant_keys(ctx, container, &prefix).await {
        Ok(keys) => keys,
        Err(err) => {
            warn!(path = %target, error = %err, "failed to list directory for delete");
            return Ok(false);
        }
    };

    let (markers, contents): (Vec<String>, Vec<String>) =
        keys.into_iter().partition(|k| *k == prefix);
    if !contents.is_empty() && !recursive {
        return Err(FsError::DirectoryNotEmpty(target.to_string()));
    }

    debug!(path = %target, objects = contents.len(), "deleting directory");
    for key in contents.iter().chain(markers.iter()) {
        if !delete_key(ctx, container, key).await {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn descendant_keys(ctx: &FsContext, container: &str, prefix: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut marker = String::new();
    loop {
        let page = ctx
            .store()
            .list_objects(container, prefix, &marker, "", ctx.list_page_size())
            .await?;
        keys.extend(page.objects.into_iter().map(|object| object.key));
        match page.next_marker {
            Some(next) if page.is_truncated => marker = next,
            _ => return Ok(keys),
        }
    }
}

async fn delete_key(ctx: &FsContext, container: &str, key: &str) -> bool {
    match ctx.store().delete_object(container, key).await {
        Ok(()) => true,
        Err(err) => {
            warn!(container = %container, key = %key, error = %err, "failed to delete object");
            false
        }
    }
}
