//! Move semantics over a store that only knows copy and delete.
//!
//! Every object is moved by download, upload under the new key, then delete
//! of the old key. Nothing is rolled back: a failure after the upload leaves
//! the object under both keys, and a subtree move that fails partway leaves
//! the subtree split between the old and the new location.

use bucketfs_common::error::{FsError, Result};
use tracing::{debug, warn};

use crate::context::FsContext;
use crate::path::{self, FsPath};
use crate::status::{path_error, status_of, try_status_of};

/// Moves `src` to `dst`, both qualified.
///
/// When `dst` is an existing directory `src` is moved inside it, otherwise
/// `src` takes the name `dst` and the parent of `dst` must be a directory.
/// Returns `false` for moves that are refused.
pub async fn rename(ctx: &FsContext, src: &FsPath, dst: &FsPath) -> Result<bool> {
    if src.is_root() {
        debug!(src = %src, "refusing to rename the root");
        return Ok(false);
    }
    if src.container() != dst.container() {
        debug!(src = %src, dst = %dst, "refusing to rename across containers");
        return Ok(false);
    }
    if src.is_ancestor_of(dst) {
        debug!(src = %src, dst = %dst, "refusing to rename into own subtree");
        return Ok(false);
    }

    let src_status = status_of(ctx, src).await?;
    if src == dst {
        return Ok(true);
    }

    let src_key = path::to_key(src);
    let dst_key = path::to_key(dst);
    let target_key = match try_status_of(ctx, dst).await? {
        Some(status) if status.is_directory => path::join_key(&dst_key, path::basename(&src_key)),
        Some(_) => {
            debug!(dst = %dst, "destination file already exists");
            return Ok(false);
        }
        None => {
            let parent = dst.parent().unwrap_or_else(|| ctx.uri().clone());
            if !status_of(ctx, &parent).await?.is_directory {
                debug!(dst = %dst, "destination parent is a file");
                return Ok(false);
            }
            dst_key
        }
    };

    if target_key == src_key {
        return Ok(true);
    }

    let container = ctx.container_of(src);
    if src_status.is_directory {
        copy_subtree(ctx, container, &src_key, &target_key).await?;
    } else {
        move_object(ctx, container, &src_key, &target_key)
            .await
            .map_err(|err| path_error(err, src))?;
    }
    Ok(true)
}

/// Moves every object below `src_key` under `dst_key`.
///
/// At most `rename_batch_limit` descendants are moved; a larger subtree is
/// rejected with `CapacityExceeded` before any object is touched.
async fn copy_subtree(ctx: &FsContext, container: &str, src_key: &str, dst_key: &str) -> Result<()> {
    let src_prefix = path::dir_key(src_key);
    let dst_prefix = path::dir_key(dst_key);
    let limit = ctx.rename_batch_limit();

    let listing = ctx
        .store()
        .list_objects(container, &src_prefix, "", "", limit.saturating_add(1))
        .await?;
    if listing.objects.len() > limit {
        return Err(FsError::CapacityExceeded {
            prefix: src_prefix,
            limit,
        });
    }

    for (moved, object) in listing.objects.iter().enumerate() {
        let relative = &object.key[src_prefix.len()..];
        let target = format!("{dst_prefix}{relative}");
        if let Err(err) = move_object(ctx, container, &object.key, &target).await {
            warn!(
                container = %container,
                src = %src_prefix,
                dst = %dst_prefix,
                moved,
                total = listing.objects.len(),
                error = %err,
                "subtree rename interrupted; objects are split between source and destination"
            );
            return Err(err);
        }
    }
    Ok(())
}

async fn move_object(ctx: &FsContext, container: &str, src_key: &str, dst_key: &str) -> Result<()> {
    let store = ctx.store();

    debug!(container = %container, key = %src_key, "downloading rename source");
    let data = store.get_object(container, src_key).await?;

    debug!(container = %container, key = %dst_key, size = data.len(), "uploading rename target");
    store.put_object(container, dst_key, data).await?;

    if let Err(err) = store.delete_object(container, src_key).await {
        warn!(
            container = %container,
            src = %src_key,
            dst = %dst_key,
            error = %err,
            "rename copied object but failed to delete source; object now exists twice"
        );
        return Err(err);
    }
    Ok(())
}
