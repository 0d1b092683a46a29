use bucketfs_common::error::{FsError, Result};
use bucketfs_common::time;
use tracing::debug;

use crate::context::FsContext;
use crate::path::{self, FsPath, SEPARATOR};
use crate::status::{FileStatus, path_error, status_of};

/// Immediate children of a qualified path.
///
/// Children are classified from the listing response itself: objects are
/// files, rolled-up common prefixes are directories. The directory's own
/// marker entry is skipped. Listing a file yields that file alone.
pub async fn list_children(ctx: &FsContext, dir: &FsPath) -> Result<Vec<FileStatus>> {
    let status = status_of(ctx, dir).await?;
    if status.is_file() {
        return Ok(vec![status]);
    }

    let container = ctx.container_of(dir);
    let prefix = path::dir_key(&path::to_key(dir));
    let delimiter = SEPARATOR.to_string();
    let mut marker = String::new();
    let mut children = Vec::new();

    loop {
        let page = match ctx
            .store()
            .list_objects(container, &prefix, &marker, &delimiter, ctx.list_page_size())
            .await
        {
            Ok(page) => page,
            Err(FsError::ContainerNotFound(_)) if dir.is_root() => break,
            Err(err) => return Err(path_error(err, dir)),
        };

        // Keys with empty segments (`d//x`) can collapse back onto `dir`.
        for object in page.objects.iter().filter(|object| object.key != prefix) {
            let child = path::key_to_path(dir, &object.key);
            if child != *dir {
                children.push(FileStatus::from_object(ctx, child, object));
            }
        }
        for common in &page.prefixes {
            let child = path::key_to_path(dir, common);
            if child != *dir {
                children.push(FileStatus::directory(ctx, child, time::unknown()));
            }
        }

        match page.next_marker {
            Some(next) if page.is_truncated => marker = next,
            _ => break,
        }
    }

    debug!(container = %container, prefix = %prefix, count = children.len(), "listed directory");
    Ok(children)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use bucketfs_common::error::FsError;
    use bucketfs_storage::memory::MemoryObjectStore;

    use super::list_children;
    use crate::path;
    use crate::status::tests::{context, context_with, path, put, test_config};

    fn keys(children: &[crate::status::FileStatus]) -> BTreeSet<String> {
        children.iter().map(|c| path::to_key(&c.path)).collect()
    }

    #[tokio::test]
    async fn lists_files_and_subdirectories_once() {
        let ctx = context().await;
        put(&ctx, "d/a", b"1").await;
        put(&ctx, "d/b", b"22").await;
        put(&ctx, "d/sub/x", b"3").await;
        put(&ctx, "d/sub/y", b"4").await;
        put(&ctx, "dz", b"sibling").await;

        let children = list_children(&ctx, &path("d")).await.unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(
            keys(&children),
            ["d/a", "d/b", "d/sub"].into_iter().map(String::from).collect()
        );

        let sub = children.iter().find(|c| c.path.name() == "sub").unwrap();
        assert!(sub.is_directory);
        let b = children.iter().find(|c| c.path.name() == "b").unwrap();
        assert!(b.is_file());
        assert_eq!(b.length, 2);
    }

    #[tokio::test]
    async fn never_includes_the_directory_itself() {
        let ctx = context().await;
        put(&ctx, "d/", b"").await;
        put(&ctx, "d/a", b"1").await;
        put(&ctx, "d/b", b"2").await;

        let children = list_children(&ctx, &path("d")).await.unwrap();
        assert_eq!(
            keys(&children),
            ["d/a", "d/b"].into_iter().map(String::from).collect()
        );
    }

    #[tokio::test]
    async fn empty_segment_keys_do_not_list_the_directory() {
        let ctx = context().await;
        put(&ctx, "d//x", b"1").await;
        put(&ctx, "d/a", b"2").await;

        let children = list_children(&ctx, &path("d")).await.unwrap();
        assert!(children.iter().all(|c| c.path != path("d")));
        assert_eq!(keys(&children), ["d/a"].into_iter().map(String::from).collect());
    }

    #[tokio::test]
    async fn empty_marked_directory_has_no_children() {
        let ctx = context().await;
        put(&ctx, "d/", b"").await;
        assert!(list_children(&ctx, &path("d")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_through_large_directories() {
        let mut config = test_config();
        config.list_page_size = 3;
        let ctx = context_with(Arc::new(MemoryObjectStore::new()), &config).await;
        for idx in 0..10 {
            ctx.store()
                .put_object(
                    crate::status::tests::CONTAINER,
                    &format!("d/f{idx:02}"),
                    bytes::Bytes::new(),
                )
                .await
                .unwrap();
        }
        put(&ctx, "d/nested/x", b"").await;

        let children = list_children(&ctx, &path("d")).await.unwrap();
        assert_eq!(children.len(), 11);
    }

    #[tokio::test]
    async fn listing_a_file_returns_the_file() {
        let ctx = context().await;
        put(&ctx, "f", b"abc").await;
        let children = list_children(&ctx, &path("f")).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].is_file());
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let ctx = context().await;
        assert!(matches!(
            list_children(&ctx, &path("nope")).await,
            Err(FsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn root_lists_top_level_entries() {
        let ctx = context().await;
        put(&ctx, "top", b"x").await;
        put(&ctx, "d/a", b"y").await;
        let children = list_children(&ctx, &path("")).await.unwrap();
        assert_eq!(
            keys(&children),
            ["d", "top"].into_iter().map(String::from).collect()
        );
    }
}
