use std::collections::BTreeSet;

use bucketfs_common::types::ObjectInfo;

use crate::traits::ListObjectsResult;

#[derive(Debug, Clone)]
enum ListEntry {
    Object(ObjectInfo),
    Prefix(String),
}

impl ListEntry {
    fn marker(&self) -> &str {
        match self {
            Self::Object(obj) => &obj.key,
            Self::Prefix(prefix) => prefix,
        }
    }
}

/// Applies prefix, marker, delimiter and page bound to a container's objects.
pub fn paginate<I>(
    objects: I,
    prefix: &str,
    marker: &str,
    delimiter: &str,
    max_keys: usize,
) -> ListObjectsResult
where
    I: IntoIterator<Item = ObjectInfo>,
{
    let mut entries = Vec::new();
    let mut prefixes = BTreeSet::new();

    for obj in objects.into_iter().filter(|obj| obj.key.starts_with(prefix)) {
        if delimiter.is_empty() {
            entries.push(ListEntry::Object(obj));
            continue;
        }

        let suffix = &obj.key[prefix.len()..];
        if let Some(idx) = suffix.find(delimiter) {
            prefixes.insert(format!("{}{}", prefix, &suffix[..idx + delimiter.len()]));
        } else {
            entries.push(ListEntry::Object(obj));
        }
    }

    entries.extend(prefixes.into_iter().map(ListEntry::Prefix));
    entries.retain(|entry| marker.is_empty() || entry.marker() > marker);
    entries.sort_by(|a, b| a.marker().cmp(b.marker()));

    let limit = if max_keys > 0 { max_keys } else { entries.len() };
    let is_truncated = entries.len() > limit;
    entries.truncate(limit);

    let next_marker = if is_truncated {
        entries.last().map(|entry| entry.marker().to_string())
    } else {
        None
    };

    let mut result = ListObjectsResult {
        is_truncated,
        next_marker,
        ..ListObjectsResult::default()
    };
    for entry in entries {
        match entry {
            ListEntry::Object(obj) => result.objects.push(obj),
            ListEntry::Prefix(prefix_value) => result.prefixes.push(prefix_value),
        }
    }
    result
}
