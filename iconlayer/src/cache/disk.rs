//! Disk-backed image cache.
//!
//! Each bitmap is stored as a PNG file under the cache directory and the
//! file path doubles as the display URL. A `DashMap` index of keys seen
//! this session backs the synchronous best-effort lookup; the filesystem
//! stays authoritative for `get_image`, so images saved by earlier runs
//! are found again.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use super::{BoxFuture, CacheError, ImageCache};
use crate::decode::RawBitmap;

/// Disk image cache rooted at a directory.
pub struct DiskImageCache {
    directory: PathBuf,
    index: DashMap<String, String>,
}

impl DiskImageCache {
    /// Opens (creating if needed) a cache rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            index: DashMap::new(),
        })
    }

    /// Opens the cache under the platform cache directory, e.g.
    /// `~/.cache/iconlayer/images` on Linux.
    pub fn in_user_cache_dir() -> Result<Self, CacheError> {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("iconlayer").join("images"))
    }

    /// Root directory of this cache.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.png", sanitize_key(key)))
    }
}

/// Flattens a logical key into a single safe file name.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

impl ImageCache for DiskImageCache {
    fn get_cached(&self, key: &str) -> Option<String> {
        self.index.get(key).map(|entry| entry.value().clone())
    }

    fn get_image<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            if let Some(url) = self.get_cached(key) {
                return Some(url);
            }

            let path = self.path_for(key);
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    let url = path.to_string_lossy().into_owned();
                    self.index.insert(key.to_string(), url.clone());
                    Some(url)
                }
                _ => None,
            }
        })
    }

    fn save_image<'a>(
        &'a self,
        key: &'a str,
        bitmap: &'a RawBitmap,
    ) -> BoxFuture<'a, Result<String, CacheError>> {
        Box::pin(async move {
            let png = bitmap
                .encode_png()
                .map_err(|e| CacheError::Encode(e.to_string()))?;

            let path = self.path_for(key);
            tokio::fs::write(&path, png).await?;

            let url = path.to_string_lossy().into_owned();
            self.index.insert(key.to_string(), url.clone());
            Ok(url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap() -> RawBitmap {
        RawBitmap {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 255, 0, 255],
        }
    }

    #[test]
    fn test_sanitize_key_flattens_paths() {
        assert_eq!(
            sanitize_key("/crew_icons/cm_kirk.png"),
            "_crew_icons_cm_kirk.png"
        );
        assert_eq!(sanitize_key("atlas_icons_node"), "atlas_icons_node");
    }

    #[tokio::test]
    async fn test_save_then_get_image() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskImageCache::new(dir.path()).unwrap();

        assert_eq!(cache.get_image("ship_icons/uss_enterprise").await, None);

        let url = cache
            .save_image("ship_icons/uss_enterprise", &bitmap())
            .await
            .unwrap();
        assert!(url.ends_with(".png"));
        assert!(std::path::Path::new(&url).exists());

        assert_eq!(
            cache.get_image("ship_icons/uss_enterprise").await,
            Some(url)
        );
    }

    #[tokio::test]
    async fn test_files_survive_a_new_session() {
        let dir = tempfile::tempdir().unwrap();

        let first = DiskImageCache::new(dir.path()).unwrap();
        let url = first.save_image("faction/icon_federation", &bitmap()).await.unwrap();
        drop(first);

        // A fresh instance has an empty index but the file is still there.
        let second = DiskImageCache::new(dir.path()).unwrap();
        assert_eq!(second.get_cached("faction/icon_federation"), None);
        assert_eq!(
            second.get_image("faction/icon_federation").await,
            Some(url.clone())
        );
        // The authoritative lookup warms the best-effort index.
        assert_eq!(second.get_cached("faction/icon_federation"), Some(url));
    }
}
