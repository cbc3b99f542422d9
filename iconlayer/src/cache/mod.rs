//! Image cache capability boundary.
//!
//! Resolved images are cached under a logical key (an icon file path, or
//! an `asset_sprite` composite) so repeat resolutions skip the network and
//! the decoder entirely. The [`ImageCache`] trait is dyn-compatible: it
//! uses `Pin<Box<dyn Future>>` so providers can hold any backend as
//! `Arc<dyn ImageCache>`.
//!
//! # Contract
//!
//! - [`ImageCache::get_cached`] is synchronous and best-effort: it must
//!   never block and never fail, and a miss is not authoritative.
//! - [`ImageCache::get_image`] is the authoritative async lookup; backend
//!   errors are treated as misses.
//! - [`ImageCache::save_image`] persists a bitmap and returns a URL a UI
//!   layer can use directly.

mod disk;
mod memory;
mod noop;

pub use disk::DiskImageCache;
pub use memory::MemoryImageCache;
pub use noop::NoopImageCache;

use std::future::Future;
use std::pin::Pin;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::decode::RawBitmap;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while persisting images.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bitmap could not be encoded for storage.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Pluggable storage for resolved images.
pub trait ImageCache: Send + Sync {
    /// Synchronous, best-effort lookup. Never blocks and never fails.
    fn get_cached(&self, key: &str) -> Option<String>;

    /// Authoritative cache lookup.
    fn get_image<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<String>>;

    /// Persists a bitmap under `key` and returns its display URL.
    fn save_image<'a>(
        &'a self,
        key: &'a str,
        bitmap: &'a RawBitmap,
    ) -> BoxFuture<'a, Result<String, CacheError>>;
}

/// Encodes a bitmap as a `data:image/png;base64,` URI.
pub(crate) fn png_data_uri(bitmap: &RawBitmap) -> Result<String, CacheError> {
    let png = bitmap
        .encode_png()
        .map_err(|e| CacheError::Encode(e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_data_uri_prefix() {
        let bitmap = RawBitmap {
            width: 1,
            height: 1,
            data: vec![255, 255, 255, 255],
        };
        let uri = png_data_uri(&bitmap).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > "data:image/png;base64,".len());
    }

    #[test]
    fn test_png_data_uri_rejects_bad_buffer() {
        let bitmap = RawBitmap {
            width: 4,
            height: 4,
            data: vec![0; 2],
        };
        assert!(matches!(png_data_uri(&bitmap), Err(CacheError::Encode(_))));
    }
}
