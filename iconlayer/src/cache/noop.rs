//! Cache that stores nothing.

use super::{png_data_uri, BoxFuture, CacheError, ImageCache};
use crate::decode::RawBitmap;

/// `ImageCache` that never caches: lookups always miss and `save_image`
/// materializes the bitmap as a data URI on the spot. Used when no
/// persistent store is wired up, and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopImageCache;

impl ImageCache for NoopImageCache {
    fn get_cached(&self, _key: &str) -> Option<String> {
        None
    }

    fn get_image<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(std::future::ready(None))
    }

    fn save_image<'a>(
        &'a self,
        _key: &'a str,
        bitmap: &'a RawBitmap,
    ) -> BoxFuture<'a, Result<String, CacheError>> {
        Box::pin(std::future::ready(png_data_uri(bitmap)))
    }
}
