//! CDN asset-bundle image provider.
//!
//! # URL Pattern
//!
//! Icon paths map onto bundle URLs as
//! `<base>/images_<path with '/' replaced by '_', '.png' stripped>.sd`
//! (the `_` separator is omitted when the path itself starts with `/`).
//! Named sprites and whole assets live at `<base>/<asset-or-sprite>.sd`.
//!
//! Most bundles ship under the `.sd` packaging; a few only exist as `.ld`,
//! so a failed primary fetch is retried once under the fallback extension
//! before the resolution fails.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::{sprite_cache_key, FoundResult, ImageProvider, ProviderError, RequestId};
use crate::cache::{BoxFuture, ImageCache};
use crate::config::AssetServerConfig;
use crate::data::{Crew, Faction, IconRef, Item, Ship};
use crate::net::HttpClient;
use crate::pool::WorkerPool;
use crate::telemetry::ResolveMetrics;

/// Primary bundle packaging extension.
const PRIMARY_EXT: &str = ".sd";

/// Fallback extension used by a minority of bundles.
const FALLBACK_EXT: &str = ".ld";

/// Resolves images by fetching compressed bundles from the CDN and
/// decoding them on a [`WorkerPool`].
pub struct AssetImageProvider<C: HttpClient> {
    http_client: C,
    image_cache: Arc<dyn ImageCache>,
    pool: WorkerPool,
    base_url: String,
    metrics: Arc<ResolveMetrics>,
}

impl<C: HttpClient> AssetImageProvider<C> {
    /// Creates a provider for the given CDN layout.
    ///
    /// The pool is passed in rather than constructed here so the embedding
    /// application decides how much decode parallelism it affords.
    pub fn new(
        config: &AssetServerConfig,
        http_client: C,
        image_cache: Arc<dyn ImageCache>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            http_client,
            image_cache,
            pool,
            base_url: config.bundle_base_url(),
            metrics: Arc::new(ResolveMetrics::new()),
        }
    }

    /// Shares a metrics instance with other components.
    pub fn with_metrics(mut self, metrics: Arc<ResolveMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics recorded by this provider.
    pub fn metrics(&self) -> &ResolveMetrics {
        &self.metrics
    }

    /// Bundle URL for an icon path, without the packaging extension.
    fn asset_url(&self, icon_file: &str) -> String {
        let separator = if icon_file.starts_with('/') { "" } else { "_" };
        let name = icon_file.replace('/', "_").replacen(".png", "", 1);
        format!("{}images{}{}", self.base_url, separator, name)
    }

    async fn fetch_bundle(&self, icon_file: &str) -> Result<Bytes, ProviderError> {
        let url = self.asset_url(icon_file);
        self.metrics.fetch();
        match self
            .http_client
            .get_bytes(&format!("{}{}", url, PRIMARY_EXT))
            .await
        {
            Ok(payload) => Ok(payload),
            Err(primary) => {
                warn!(
                    icon = icon_file,
                    error = %primary,
                    "primary bundle fetch failed; retrying with fallback extension"
                );
                self.metrics.fallback_fetch();
                self.http_client
                    .get_bytes(&format!("{}{}", url, FALLBACK_EXT))
                    .await
                    .map_err(ProviderError::from)
            }
        }
    }

    async fn resolve_icon(
        &self,
        icon_file: &str,
        id: RequestId,
    ) -> Result<FoundResult, ProviderError> {
        if let Some(url) = self.image_cache.get_image(icon_file).await {
            self.metrics.cache_hit();
            debug!(icon = icon_file, "image cache hit");
            return Ok(FoundResult { id, url: Some(url) });
        }
        self.metrics.cache_miss();

        let payload = self.fetch_bundle(icon_file).await?;
        let bitmap = self
            .pool
            .decode(payload, None, None)
            .await
            .inspect_err(|_| self.metrics.decode_failure())?;

        let url = self.image_cache.save_image(icon_file, &bitmap).await?;
        Ok(FoundResult { id, url: Some(url) })
    }

    async fn resolve_sprite(
        &self,
        asset_name: &str,
        sprite_name: &str,
        id: RequestId,
    ) -> Result<FoundResult, ProviderError> {
        let key = sprite_cache_key(asset_name, sprite_name);
        if let Some(url) = self.image_cache.get_image(&key).await {
            self.metrics.cache_hit();
            debug!(sprite = %key, "image cache hit");
            return Ok(FoundResult { id, url: Some(url) });
        }
        self.metrics.cache_miss();

        // Standalone sprites ship as a bundle named after the sprite; no
        // fallback packaging exists for either form.
        let bundle = if asset_name.is_empty() {
            sprite_name
        } else {
            asset_name
        };
        self.metrics.fetch();
        let payload = self
            .http_client
            .get_bytes(&format!("{}{}{}", self.base_url, bundle, PRIMARY_EXT))
            .await?;

        let bitmap = self
            .pool
            .decode(
                payload,
                Some(asset_name.to_string()),
                Some(sprite_name.to_string()),
            )
            .await
            .inspect_err(|_| self.metrics.decode_failure())?;

        let url = self.image_cache.save_image(&key, &bitmap).await?;
        Ok(FoundResult { id, url: Some(url) })
    }
}

impl<C: HttpClient> ImageProvider for AssetImageProvider<C> {
    fn get_crew_image_url<'a>(
        &'a self,
        crew: &'a Crew,
        full_body: bool,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        let icon = if full_body {
            &crew.full_body
        } else {
            &crew.portrait
        };
        Box::pin(self.resolve_icon(&icon.file, id))
    }

    fn get_ship_image_url<'a>(
        &'a self,
        ship: &'a Ship,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.resolve_icon(&ship.icon.file, id))
    }

    fn get_item_image_url<'a>(
        &'a self,
        item: &'a Item,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.resolve_icon(&item.icon.file, id))
    }

    fn get_faction_image_url<'a>(
        &'a self,
        faction: &'a Faction,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.resolve_icon(&faction.icon.file, id))
    }

    fn get_sprite<'a>(
        &'a self,
        asset_name: &'a str,
        sprite_name: &'a str,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.resolve_sprite(asset_name, sprite_name, id))
    }

    fn get_image_url<'a>(
        &'a self,
        icon_file: &'a str,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.resolve_icon(icon_file, id))
    }

    fn get_cached(&self, icon: &IconRef) -> Option<String> {
        if icon.file.is_empty() {
            return None;
        }
        self.image_cache.get_cached(&icon.file)
    }

    fn get_crew_cached(&self, crew: &Crew, full_body: bool) -> Option<String> {
        let icon = if full_body {
            &crew.full_body
        } else {
            &crew.portrait
        };
        self.image_cache.get_cached(&icon.file)
    }

    fn get_sprite_cached(&self, asset_name: &str, sprite_name: &str) -> Option<String> {
        self.image_cache
            .get_cached(&sprite_cache_key(asset_name, sprite_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryImageCache;
    use crate::decode::{ImageBitmapDecoder, RawBitmap};
    use crate::net::tests::MockHttpClient;
    use crate::net::FetchError;

    const BASE: &str = "https://assets.example.com/bundles/webgl/default/7.0.9/17/";

    fn config() -> AssetServerConfig {
        AssetServerConfig::new("https://assets.example.com/", "17")
    }

    fn png_payload() -> Bytes {
        let bitmap = RawBitmap {
            width: 1,
            height: 1,
            data: vec![9, 9, 9, 255],
        };
        Bytes::from(bitmap.encode_png().unwrap())
    }

    fn provider(http_client: MockHttpClient) -> AssetImageProvider<MockHttpClient> {
        AssetImageProvider::new(
            &config(),
            http_client,
            Arc::new(MemoryImageCache::default()),
            WorkerPool::new(2, Arc::new(ImageBitmapDecoder)),
        )
    }

    #[test]
    fn test_asset_url_construction() {
        let provider = provider(MockHttpClient::new());

        assert_eq!(
            provider.asset_url("crew_icons/cm_kirk.png"),
            format!("{}images_crew_icons_cm_kirk", BASE)
        );
    }

    #[test]
    fn test_asset_url_with_leading_slash_omits_the_separator() {
        let provider = provider(MockHttpClient::new());

        assert_eq!(
            provider.asset_url("/atlas/star_reward.png"),
            format!("{}images_atlas_star_reward", BASE)
        );
    }

    #[test]
    fn test_asset_url_strips_only_the_first_png() {
        let provider = provider(MockHttpClient::new());

        assert_eq!(
            provider.asset_url("icons/a.png/b.png"),
            format!("{}images_icons_a_b.png", BASE)
        );
    }

    #[tokio::test]
    async fn test_resolve_fetches_decodes_and_caches() {
        let url = format!("{}images_crew_icons_cm_kirk.sd", BASE);
        let provider = provider(MockHttpClient::new().with_bytes(&url, Ok(png_payload())));

        let found = provider
            .get_image_url("crew_icons/cm_kirk.png", RequestId(7))
            .await
            .unwrap();
        assert_eq!(found.id, RequestId(7));
        assert!(found.url.unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(provider.http_client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_network_call() {
        let url = format!("{}images_crew_icons_cm_kirk.sd", BASE);
        let provider = provider(MockHttpClient::new().with_bytes(&url, Ok(png_payload())));

        provider
            .get_image_url("crew_icons/cm_kirk.png", RequestId(1))
            .await
            .unwrap();
        provider
            .get_image_url("crew_icons/cm_kirk.png", RequestId(2))
            .await
            .unwrap();

        assert_eq!(provider.http_client.request_count(), 1);
        assert_eq!(provider.metrics().snapshot().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_fallback_extension_after_primary_failure() {
        let fallback_url = format!("{}images_crew_icons_cm_kirk.ld", BASE);
        let provider = provider(MockHttpClient::new().with_bytes(&fallback_url, Ok(png_payload())));

        let found = provider
            .get_image_url("crew_icons/cm_kirk.png", RequestId(3))
            .await
            .unwrap();
        assert!(found.url.is_some());

        let requests = provider.http_client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].ends_with(".sd"));
        assert!(requests[1].ends_with(".ld"));
    }

    #[tokio::test]
    async fn test_both_extensions_failing_is_a_fetch_error() {
        let provider = provider(MockHttpClient::new());

        let result = provider
            .get_image_url("crew_icons/cm_kirk.png", RequestId(4))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Fetch(FetchError::Status { .. }))
        ));
        assert_eq!(provider.http_client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_bundle_is_a_decode_error() {
        let url = format!("{}images_broken.sd", BASE);
        let provider = provider(
            MockHttpClient::new().with_bytes(&url, Ok(Bytes::from_static(&[0xba, 0xad]))),
        );

        let result = provider.get_image_url("broken.png", RequestId(5)).await;
        assert!(matches!(result, Err(ProviderError::Decode(_))));
        assert_eq!(provider.metrics().snapshot().decode_failures, 1);
    }

    #[tokio::test]
    async fn test_sprite_resolution_uses_the_bundle_url_without_fallback() {
        struct AtlasDecoder;
        impl crate::decode::BundleDecoder for AtlasDecoder {
            fn parse(
                &self,
                _payload: &[u8],
                sprite: Option<&str>,
            ) -> Result<RawBitmap, crate::decode::DecodeError> {
                assert_eq!(sprite, Some("node_icon"));
                Ok(RawBitmap {
                    width: 1,
                    height: 1,
                    data: vec![0, 0, 0, 0],
                })
            }
        }

        let url = format!("{}atlas_stt_icons.sd", BASE);
        let http_client = MockHttpClient::new().with_bytes(&url, Ok(Bytes::from_static(&[1])));
        let provider = AssetImageProvider::new(
            &config(),
            http_client,
            Arc::new(MemoryImageCache::default()),
            WorkerPool::new(1, Arc::new(AtlasDecoder)),
        );

        let found = provider
            .get_sprite("atlas_stt_icons", "node_icon", RequestId(6))
            .await
            .unwrap();
        assert!(found.url.is_some());
        assert_eq!(provider.http_client.request_count(), 1);

        // Now cached under the composite key.
        assert!(provider
            .get_sprite_cached("atlas_stt_icons", "node_icon")
            .is_some());
    }

    #[tokio::test]
    async fn test_crew_uses_portrait_or_full_body() {
        let portrait_url = format!("{}images_crew_icons_cm_kirk_sm.sd", BASE);
        let full_url = format!("{}images_crew_full_body_cm_kirk_full.sd", BASE);
        let provider = provider(
            MockHttpClient::new()
                .with_bytes(&portrait_url, Ok(png_payload()))
                .with_bytes(&full_url, Ok(png_payload())),
        );

        let crew = Crew {
            name: "James Kirk".to_string(),
            portrait: IconRef::new("crew_icons/cm_kirk_sm.png"),
            full_body: IconRef::new("crew_full_body/cm_kirk_full.png"),
        };

        provider
            .get_crew_image_url(&crew, false, RequestId(1))
            .await
            .unwrap();
        provider
            .get_crew_image_url(&crew, true, RequestId(2))
            .await
            .unwrap();

        let requests = provider.http_client.requests();
        assert_eq!(requests[0], portrait_url);
        assert_eq!(requests[1], full_url);
    }

    #[test]
    fn test_get_cached_with_empty_icon_path() {
        let provider = provider(MockHttpClient::new());
        assert_eq!(provider.get_cached(&IconRef::default()), None);
    }
}
