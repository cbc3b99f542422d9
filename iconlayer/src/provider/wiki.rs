//! Wiki image provider.
//!
//! Resolves images by querying a wiki's `imageinfo` API instead of the
//! CDN. File names on the wiki follow loose human conventions, so each
//! lookup batches four spelling candidates (case, `_Full` suffix, and
//! separator variants) into a single title query and takes the first
//! page that reports an image URL. No decoding is involved.
//!
//! A lookup that finds nothing is cached with a timestamp and not retried
//! until the configured recovery window has elapsed. This is a deliberate
//! backoff so assets the wiki simply does not have are not re-queried on
//! every render pass.

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::{FoundResult, ImageProvider, ProviderError, RequestId};
use crate::cache::BoxFuture;
use crate::config::WikiConfig;
use crate::data::{rarity_name, Crew, Faction, IconRef, Item, Ship};
use crate::net::HttpClient;
use crate::telemetry::ResolveMetrics;

/// Outcome of a previous lookup for one filename.
#[derive(Clone, Debug)]
struct WikiImageEntry {
    /// Resolved URL, or `None` for a negative result.
    url: Option<String>,
    last_queried: SystemTime,
}

/// Resolves images through a wiki search API.
pub struct WikiImageProvider<C: HttpClient> {
    http_client: C,
    config: WikiConfig,
    lookups: DashMap<String, WikiImageEntry>,
    metrics: Arc<ResolveMetrics>,
}

impl<C: HttpClient> WikiImageProvider<C> {
    pub fn new(config: WikiConfig, http_client: C) -> Self {
        Self {
            http_client,
            config,
            lookups: DashMap::new(),
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

    /// The four spelling candidates batched into one title query. Each
    /// rewrite applies to the first occurrence only.
    fn title_candidates(file_name: &str) -> String {
        format!(
            "File:{}|File:{}|File:{}|File:{}",
            file_name,
            file_name.replacen("png", "PNG", 1),
            file_name.replacen(".png", "_Full.png", 1),
            file_name.replacen('_', "-", 1),
        )
    }

    async fn get_wiki_image_url(
        &self,
        file_name: String,
        id: RequestId,
    ) -> Result<FoundResult, ProviderError> {
        if let Some(entry) = self.lookups.get(&file_name) {
            if let Some(url) = &entry.url {
                self.metrics.cache_hit();
                return Ok(FoundResult {
                    id,
                    url: Some(url.clone()),
                });
            }
            // Clock skew makes the entry look fresh, which only delays
            // the retry; never breaks it.
            let age = entry.last_queried.elapsed().unwrap_or_default();
            if age < self.config.recovery_window {
                self.metrics.negative_hit();
                debug!(file = %file_name, "negative cache hit; retry suppressed");
                return Err(ProviderError::NotYetAvailable(file_name));
            }
        }
        self.metrics.cache_miss();

        let titles = Self::title_candidates(&file_name);
        let query = [
            ("action", "query"),
            ("titles", titles.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url|metadata"),
            ("format", "json"),
        ];
        self.metrics.fetch();
        let data = self.http_client.get_json(&self.config.endpoint, &query).await?;

        let found = first_image_url(&data);
        self.lookups.insert(
            file_name.clone(),
            WikiImageEntry {
                url: found.clone(),
                last_queried: SystemTime::now(),
            },
        );

        match found {
            Some(url) => Ok(FoundResult { id, url: Some(url) }),
            None => {
                // The wiki doesn't have this image yet, or it was named in
                // a non-standard way.
                debug!(file = %file_name, "wiki has no image; caching the negative result");
                Err(ProviderError::NotFound(file_name))
            }
        }
    }
}

/// First non-empty `imageinfo.url` across the returned pages.
fn first_image_url(data: &Value) -> Option<String> {
    let pages = data.get("query")?.get("pages")?.as_object()?;
    for page in pages.values() {
        let Some(infos) = page.get("imageinfo").and_then(Value::as_array) else {
            continue;
        };
        for info in infos {
            if let Some(url) = info.get("url").and_then(Value::as_str) {
                if !url.is_empty() {
                    return Some(url.to_string());
                }
            }
        }
    }
    None
}

/// `Name_With_Underscores[_Head].png`.
fn crew_file_name(name: &str, full_body: bool) -> String {
    let base = name.replace(' ', "_");
    if full_body {
        format!("{}.png", base)
    } else {
        format!("{}_Head.png", base)
    }
}

/// Ship name with spaces as underscores, dots and apostrophes stripped.
fn ship_file_name(name: &str) -> String {
    format!(
        "{}.png",
        name.replace(' ', "_").replace('.', "").replace('\'', "")
    )
}

/// `{name}{RarityName}.png` with spaces and apostrophes stripped.
fn item_file_name(name: &str, rarity: &str) -> String {
    format!("{}{}.png", name, rarity)
        .replace(' ', "")
        .replace('\'', "")
}

/// `Icon{NameNoSpaces}.png`.
fn faction_file_name(name: &str) -> String {
    format!("Icon{}.png", name.replace(' ', ""))
}

impl<C: HttpClient> ImageProvider for WikiImageProvider<C> {
    fn get_crew_image_url<'a>(
        &'a self,
        crew: &'a Crew,
        full_body: bool,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.get_wiki_image_url(crew_file_name(&crew.name, full_body), id))
    }

    fn get_ship_image_url<'a>(
        &'a self,
        ship: &'a Ship,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.get_wiki_image_url(ship_file_name(&ship.name), id))
    }

    fn get_item_image_url<'a>(
        &'a self,
        item: &'a Item,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(async move {
            let rarity = rarity_name(item.rarity)
                .ok_or(ProviderError::UnknownRarity(item.rarity))?;
            self.get_wiki_image_url(item_file_name(&item.name, rarity), id)
                .await
        })
    }

    fn get_faction_image_url<'a>(
        &'a self,
        faction: &'a Faction,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.get_wiki_image_url(faction_file_name(&faction.name), id))
    }

    fn get_sprite<'a>(
        &'a self,
        _asset_name: &'a str,
        _sprite_name: &'a str,
        _id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(std::future::ready(Err(ProviderError::SpriteNotSupported)))
    }

    fn get_image_url<'a>(
        &'a self,
        icon_file: &'a str,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>> {
        Box::pin(self.get_wiki_image_url(format!("{}.png", icon_file), id))
    }

    fn get_cached(&self, _icon: &IconRef) -> Option<String> {
        None
    }

    fn get_crew_cached(&self, _crew: &Crew, _full_body: bool) -> Option<String> {
        None
    }

    fn get_sprite_cached(&self, _asset_name: &str, _sprite_name: &str) -> Option<String> {
        None
    }
}
