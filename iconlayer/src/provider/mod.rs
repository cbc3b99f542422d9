//! Image resolution providers.
//!
//! A provider resolves a logical image identifier (a crew portrait, ship
//! icon, item icon, faction icon, named sprite, or raw icon path) to a
//! displayable URL. Every resolution follows the same three-step protocol:
//!
//! 1. consult the image cache; return immediately on a hit;
//! 2. on a miss, fetch source bytes using the entity's naming convention;
//! 3. decode (asset bundles) or extract (wiki metadata), persist through
//!    the cache, and return the resulting URL.
//!
//! Two strategies implement the contract: [`AssetImageProvider`] pulls
//! compressed bundles from the CDN and decodes them on a worker pool;
//! [`WikiImageProvider`] asks a wiki's search API and never decodes
//! anything. [`ProviderFactory`] selects one from configuration.
//!
//! Failures are surfaced to the immediate caller and never retried at
//! this layer. Callers resolving a batch are expected to catch per-item
//! failures and leave the entity without an icon rather than aborting
//! the batch.

mod asset;
mod factory;
mod wiki;

pub use asset::AssetImageProvider;
pub use factory::{ProviderConfig, ProviderFactory};
pub use wiki::WikiImageProvider;

use thiserror::Error;

use crate::cache::{BoxFuture, CacheError};
use crate::data::{Crew, Faction, IconRef, Item, Ship};
use crate::decode::DecodeError;
use crate::net::FetchError;

/// Opaque correlation token a caller attaches to a resolution request so
/// it can re-associate the resolved URL with the entity that asked.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RequestId(pub u64);

/// Outcome of a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundResult {
    /// The caller's correlation token, passed back unchanged.
    pub id: RequestId,
    /// Display URL for the image.
    pub url: Option<String>,
}

/// Errors raised while resolving an image.
///
/// A cache miss is not an error; it is the normal path into a fetch.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or backend failure. For asset bundles this is raised only
    /// after the fallback-extension retry also failed; wiki queries are
    /// never retried.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The decoder could not produce a bitmap.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The resolved bitmap could not be persisted.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The source has no image under any candidate name (yet).
    #[error("no image available for {0}")]
    NotFound(String),

    /// A recent lookup for this name already failed; re-querying is
    /// suppressed until the recovery window elapses.
    #[error("lookup for {0} failed recently; retry suppressed")]
    NotYetAvailable(String),

    /// This provider cannot resolve named sprites.
    #[error("sprite resolution is not supported by this provider")]
    SpriteNotSupported,

    /// The item carries a rarity index outside the known table.
    #[error("unknown rarity index {0}")]
    UnknownRarity(usize),
}

/// Resolves logical image identifiers to displayable URLs.
///
/// The `get_*_cached` methods are synchronous and best-effort (backed by
/// [`crate::cache::ImageCache::get_cached`]); the async methods are
/// authoritative and may hit the network.
pub trait ImageProvider: Send + Sync {
    /// Resolves a crew member's portrait (`full_body == false`) or
    /// full-body render.
    fn get_crew_image_url<'a>(
        &'a self,
        crew: &'a Crew,
        full_body: bool,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Resolves a ship's icon.
    fn get_ship_image_url<'a>(
        &'a self,
        ship: &'a Ship,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Resolves an item's icon.
    fn get_item_image_url<'a>(
        &'a self,
        item: &'a Item,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Resolves a faction's icon.
    fn get_faction_image_url<'a>(
        &'a self,
        faction: &'a Faction,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Resolves a named sprite, either out of a shared atlas bundle
    /// (`asset_name` non-empty) or from a standalone bundle named after
    /// the sprite.
    fn get_sprite<'a>(
        &'a self,
        asset_name: &'a str,
        sprite_name: &'a str,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Resolves a raw icon file path.
    fn get_image_url<'a>(
        &'a self,
        icon_file: &'a str,
        id: RequestId,
    ) -> BoxFuture<'a, Result<FoundResult, ProviderError>>;

    /// Best-effort cached URL for an icon reference.
    fn get_cached(&self, icon: &IconRef) -> Option<String>;

    /// Best-effort cached URL for a crew image.
    fn get_crew_cached(&self, crew: &Crew, full_body: bool) -> Option<String>;

    /// Best-effort cached URL for a named sprite.
    fn get_sprite_cached(&self, asset_name: &str, sprite_name: &str) -> Option<String>;
}

/// Cache key for a named sprite: `asset_sprite`, or just the sprite name
/// when it ships as a standalone bundle.
pub(crate) fn sprite_cache_key(asset_name: &str, sprite_name: &str) -> String {
    if asset_name.is_empty() {
        sprite_name.to_string()
    } else {
        format!("{}_{}", asset_name, sprite_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_cache_key() {
        assert_eq!(
            sprite_cache_key("atlas_stt_icons", "node_icon"),
            "atlas_stt_icons_node_icon"
        );
        assert_eq!(sprite_cache_key("", "images_voyages_voyage_bg"), "images_voyages_voyage_bg");
    }
}
