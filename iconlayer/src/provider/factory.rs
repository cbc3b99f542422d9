//! Centralized provider construction.
//!
//! The resolution strategy is a startup decision: the factory turns a
//! [`ProviderConfig`] into an `Arc<dyn ImageProvider>` so the rest of the
//! application never knows which strategy is behind it.

use std::sync::Arc;

use super::{AssetImageProvider, ImageProvider, WikiImageProvider};
use crate::cache::ImageCache;
use crate::config::{AssetServerConfig, PoolSize, WikiConfig};
use crate::decode::BundleDecoder;
use crate::net::HttpClient;
use crate::pool::WorkerPool;

/// Which resolution strategy to use.
#[derive(Clone, Debug)]
pub enum ProviderConfig {
    /// CDN asset bundles, decoded locally on a worker pool.
    Asset {
        server: AssetServerConfig,
        pool_size: PoolSize,
    },
    /// Wiki search API; no decoding.
    Wiki(WikiConfig),
}

impl ProviderConfig {
    /// Short name for logging and cache directory hierarchies.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Asset { .. } => "asset",
            ProviderConfig::Wiki(_) => "wiki",
        }
    }
}

/// Builds [`ImageProvider`] trait objects from configuration.
pub struct ProviderFactory<C: HttpClient + Clone + 'static> {
    http_client: C,
    image_cache: Arc<dyn ImageCache>,
    decoder: Arc<dyn BundleDecoder>,
}

impl<C: HttpClient + Clone + 'static> ProviderFactory<C> {
    pub fn new(
        http_client: C,
        image_cache: Arc<dyn ImageCache>,
        decoder: Arc<dyn BundleDecoder>,
    ) -> Self {
        Self {
            http_client,
            image_cache,
            decoder,
        }
    }

    /// Creates the provider selected by `config`.
    pub fn create(&self, config: &ProviderConfig) -> Arc<dyn ImageProvider> {
        match config {
            ProviderConfig::Asset { server, pool_size } => {
                let pool = WorkerPool::with_size(*pool_size, Arc::clone(&self.decoder));
                Arc::new(AssetImageProvider::new(
                    server,
                    self.http_client.clone(),
                    Arc::clone(&self.image_cache),
                    pool,
                ))
            }
            ProviderConfig::Wiki(wiki) => Arc::new(WikiImageProvider::new(
                wiki.clone(),
                self.http_client.clone(),
            )),
        }
    }
}
