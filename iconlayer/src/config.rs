//! Configuration for the image layer.
//!
//! Components receive their configuration explicitly at construction; there
//! is no global state. [`AssetServerConfig`] pins down the CDN URL layout,
//! [`WikiConfig`] the wiki endpoint and its negative-result recovery window,
//! and [`PoolSize`] how many decode workers a pool starts.

use std::time::Duration;

/// Client platform string baked into bundle URLs.
pub const DEFAULT_CLIENT_PLATFORM: &str = "webgl";

/// Client version the companion app pins.
pub const DEFAULT_CLIENT_VERSION: &str = "7.0.9";

/// Default wiki search API endpoint.
pub const DEFAULT_WIKI_ENDPOINT: &str = "https://stt.wiki/w/api.php";

/// Hours after a failed wiki lookup before the source is queried again.
///
/// Every 10 days, check the wiki again for updated / new images.
pub const DEFAULT_HOURS_TO_RECOVERY: u64 = 24 * 10;

/// Default worker count when hardware parallelism cannot be determined.
pub const DEFAULT_POOL_WORKERS: usize = 8;

/// CDN layout for asset-bundle downloads.
#[derive(Clone, Debug)]
pub struct AssetServerConfig {
    /// Asset server root, trailing slash included.
    pub asset_server: String,
    /// Client platform segment of the bundle path.
    pub platform: String,
    /// Client version segment of the bundle path.
    pub client_version: String,
    /// Asset bundle version reported by the platform config endpoint.
    pub bundle_version: String,
}

impl AssetServerConfig {
    /// Creates a config with the default platform and client version.
    pub fn new(asset_server: impl Into<String>, bundle_version: impl Into<String>) -> Self {
        Self {
            asset_server: asset_server.into(),
            platform: DEFAULT_CLIENT_PLATFORM.to_string(),
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            bundle_version: bundle_version.into(),
        }
    }

    /// Base URL all bundle downloads hang off of.
    pub fn bundle_base_url(&self) -> String {
        format!(
            "{}bundles/{}/default/{}/{}/",
            self.asset_server, self.platform, self.client_version, self.bundle_version
        )
    }
}

/// Wiki provider configuration.
#[derive(Clone, Debug)]
pub struct WikiConfig {
    /// Wiki search API endpoint.
    pub endpoint: String,
    /// How long a failed lookup suppresses re-querying the same filename.
    pub recovery_window: Duration,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WIKI_ENDPOINT.to_string(),
            recovery_window: Duration::from_secs(DEFAULT_HOURS_TO_RECOVERY * 3600),
        }
    }
}

impl WikiConfig {
    /// Overrides the recovery window.
    pub fn with_recovery_window(mut self, window: Duration) -> Self {
        self.recovery_window = window;
        self
    }
}

/// How many decode workers a pool should start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolSize {
    /// Exact worker count (clamped to at least one).
    Fixed(usize),
    /// Match available hardware parallelism.
    Auto,
}

impl PoolSize {
    /// Resolves to a concrete worker count.
    pub fn worker_count(self) -> usize {
        match self {
            PoolSize::Fixed(size) => size.max(1),
            PoolSize::Auto => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_POOL_WORKERS),
        }
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        PoolSize::Fixed(DEFAULT_POOL_WORKERS)
    }
}
