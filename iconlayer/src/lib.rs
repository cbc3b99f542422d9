//! IconLayer: image resolution and state merging for a game companion app.
//!
//! This library is the client-side data-layer core: it resolves logical
//! game image identifiers (crew, ships, items, factions, named sprites,
//! raw icon paths) to displayable URLs through a pluggable cache-or-fetch
//! strategy, decodes proprietary asset bundles on a fixed-size worker
//! pool, and folds incremental server patches into long-lived in-memory
//! player state.
//!
//! # Architecture
//!
//! ```text
//! caller ──► ImageProvider ──► ImageCache (hit? ── done)
//!                │ miss
//!                ▼
//!            HttpClient ──► WorkerPool ──► BundleDecoder
//!                               │
//!                               ▼
//!                        ImageCache::save_image ──► URL
//! ```
//!
//! [`provider::AssetImageProvider`] fetches compressed bundles from the
//! CDN and decodes them on the pool; [`provider::WikiImageProvider`]
//! queries a wiki's search API and extracts URLs without decoding.
//! [`merge::merge_deep`] is independent of the image pipeline and keeps
//! player state current as the server pushes partial updates.

pub mod cache;
pub mod config;
pub mod data;
pub mod decode;
pub mod merge;
pub mod net;
pub mod pool;
pub mod provider;
pub mod telemetry;
