//! Catalog adapters (Derpibooru, e621).
//!
//! Each adapter implements the `boorubot-core` Catalog port: listing fetches
//! go through the payload cache and a per-catalog pacer, normalization turns
//! the raw JSON into filtered entries, image downloads bypass the cache.

pub mod derpibooru;
pub mod e621;

mod http;
mod pacer;

#[cfg(test)]
mod testutil;

pub use derpibooru::Derpibooru;
pub use e621::E621;

/// Sent with every upstream request; e621 rejects clients without one.
const USER_AGENT: &str = "boorubot/0.1 (image relay bot)";
