//! In-memory caching for property queries.
//!
//! This module provides:
//! - Canonical filter signatures so logically equal queries share a cache key
//! - Time-boxed cache entries that are never served once expired
//! - A cache of resolved image URLs keyed by image id set

mod filters;
mod images;
mod traits;
mod ttl;

pub use filters::{
  FilterSignature, PropertyFilters, SortDirection, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD,
};
pub use images::ImageUrlCache;
pub use traits::{CacheResult, CacheSource};
pub use ttl::{FetchStamp, TtlCache, DEFAULT_TTL_SECS};
