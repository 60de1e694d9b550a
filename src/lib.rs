//! Client core for a property rental marketplace.
//!
//! The centre of the crate is [`store::PropertyStore`], a cache and fetch
//! coordinator over the backend's REST API. Around it sit the API client,
//! best-effort token storage, device-local history and the configuration and
//! logging used by the `haven` binary.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;

pub use error::StoreError;
pub use store::PropertyStore;
