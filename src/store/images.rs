//! Background resolution of image ids to URLs.

use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{PropertyStore, Shared, MAX_CONCURRENT_IMAGE_REQUESTS};
use crate::models::{Property, PropertyId};

/// One URL request, shared by every property with the same image id set.
struct ImageJob {
  image_ids: Vec<String>,
  property_ids: Vec<PropertyId>,
}

/// Apply URLs already in the image cache to every list. Never makes a request.
pub(super) fn apply_cached_images(shared: &mut Shared, properties: &[Property]) {
  let Shared { state, caches } = shared;
  for key in properties.iter().filter_map(Property::image_cache_key) {
    if let Some(urls) = caches.images.get(&key) {
      state.apply_image_urls(&key, urls);
    }
  }
}

impl PropertyStore {
  /// Start resolving image URLs without waiting for them.
  ///
  /// Returns `None` when there is nothing to resolve or no runtime to run on.
  pub(crate) fn spawn_image_resolution(&self, properties: Vec<Property>) -> Option<JoinHandle<()>> {
    if properties.iter().all(|p| p.image_ids.is_empty()) {
      return None;
    }

    let handle = match Handle::try_current() {
      Ok(handle) => handle,
      Err(e) => {
        warn!("Image resolution skipped, no async runtime: {}", e);
        return None;
      }
    };

    let store = self.clone();
    Some(handle.spawn(async move { store.resolve_images(properties).await }))
  }

  /// Resolve image URLs for the given properties and apply them to state.
  ///
  /// Image sets already in the URL cache are applied without a request. A
  /// failed request marks only the properties it was made for, and never
  /// touches the shared error.
  pub async fn resolve_images(&self, properties: Vec<Property>) {
    let mut jobs: BTreeMap<String, ImageJob> = BTreeMap::new();
    let mut cached = Vec::new();

    {
      let shared = self.lock();
      for property in &properties {
        let Some(key) = property.image_cache_key() else {
          continue;
        };
        if let Some(urls) = shared.caches.images.get(&key) {
          cached.push((key, urls.clone()));
          continue;
        }
        jobs
          .entry(key)
          .or_insert_with(|| ImageJob {
            image_ids: property.image_ids.clone(),
            property_ids: Vec::new(),
          })
          .property_ids
          .push(property.id.clone());
      }
    }

    if !cached.is_empty() {
      self.update(|state| {
        for (key, urls) in &cached {
          state.apply_image_urls(key, urls);
        }
      });
    }

    stream::iter(jobs)
      .for_each_concurrent(MAX_CONCURRENT_IMAGE_REQUESTS, |(key, job)| async move {
        match self
          .inner
          .api
          .generate_property_image_urls(&job.image_ids)
          .await
        {
          Ok(urls) => {
            debug!(
              properties = job.property_ids.len(),
              resolved = urls.len(),
              "Image URLs resolved"
            );
            self.update_shared(|shared| {
              if !urls.is_empty() {
                shared.caches.images.insert(key.clone(), urls.clone());
              }
              shared.state.apply_image_urls(&key, &urls);
            });
          }
          Err(e) => {
            warn!(properties = ?job.property_ids, "Failed to generate image URLs: {}", e);
            let reason = e.to_string();
            self.update(|state| state.mark_images_failed(&key, &job.property_ids, &reason));
          }
        }
      })
      .await;
  }
}
