//! Profile changes for the signed-in user.

use tracing::info;

use super::{Flag, PropertyStore};
use crate::api::AuthApi;
use crate::error::StoreError;
use crate::models::{ProfileUpdate, User};

impl PropertyStore {
  /// Save profile changes through the account API.
  ///
  /// Guests are refused before any request. Failures set the shared error
  /// and raise a toast like the other mutations.
  pub async fn update_user(
    &self,
    auth: &dyn AuthApi,
    update: &ProfileUpdate,
  ) -> Result<User, StoreError> {
    self.require_login("Please login to update profile")?;
    if update.is_empty() {
      return Err(StoreError::validation("Nothing to update"));
    }

    let _busy = self.busy(Flag::Loading);
    match auth.update_profile(update).await {
      Ok(user) => {
        info!(user = %user.id, "Profile updated");
        self.toast("Profile updated successfully");
        Ok(user)
      }
      Err(e) => Err(self.fail(e.into(), true)),
    }
  }
}
