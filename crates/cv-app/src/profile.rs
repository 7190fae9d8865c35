//! The signed-in user's profile, plus lookups of other users.

use cv_core::{AppError, CacheKey, ProfileUpdate, Result, User};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::notice::Notice;
use crate::store::ErrorSlot;
use crate::Services;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub profile: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ErrorSlot for ProfileState {
    fn set_error(&mut self, message: Option<String>) {
        self.error = message;
    }
}

pub struct ProfileStore {
    services: Services,
    state: watch::Sender<ProfileState>,
}

impl ProfileStore {
    /// Seeds the state from `cached_profile`.
    pub async fn open(services: &Services) -> Self {
        let profile: Option<User> = services.cache.load(&CacheKey::profile()).await;
        let state = watch::channel(ProfileState {
            profile,
            ..ProfileState::default()
        })
        .0;
        Self {
            services: services.clone(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    pub fn profile(&self) -> Option<User> {
        self.state.borrow().profile.clone()
    }

    pub async fn refresh(&self) -> Result<()> {
        let session = self.services.session.require().map_err(|e| self.surface(e))?;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let user = self
            .services
            .users
            .get_user_profile(&session)
            .await
            .map_err(|e| {
                warn!(error = %e, "profile refresh failed");
                self.surface(e)
            })?;

        if let Err(e) = self.services.cache.save(&CacheKey::profile(), &Some(&user)).await {
            warn!(error = %e, "failed to persist profile");
        }
        self.state.send_modify(|s| {
            s.profile = Some(user);
            s.loading = false;
        });
        Ok(())
    }

    /// Sends the update and reloads the profile.
    pub async fn update(&self, update: ProfileUpdate) -> Result<()> {
        if update.name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty.".to_string()));
        }
        if let Some(avatar) = &update.avatar {
            if !avatar.mime.starts_with("image/") {
                return Err(AppError::Validation("Avatar must be an image.".to_string()));
            }
        }
        let session = self.services.session.require().map_err(|e| self.surface(e))?;

        if let Err(e) = self.services.users.update_profile(&session, &update).await {
            warn!(error = %e, "profile update failed");
            return Err(self.surface(e));
        }
        debug!("profile updated");
        self.services
            .notices
            .emit(Notice::Info("Profile updated.".to_string()));
        self.refresh().await
    }

    /// Another user's profile. Not cached.
    pub async fn author(&self, user_id: &str) -> Result<User> {
        let session = self.services.session.require()?;
        self.services.users.get_user_by_id(&session, user_id).await
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.services.cache.clear(&CacheKey::profile()).await
    }

    fn surface(&self, err: AppError) -> AppError {
        let message = err.user_message();
        self.state.send_modify(|s| {
            s.loading = false;
            s.set_error(Some(message));
        });
        self.services.notices.error(&err);
        err
    }
}
