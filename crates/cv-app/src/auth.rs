//! # Session lifecycle
//!
//! Login, registration, restore-on-start and logout. The token is persisted
//! under the `token` cache key; the push token under `fcm_token` survives
//! logout so it can be re-registered on the next login.

use std::sync::Arc;

use chrono::Utc;
use cv_core::{
    AppError, CacheKey, LoginRequest, RegisterRequest, RegisterResponse, Result, Session,
    TokenInspector, User,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::notice::Notice;
use crate::Services;

pub struct SessionManager {
    services: Services,
    inspector: Arc<dyn TokenInspector>,
}

impl SessionManager {
    pub fn new(services: &Services, inspector: Arc<dyn TokenInspector>) -> Self {
        Self {
            services: services.clone(),
            inspector,
        }
    }

    /// Reinstates the session persisted by a previous login.
    ///
    /// Expired tokens are discarded. Returns whether a session is active.
    pub async fn restore(&self) -> Result<bool> {
        let token: String = self.services.cache.load(&CacheKey::token()).await;
        if token.is_empty() {
            debug!("no stored token");
            return Ok(false);
        }

        let claims = self.inspector.claims(&token).unwrap_or_default();
        if claims.is_expired(Utc::now()) {
            info!("stored token expired, discarding");
            self.services.cache.clear(&CacheKey::token()).await?;
            return Ok(false);
        }

        let user_id = match claims.subject {
            Some(id) => id,
            None => {
                let cached: Option<User> = self.services.cache.load(&CacheKey::profile()).await;
                match cached {
                    Some(user) => user.id,
                    None => self.fetch_user_id(&token).await?,
                }
            }
        };

        self.services.session.set(Some(Session::new(token, Some(user_id))));
        debug!("session restored");
        Ok(true)
    }

    /// Exchanges credentials for a token and activates the session.
    ///
    /// Fails if the user id cannot be established; nothing is persisted then.
    pub async fn login(&self, identifier: &str, password: &SecretString) -> Result<Arc<Session>> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.expose_secret().is_empty() {
            return Err(AppError::Validation("Please enter your credentials.".to_string()));
        }

        let request = LoginRequest {
            identifier: identifier.to_string(),
            password: password.expose_secret().to_string(),
        };
        let token = self.services.users.login(&request).await.map_err(|e| {
            warn!(error = %e, "login failed");
            e
        })?;

        let provisional = Session::new(token.clone(), None);
        let profile = match self.services.users.get_user_profile(&provisional).await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "profile unavailable after login");
                None
            }
        };
        let user_id = self
            .inspector
            .claims(&token)
            .and_then(|c| c.subject)
            .or_else(|| profile.as_ref().map(|u| u.id.clone()))
            .ok_or_else(|| {
                warn!("login succeeded but the user id could not be established");
                AppError::Unauthorized("could not establish the signed-in user".to_string())
            })?;

        self.services.cache.save(&CacheKey::token(), &token).await?;
        if let Some(user) = &profile {
            if let Err(e) = self.services.cache.save(&CacheKey::profile(), &Some(user)).await {
                warn!(error = %e, "failed to cache profile");
            }
        }

        let session = Arc::new(provisional.with_user_id(user_id));
        self.services.session.activate(session.clone());
        info!(user = ?session.user_id, "logged in");

        self.push_stored_token(&session).await;
        Ok(session)
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let fields = [&request.name, &request.username, &request.email, &request.password];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::Validation("All fields are required.".to_string()));
        }
        if !request.email.contains('@') {
            return Err(AppError::Validation("Please enter a valid email.".to_string()));
        }

        let response = self.services.users.register(request).await?;
        info!(username = %response.username, "account registered");
        self.services
            .notices
            .emit(Notice::Info("Registration successful. Please log in.".to_string()));
        Ok(response)
    }

    /// Drops the session and every session-scoped cache entry.
    pub async fn logout(&self) -> Result<()> {
        self.services.session.set(None);
        let cleared = self.services.cache.clear_all(&CacheKey::session_scoped()).await;
        info!("logged out");
        cleared
    }

    /// Stores the device push token and registers it when logged in.
    pub async fn update_push_token(&self, fcm_token: &str) -> Result<()> {
        self.services.cache.save(&CacheKey::fcm_token(), fcm_token).await?;
        match self.services.session.current() {
            Some(session) => self.services.users.register_push_token(&session, fcm_token).await,
            None => {
                debug!("push token stored, will register after login");
                Ok(())
            }
        }
    }

    async fn fetch_user_id(&self, token: &str) -> Result<String> {
        let provisional = Session::new(token, None);
        let user = self.services.users.get_user_profile(&provisional).await?;
        if let Err(e) = self.services.cache.save(&CacheKey::profile(), &Some(&user)).await {
            warn!(error = %e, "failed to cache profile");
        }
        Ok(user.id)
    }

    async fn push_stored_token(&self, session: &Session) {
        let fcm_token: String = self.services.cache.load(&CacheKey::fcm_token()).await;
        if fcm_token.is_empty() {
            return;
        }
        if let Err(e) = self.services.users.register_push_token(session, &fcm_token).await {
            warn!(error = %e, "push token registration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{logged_out, services, thread, user};
    use chrono::Duration;
    use cv_core::{MockThreadApi, MockTokenInspector, MockUserApi, Thread, TokenClaims};

    fn claims(subject: Option<&str>, expires_in: Duration) -> TokenClaims {
        TokenClaims {
            subject: subject.map(str::to_string),
            expires_at: Some(Utc::now() + expires_in),
        }
    }

    fn inspector(result: Option<TokenClaims>) -> Arc<MockTokenInspector> {
        let mut inspector = MockTokenInspector::new();
        inspector.expect_claims().returning(move |_| result.clone());
        Arc::new(inspector)
    }

    fn password() -> SecretString {
        SecretString::from("hunter2".to_string())
    }

    #[tokio::test]
    async fn login_with_subject_claim_sets_session_and_caches() {
        let mut users = MockUserApi::new();
        users
            .expect_login()
            .withf(|r| r.identifier == "ada" && r.password == "hunter2")
            .returning(|_| Ok("jwt".into()));
        users.expect_get_user_profile().returning(|_| Ok(user("u1", "Ada")));
        users.expect_register_push_token().never();
        let services = logged_out(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(Some(claims(Some("u1"), Duration::hours(1)))));

        let session = auth.login(" ada ", &password()).await.unwrap();

        assert_eq!(session.user_id.as_deref(), Some("u1"));
        assert_eq!(session.token(), "jwt");
        assert!(services.session.current().is_some());
        let token: String = services.cache.load(&CacheKey::token()).await;
        assert_eq!(token, "jwt");
        let profile: Option<User> = services.cache.load(&CacheKey::profile()).await;
        assert_eq!(profile.unwrap().name, "Ada");
    }

    #[tokio::test]
    async fn login_falls_back_to_profile_for_user_id() {
        let mut users = MockUserApi::new();
        users.expect_login().returning(|_| Ok("opaque".into()));
        users.expect_get_user_profile().returning(|_| Ok(user("u7", "Bo")));
        let services = logged_out(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(None));

        let session = auth.login("bo", &password()).await.unwrap();

        assert_eq!(session.user_id.as_deref(), Some("u7"));
    }

    #[tokio::test]
    async fn login_without_user_id_persists_nothing() {
        let mut users = MockUserApi::new();
        users.expect_login().returning(|_| Ok("opaque".into()));
        users
            .expect_get_user_profile()
            .returning(|_| Err(AppError::Network("offline".into())));
        let services = logged_out(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(None));

        let err = auth.login("bo", &password()).await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(services.session.current().is_none());
        let token: String = services.cache.load(&CacheKey::token()).await;
        assert!(token.is_empty());
    }

    #[tokio::test]
    async fn login_registers_stored_push_token() {
        let mut users = MockUserApi::new();
        users.expect_login().returning(|_| Ok("jwt".into()));
        users.expect_get_user_profile().returning(|_| Ok(user("u1", "Ada")));
        users
            .expect_register_push_token()
            .withf(|_, t| t == "device-1")
            .times(1)
            .returning(|_, _| Err(AppError::Network("offline".into())));
        let services = logged_out(MockThreadApi::new(), users);
        services.cache.save(&CacheKey::fcm_token(), "device-1").await.unwrap();
        let auth = SessionManager::new(&services, inspector(Some(claims(Some("u1"), Duration::hours(1)))));

        // Push registration failure does not fail the login.
        assert!(auth.login("ada", &password()).await.is_ok());
    }

    #[tokio::test]
    async fn blank_credentials_are_rejected_locally() {
        let mut users = MockUserApi::new();
        users.expect_login().never();
        let services = logged_out(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(None));

        let err = auth.login("  ", &password()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn restore_uses_cached_token() {
        let users = MockUserApi::new();
        let services = logged_out(MockThreadApi::new(), users);
        services.cache.save(&CacheKey::token(), "jwt").await.unwrap();
        let auth = SessionManager::new(&services, inspector(Some(claims(Some("u1"), Duration::hours(1)))));

        assert!(auth.restore().await.unwrap());
        let session = services.session.current().unwrap();
        assert_eq!(session.token(), "jwt");
        assert_eq!(session.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn restore_discards_expired_token() {
        let services = logged_out(MockThreadApi::new(), MockUserApi::new());
        services.cache.save(&CacheKey::token(), "old").await.unwrap();
        let auth = SessionManager::new(&services, inspector(Some(claims(Some("u1"), -Duration::minutes(5)))));

        assert!(!auth.restore().await.unwrap());
        assert!(services.session.current().is_none());
        let token: String = services.cache.load(&CacheKey::token()).await;
        assert!(token.is_empty());
    }

    #[tokio::test]
    async fn restore_without_token_is_logged_out() {
        let services = logged_out(MockThreadApi::new(), MockUserApi::new());
        let auth = SessionManager::new(&services, inspector(None));
        assert!(!auth.restore().await.unwrap());
    }

    #[tokio::test]
    async fn logout_clears_entity_caches_but_keeps_push_token() {
        let services = services(MockThreadApi::new(), MockUserApi::new());
        let cache = &services.cache;
        cache.save(&CacheKey::token(), "jwt").await.unwrap();
        cache.save(&CacheKey::threads(), &vec![thread("t1", &[], &[])]).await.unwrap();
        cache.save(&CacheKey::profile(), &Some(user("u1", "Ada"))).await.unwrap();
        cache.save(&CacheKey::fcm_token(), "device-1").await.unwrap();
        let auth = SessionManager::new(&services, inspector(None));

        auth.logout().await.unwrap();

        assert!(services.session.current().is_none());
        let threads: Vec<Thread> = cache.load(&CacheKey::threads()).await;
        let profile: Option<User> = cache.load(&CacheKey::profile()).await;
        let token: String = cache.load(&CacheKey::token()).await;
        let fcm: String = cache.load(&CacheKey::fcm_token()).await;
        assert!(threads.is_empty() && profile.is_none() && token.is_empty());
        assert_eq!(fcm, "device-1");
    }

    #[tokio::test]
    async fn push_token_is_stored_and_sent_when_logged_in() {
        let mut users = MockUserApi::new();
        users.expect_register_push_token().times(1).returning(|_, _| Ok(()));
        let services = services(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(None));

        auth.update_push_token("device-2").await.unwrap();

        let fcm: String = services.cache.load(&CacheKey::fcm_token()).await;
        assert_eq!(fcm, "device-2");
    }

    #[tokio::test]
    async fn register_validates_then_calls_backend() {
        let mut users = MockUserApi::new();
        users.expect_register().times(1).returning(|r| {
            Ok(RegisterResponse {
                email: r.email.clone(),
                username: r.username.clone(),
                token: None,
            })
        });
        let services = logged_out(MockThreadApi::new(), users);
        let auth = SessionManager::new(&services, inspector(None));

        let bad = RegisterRequest {
            name: "Ada".into(),
            username: "ada".into(),
            email: "not-an-email".into(),
            password: "pw".into(),
        };
        assert!(matches!(auth.register(&bad).await, Err(AppError::Validation(_))));

        let good = RegisterRequest { email: "ada@campus.edu".into(), ..bad };
        assert_eq!(auth.register(&good).await.unwrap().username, "ada");
    }
}
