use async_trait::async_trait;
use cv_core::{
    AppError, IdRequest, LoginRequest, LoginResponse, Notification, NotificationsEnvelope, ProfileUpdate,
    PushTokenRequest, RegisterRequest, RegisterResponse, Result, Session, User, UserApi,
};
use reqwest::multipart::Form;

use crate::{file_part, HttpApi};

#[async_trait]
impl UserApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<String> {
        let url = self.endpoint("users/login", &[])?;
        let response: LoginResponse = self
            .send_json(self.client.post(url).json(request))
            .await
            .map_err(|e| match e {
                // 401/403 from login means bad credentials.
                AppError::Unauthorized(_) => {
                    AppError::Validation("Invalid email or password".to_string())
                }
                other => other,
            })?;
        Ok(response.token)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let url = self.endpoint("users/register", &[])?;
        self.send_json(self.client.post(url).json(request)).await
    }

    async fn get_user_profile(&self, session: &Session) -> Result<User> {
        let url = self.endpoint("users/profile", &[])?;
        self.send_json(self.authed(self.client.get(url), session)).await
    }

    async fn get_user_by_id(&self, session: &Session, id: &str) -> Result<User> {
        let url = self.endpoint("users/getuser", &[])?;
        let body = IdRequest { id: id.to_string() };
        self.send_json(self.authed(self.client.post(url), session).json(&body))
            .await
    }

    async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> Result<()> {
        let mut form = Form::new().text("name", update.name.clone());
        if let Some(bio) = &update.bio {
            form = form.text("bio", bio.clone());
        }
        if let Some(avatar) = &update.avatar {
            form = form.part("avatarUrl", file_part(avatar)?);
        }
        let url = self.endpoint("users/profile", &[])?;
        self.send_empty(self.authed(self.client.put(url).multipart(form), session))
            .await
    }

    async fn get_notifications(&self, session: &Session) -> Result<Vec<Notification>> {
        let url = self.endpoint("users/notifications", &[])?;
        let envelope: NotificationsEnvelope =
            self.send_json(self.authed(self.client.get(url), session)).await?;
        Ok(envelope.notifications)
    }

    async fn register_push_token(&self, session: &Session, fcm_token: &str) -> Result<()> {
        let url = self.endpoint("users/fcm-token", &[])?;
        let body = PushTokenRequest {
            fcm_token: fcm_token.to_string(),
        };
        self.send_empty(self.authed(self.client.post(url).json(&body), session))
            .await
    }
}
