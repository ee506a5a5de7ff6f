//! Auth backend client.
//!
//! Thin typed wrappers over the auth pipeline. Endpoint paths follow the
//! backend's user viewset routes.

use std::sync::Arc;

use reqwest::Method;
use serde_json::json;

use crate::error::ApiError;
use crate::session::pipeline::{ApiPipeline, FormField, Payload};
use crate::types::{
    LoginResponse, MessageResponse, ProfileUpdate, RegisterForm, RegisterResponse,
    UpdateProfileResponse, UserProfile,
};

pub struct AuthClient {
    pipeline: Arc<ApiPipeline>,
}

impl AuthClient {
    pub fn new(pipeline: Arc<ApiPipeline>) -> Self {
        Self { pipeline }
    }

    /// `POST /users/login/` with email + password.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Login failed"
    /// fallback) on rejection.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.pipeline
            .send(
                Method::POST,
                "/users/login/",
                &[],
                &Payload::Json(json!({ "email": email, "password": password })),
            )
            .await
            .map_err(|err| err.or_generic("Login failed"))
    }

    /// `POST /users/` — registration.
    ///
    /// Goes out as multipart form data when a profile image is attached,
    /// otherwise as a plain JSON object with the same fields.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Registration
    /// failed" fallback) on rejection.
    pub async fn register(&self, form: &RegisterForm) -> Result<RegisterResponse, ApiError> {
        let payload = match &form.profile_image {
            Some(image) => Payload::Multipart(vec![
                FormField::text("first_name", &form.first_name),
                FormField::text("last_name", &form.last_name),
                FormField::text("email", &form.email),
                FormField::text("password", &form.password),
                FormField::text("password_confirm", &form.password_confirm),
                FormField::file("profile_image", image.clone()),
            ]),
            None => Payload::Json(json!({
                "first_name": form.first_name,
                "last_name": form.last_name,
                "email": form.email,
                "password": form.password,
                "password_confirm": form.password_confirm,
            })),
        };

        self.pipeline
            .send(Method::POST, "/users/", &[], &payload)
            .await
            .map_err(|err| err.or_generic("Registration failed"))
    }

    /// `POST /users/logout/` — blacklists the refresh token.
    ///
    /// # Errors
    /// Returns an [`ApiError`] if the backend rejects the token. Callers
    /// treat this as best-effort.
    pub async fn logout(&self, refresh: &str) -> Result<(), ApiError> {
        let _: MessageResponse = self
            .pipeline
            .send(
                Method::POST,
                "/users/logout/",
                &[],
                &Payload::Json(json!({ "refresh": refresh })),
            )
            .await?;
        Ok(())
    }

    /// `GET /users/profile/` — current user's profile.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Failed to fetch
    /// profile" fallback).
    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        self.pipeline
            .send(Method::GET, "/users/profile/", &[], &Payload::Empty)
            .await
            .map_err(|err| err.or_generic("Failed to fetch profile"))
    }

    /// `PATCH /users/update_profile/` — always multipart, carrying only the
    /// fields present in the update (the endpoint applies a partial update).
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Failed to update
    /// profile" fallback).
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<UpdateProfileResponse, ApiError> {
        let mut fields = Vec::new();
        if let Some(first_name) = &update.first_name {
            fields.push(FormField::text("first_name", first_name));
        }
        if let Some(last_name) = &update.last_name {
            fields.push(FormField::text("last_name", last_name));
        }
        if let Some(bio) = &update.bio {
            fields.push(FormField::text("bio", bio));
        }
        if let Some(phone) = &update.phone {
            fields.push(FormField::text("phone", phone));
        }
        if let Some(birth_date) = &update.birth_date {
            fields.push(FormField::text("birth_date", birth_date));
        }
        if let Some(image) = &update.profile_image {
            fields.push(FormField::file("profile_image", image.clone()));
        }

        self.pipeline
            .send(
                Method::PATCH,
                "/users/update_profile/",
                &[],
                &Payload::Multipart(fields),
            )
            .await
            .map_err(|err| err.or_generic("Failed to update profile"))
    }

    /// `PUT /users/change_password/`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Failed to change
    /// password" fallback).
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<String, ApiError> {
        let response: MessageResponse = self
            .pipeline
            .send(
                Method::PUT,
                "/users/change_password/",
                &[],
                &Payload::Json(json!({
                    "old_password": old_password,
                    "new_password": new_password,
                    "new_password_confirm": new_password_confirm,
                })),
            )
            .await
            .map_err(|err| err.or_generic("Failed to change password"))?;
        Ok(response
            .message
            .unwrap_or_else(|| "Password changed successfully".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::store::CredentialStore;
    use crate::types::FileUpload;

    fn client(server: &MockServer, dir: &std::path::Path) -> AuthClient {
        let store = Arc::new(CredentialStore::open(dir));
        AuthClient::new(Arc::new(ApiPipeline::new(
            server.uri(),
            format!("{}/token/refresh/", server.uri()),
            store,
        )))
    }

    /// Registration without an image is a plain JSON submission.
    #[tokio::test]
    async fn test_register_without_image_is_json() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/"))
            .and(body_json(json!({
                "first_name": "John",
                "last_name": "Doe",
                "email": "john@example.com",
                "password": "pw",
                "password_confirm": "pw",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "User created successfully",
                "user": {"id": 1, "email": "john@example.com",
                         "first_name": "John", "last_name": "Doe"},
                "tokens": {"refresh": "R1", "access": "A1"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = RegisterForm {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john@example.com".to_string(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
            profile_image: None,
        };

        let response = client(&server, dir.path()).register(&form).await.unwrap();
        assert_eq!(response.tokens.access, "A1");
        assert_eq!(response.user.id, 1);
    }

    /// Registration with an image goes out as multipart with the same
    /// non-file fields.
    #[tokio::test]
    async fn test_register_with_image_is_multipart() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "user": {"id": 1, "email": "john@example.com",
                         "first_name": "John", "last_name": "Doe"},
                "tokens": {"refresh": "R1", "access": "A1"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = RegisterForm {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: "john@example.com".to_string(),
            password: "pw".to_string(),
            password_confirm: "pw".to_string(),
            profile_image: Some(FileUpload {
                filename: "me.png".to_string(),
                mime: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }),
        };

        client(&server, dir.path()).register(&form).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let content_type = requests[0].headers.get("content-type").unwrap();
        assert!(
            content_type
                .to_str()
                .unwrap()
                .starts_with("multipart/form-data")
        );
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("john@example.com"));
        assert!(body.contains("me.png"));
    }

    /// Login failure surfaces the backend's message.
    #[tokio::test]
    async fn test_login_failure_carries_backend_message() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/login/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                json!({"detail": "No active account found with the given credentials"}),
            ))
            .mount(&server)
            .await;

        let err = client(&server, dir.path())
            .login("john@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No active account found with the given credentials"
        );
    }

    /// Login failure without a backend message falls back to a generic one.
    #[tokio::test]
    async fn test_login_failure_generic_fallback() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/users/login/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server, dir.path())
            .login("john@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    /// Profile update sends only the present fields.
    #[tokio::test]
    async fn test_update_profile_sends_present_fields_only() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/users/update_profile/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Profile updated successfully",
                "user": {"id": 1, "email": "john@example.com"},
            })))
            .mount(&server)
            .await;

        let update = ProfileUpdate {
            bio: Some("hello".to_string()),
            ..ProfileUpdate::default()
        };
        client(&server, dir.path())
            .update_profile(&update)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("bio"));
        assert!(!body.contains("first_name"));
        assert!(!body.contains("phone"));
    }
}
