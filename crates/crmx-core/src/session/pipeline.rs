//! Authenticated request pipeline.
//!
//! Central chokepoint for all calls to one backend base URL: attaches the
//! bearer token before every request and, on a 401 that has not been retried
//! yet, performs a single refresh-and-replay against the auth backend's
//! token refresh endpoint. Two pipeline instances exist (auth backend and
//! CRM proxy); both refresh against the same endpoint.
//!
//! Per-request lifecycle:
//! `sent -> (2xx: done) | (401 & !retried: refresh -> replay -> done|failed)
//!        | (401 & retried: failed) | (other: failed)`.
//!
//! Concurrent requests holding the same expired token each refresh
//! independently; there is no shared in-flight refresh. Acceptable for
//! single-user usage.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::session::store::CredentialStore;
use crate::types::FileUpload;

/// Request body, decided by the caller. Multipart fields are kept as plain
/// data so the body can be rebuilt when the request is replayed.
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

/// One multipart form field: text or file bytes.
#[derive(Debug, Clone)]
pub struct FormField {
    name: String,
    value: FieldValue,
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File(FileUpload),
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, upload: FileUpload) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::File(upload),
        }
    }
}

/// A request threaded through the pipeline, carrying its retry state
/// explicitly instead of a hidden flag on a shared object.
struct PreparedRequest<'a> {
    method: Method,
    path: &'a str,
    query: &'a [(String, String)],
    payload: &'a Payload,
    retried: bool,
}

/// Pipeline bound to one backend base URL.
pub struct ApiPipeline {
    base_url: String,
    refresh_url: String,
    store: Arc<CredentialStore>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

impl ApiPipeline {
    /// Creates a pipeline for `base_url`, refreshing against `refresh_url`.
    pub fn new(
        base_url: impl Into<String>,
        refresh_url: impl Into<String>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            refresh_url: refresh_url.into(),
            store,
            http: reqwest::Client::new(),
        }
    }

    /// Sends a request and deserializes the JSON response body.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-success status, transport failure, or
    /// an unexpected response shape.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: &Payload,
    ) -> Result<T, ApiError> {
        let value = self.send_value(method, path, query, payload).await?;
        serde_json::from_value(value).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    /// Sends a request and returns the raw JSON response body.
    ///
    /// # Errors
    /// Returns an [`ApiError`] on non-success status or transport failure.
    pub async fn send_value(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        payload: &Payload,
    ) -> Result<Value, ApiError> {
        let mut request = PreparedRequest {
            method,
            path,
            query,
            payload,
            retried: false,
        };

        loop {
            let response = self.dispatch(&request).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !request.retried {
                request.retried = true;

                let refresh = self
                    .store
                    .load()
                    .map(|session| session.refresh)
                    .filter(|token| !token.is_empty());
                let Some(refresh) = refresh else {
                    // No refresh token: the 401 is terminal.
                    return Err(error_from_response(response).await);
                };

                match self.refresh_access(&refresh).await {
                    Ok(access) => {
                        self.store
                            .update_access(&access)
                            .map_err(|err| ApiError::Store(err.to_string()))?;
                        tracing::debug!(path = request.path, "access token refreshed, replaying");
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "token refresh failed, tearing down session");
                        if let Err(err) = self.store.clear() {
                            tracing::warn!(%err, "failed to clear credential store");
                        }
                        return Err(ApiError::SessionExpired);
                    }
                }
            }

            if !status.is_success() {
                return Err(error_from_response(response).await);
            }

            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            return response.json().await.map_err(ApiError::from);
        }
    }

    /// Builds and sends one HTTP request, attaching the current bearer token.
    async fn dispatch(&self, request: &PreparedRequest<'_>) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(request.query);
        }

        if let Some(access) = self
            .store
            .load()
            .map(|session| session.access)
            .filter(|token| !token.is_empty())
        {
            builder = builder.bearer_auth(access);
        }

        builder = match request.payload {
            Payload::Empty => builder,
            Payload::Json(value) => builder.json(value),
            Payload::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        Ok(builder.send().await?)
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Sent without a bearer header: the refresh token is the credential.
    async fn refresh_access(&self, refresh: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let data: RefreshResponse = response.json().await?;
        Ok(data.access)
    }
}

fn build_form(fields: &[FormField]) -> Result<reqwest::multipart::Form, ApiError> {
    let mut form = reqwest::multipart::Form::new();
    for field in fields {
        form = match &field.value {
            FieldValue::Text(value) => form.text(field.name.clone(), value.clone()),
            FieldValue::File(upload) => {
                let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
                    .file_name(upload.filename.clone())
                    .mime_str(&upload.mime)?;
                form.part(field.name.clone(), part)
            }
        };
    }
    Ok(form)
}

async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ApiError::from_status(status, &body)
}
