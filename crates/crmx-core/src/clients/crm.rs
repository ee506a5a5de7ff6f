//! CRM backend proxy client (contact listing).

use std::sync::Arc;

use reqwest::Method;

use crate::error::ApiError;
use crate::session::pipeline::{ApiPipeline, Payload};
use crate::types::BitrixContact;

/// Client for the CRM proxy pipeline. Shares the auth backend's refresh
/// semantics through its own pipeline instance.
pub struct CrmClient {
    pipeline: Arc<ApiPipeline>,
}

impl CrmClient {
    pub fn new(pipeline: Arc<ApiPipeline>) -> Self {
        Self { pipeline }
    }

    /// `GET /bitrix-contacts/` — all synced Bitrix24 contacts.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the backend message ("Failed to fetch
    /// Bitrix contacts" fallback).
    pub async fn list_contacts(&self) -> Result<Vec<BitrixContact>, ApiError> {
        self.pipeline
            .send(Method::GET, "/bitrix-contacts/", &[], &Payload::Empty)
            .await
            .map_err(|err| err.or_generic("Failed to fetch Bitrix contacts"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::store::CredentialStore;
    use crate::types::Session;

    /// Contact listing goes through the authenticated pipeline.
    #[tokio::test]
    async fn test_list_contacts_authorized() {
        let dir = tempdir().unwrap();
        let server = MockServer::start().await;
        let store = Arc::new(CredentialStore::open(dir.path()));
        store
            .save(&Session {
                access: "A1".to_string(),
                refresh: "R1".to_string(),
                user: None,
            })
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/bitrix-contacts/"))
            .and(header("authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Jane", "last_name": "Roe",
                 "email": "jane@example.com", "phone": "+123"},
                {"email": "anon@example.com"},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = CrmClient::new(Arc::new(ApiPipeline::new(
            server.uri(),
            format!("{}/auth/token/refresh/", server.uri()),
            store,
        )));

        let contacts = client.list_contacts().await.unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].full_name(), "Jane Roe");
        assert_eq!(contacts[1].full_name(), "");
    }
}
