//! Bitrix24 direct REST client (deals and tasks).
//!
//! Calls go straight to the portal's inbound webhook; the webhook URL is the
//! credential, so there is no bearer header and no refresh protocol on this
//! channel.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::BitrixConfig;
use crate::error::ApiError;
use crate::types::{Deal, NewDeal, NewTask};

/// Columns requested from `crm.deal.list`.
const DEAL_SELECT: &[&str] = &[
    "ID",
    "TITLE",
    "STAGE_ID",
    "OPPORTUNITY",
    "CURRENCY_ID",
    "CONTACT_ID",
    "COMPANY_ID",
    "DATE_CREATE",
    "DATE_MODIFY",
];

#[derive(Debug, Deserialize)]
struct DealListResponse {
    #[serde(default)]
    result: Option<Vec<Deal>>,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Option<Value>,
}

pub struct BitrixClient {
    base_url: String,
    waiting_stage: String,
    won_stage: String,
    responsible_id: i64,
    http: reqwest::Client,
}

impl BitrixClient {
    /// Builds a client from the Bitrix section of the config.
    ///
    /// # Errors
    /// Returns an error when no webhook URL has been configured.
    pub fn from_config(config: &BitrixConfig) -> Result<Self> {
        let Some(webhook_url) = config.effective_webhook_url() else {
            anyhow::bail!(
                "No Bitrix24 webhook configured. Set one with: crmx config set-webhook <url>"
            );
        };

        Ok(Self {
            base_url: webhook_url.trim_end_matches('/').to_string(),
            waiting_stage: config.waiting_stage_id.clone(),
            won_stage: config.won_stage_id.clone(),
            responsible_id: config.responsible_id,
            http: reqwest::Client::new(),
        })
    }

    /// `crm.deal.list` filtered by stage (defaults to the waiting stage).
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the portal message ("Failed to fetch
    /// deals" fallback).
    pub async fn list_deals(&self, stage_id: Option<&str>) -> Result<Vec<Deal>, ApiError> {
        let stage = stage_id.unwrap_or(&self.waiting_stage);
        let mut query: Vec<(String, String)> =
            vec![("filter[STAGE_ID]".to_string(), stage.to_string())];
        for field in DEAL_SELECT {
            query.push(("select[]".to_string(), (*field).to_string()));
        }

        let response = self
            .http
            .get(format!("{}/crm.deal.list", self.base_url))
            .query(&query)
            .send()
            .await?;
        let data: DealListResponse = Self::parse(response, "Failed to fetch deals").await?;
        Ok(data.result.unwrap_or_default())
    }

    /// `crm.deal.add`. Paid deals land in the won stage directly, unpaid
    /// ones in the waiting stage. Returns the new deal id.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the portal message ("Failed to create
    /// deal" fallback).
    pub async fn create_deal(&self, deal: &NewDeal) -> Result<Value, ApiError> {
        let stage_id = if deal.paid {
            &self.won_stage
        } else {
            &self.waiting_stage
        };

        let fields = json!({
            "TITLE": deal.title,
            "STAGE_ID": stage_id,
            "OPPORTUNITY": deal.amount,
            "CURRENCY_ID": deal.currency.as_deref().unwrap_or("USD"),
            "RESPONSIBLE_ID": deal.responsible_id.unwrap_or(self.responsible_id),
            "CONTACT_ID": deal.contact_id,
            "COMPANY_ID": deal.company_id,
            "CATEGORY_ID": deal.category_id.unwrap_or(0),
            "UF_CRM_TAX": deal.tax_registration.as_deref().unwrap_or(""),
            "UF_CRM_CONTRACT": if deal.contract { "Y" } else { "N" },
            "COMMENTS": deal
                .comments
                .clone()
                .unwrap_or_else(|| format!("Sales order created: {}", deal.title)),
        });

        self.call("crm.deal.add", json!({ "fields": fields }), "Failed to create deal")
            .await
    }

    /// `crm.deal.update` with arbitrary fields.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the portal message ("Failed to update
    /// deal" fallback).
    pub async fn update_deal(&self, deal_id: &str, fields: Value) -> Result<Value, ApiError> {
        self.call(
            "crm.deal.update",
            json!({ "id": deal_id, "fields": fields }),
            "Failed to update deal",
        )
        .await
    }

    /// Moves a deal to the won stage.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the portal message on failure.
    pub async fn mark_deal_paid(&self, deal_id: &str) -> Result<Value, ApiError> {
        self.update_deal(deal_id, json!({ "STAGE_ID": self.won_stage }))
            .await
    }

    /// `tasks.task.add`, binding the task to a deal via `UF_CRM_TASK`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] with the portal message ("Failed to create
    /// task" fallback).
    pub async fn create_task(&self, task: &NewTask) -> Result<Value, ApiError> {
        let fields = json!({
            "TITLE": task.title,
            "UF_CRM_TASK": [format!("D_{}", task.deal_id)],
            "UF_CRM_TAX": task.tax_registration.as_deref().unwrap_or(""),
            "UF_CRM_CONTRACT": if task.contract { "Y" } else { "N" },
            "RESPONSIBLE_ID": self.responsible_id,
            "DESCRIPTION": format!("Task created for deal: {}", task.deal_id),
        });

        self.call("tasks.task.add", json!({ "fields": fields }), "Failed to create task")
            .await
    }

    async fn call(&self, endpoint: &str, body: Value, fallback: &str) -> Result<Value, ApiError> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .await?;
        let data: CallResponse = Self::parse(response, fallback).await?;
        Ok(data.result.unwrap_or_else(|| json!({})))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), &body).or_generic(fallback));
        }
        response
            .json()
            .await
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }
}
