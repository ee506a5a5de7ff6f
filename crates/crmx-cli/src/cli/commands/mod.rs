//! CLI command handlers.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use crmx_core::clients::{AuthClient, CrmClient};
use crmx_core::config::Config;
use crmx_core::session::{ApiPipeline, CredentialStore, SessionController};

pub mod auth;
pub mod config;
pub mod contacts;
pub mod deals;
pub mod profile;

/// Controller over the auth backend, backed by the default store location.
pub fn session_controller(config: &Config) -> SessionController {
    let store = Arc::new(CredentialStore::default_location());
    let pipeline = Arc::new(ApiPipeline::new(
        config.backend.auth_base_url.clone(),
        config.backend.refresh_url(),
        Arc::clone(&store),
    ));
    SessionController::new(store, AuthClient::new(pipeline))
}

/// Client for the CRM backend proxy. Shares the credential store and the
/// refresh endpoint with the auth pipeline.
pub fn crm_client(config: &Config) -> CrmClient {
    let store = Arc::new(CredentialStore::default_location());
    CrmClient::new(Arc::new(ApiPipeline::new(
        config.backend.api_base_url.clone(),
        config.backend.refresh_url(),
        store,
    )))
}

/// Reads one line from stdin after printing a prompt. Input is echoed; use
/// the corresponding --password flags in scripts.
pub fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompts for a new password twice and checks the confirmation locally,
/// before anything goes over the wire.
pub fn prompt_new_password() -> Result<String> {
    let password = prompt_line("New password: ")?;
    let confirm = prompt_line("Confirm password: ")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}
