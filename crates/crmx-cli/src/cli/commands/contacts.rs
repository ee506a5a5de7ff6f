//! Contact command handlers.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use crmx_core::config::Config;

pub async fn list(config: &Config) -> Result<()> {
    let contacts = super::crm_client(config).list_contacts().await?;
    if contacts.is_empty() {
        println!("No contacts found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Name", "Email", "Phone"]);
    for contact in &contacts {
        table.add_row(vec![
            contact.id.map(|id| id.to_string()).unwrap_or_default(),
            contact.full_name(),
            contact.email.clone(),
            contact.phone.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}
