//! Deal and task command handlers (Bitrix24 direct webhook).

use anyhow::Result;
use chrono::DateTime;
use comfy_table::{ContentArrangement, Table};
use crmx_core::clients::BitrixClient;
use crmx_core::config::Config;
use crmx_core::types::{NewDeal, NewTask};

pub async fn list(config: &Config, stage: Option<&str>) -> Result<()> {
    let client = BitrixClient::from_config(&config.bitrix)?;
    let deals = client.list_deals(stage).await?;
    if deals.is_empty() {
        println!("No deals found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Stage", "Amount", "Created"]);
    for deal in &deals {
        let amount = match (&deal.opportunity, &deal.currency_id) {
            (Some(amount), Some(currency)) => format!("{amount} {currency}"),
            (Some(amount), None) => amount.clone(),
            (None, _) => String::new(),
        };
        table.add_row(vec![
            deal.id.clone(),
            deal.title.clone(),
            deal.stage_id.clone(),
            amount,
            deal.date_create.as_deref().map(format_date).unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn create(config: &Config, deal: NewDeal) -> Result<()> {
    let client = BitrixClient::from_config(&config.bitrix)?;
    let result = client.create_deal(&deal).await?;
    println!("Created deal {result}");
    Ok(())
}

pub async fn paid(config: &Config, deal_id: &str) -> Result<()> {
    let client = BitrixClient::from_config(&config.bitrix)?;
    client.mark_deal_paid(deal_id).await?;
    println!("Deal {deal_id} marked as paid.");
    Ok(())
}

pub async fn task(config: &Config, task: NewTask) -> Result<()> {
    let client = BitrixClient::from_config(&config.bitrix)?;
    let deal_id = task.deal_id.clone();
    client.create_task(&task).await?;
    println!("Task created for deal {deal_id}.");
    Ok(())
}

/// Bitrix timestamps carry a timezone offset; only the date is interesting
/// in a listing.
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_from_bitrix_timestamp() {
        assert_eq!(format_date("2026-03-01T10:15:00+03:00"), "2026-03-01");
        // Unparseable input passes through untouched.
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
