use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::receivables;

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let balances = receivables::get_entity_balances(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Entity", "Balance", "Last Activity"]);
    for balance in &balances {
        table.add_row(vec![
            Cell::new(&balance.name),
            Cell::new(money(balance.balance)),
            Cell::new(balance.last_activity),
        ]);
    }
    println!("Receivables\n{table}");
    Ok(())
}

pub fn history(entity: &str) -> Result<()> {
    let conn = open_db()?;
    let history = receivables::get_entity_history(&conn, entity)?;

    let mut table = Table::new();
    table.set_header(vec!["Item", "Date", "Description", "Side", "Amount", "Balance"]);
    for entry in &history {
        table.add_row(vec![
            Cell::new(entry.item.item_id),
            Cell::new(entry.item.date),
            Cell::new(&entry.item.description),
            Cell::new(entry.item.item_type.as_str()),
            Cell::new(money(entry.item.amount)),
            Cell::new(money(entry.running_balance)),
        ]);
    }
    println!("History for {entity}\n{table}");
    Ok(())
}

pub fn untagged() -> Result<()> {
    let conn = open_db()?;
    let items = receivables::get_untagged(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Item", "Date", "Description", "Side", "Amount"]);
    for item in &items {
        table.add_row(vec![
            Cell::new(item.item_id),
            Cell::new(item.date),
            Cell::new(&item.description),
            Cell::new(item.item_type.as_str()),
            Cell::new(money(item.amount)),
        ]);
    }
    println!("Untagged receivable items\n{table}");
    Ok(())
}

pub fn tag(item: i64, entity: &str) -> Result<()> {
    let conn = open_db()?;
    let entity = receivables::tag_item(&conn, item, entity)?;
    println!("Tagged item {item} with {}", entity.name);
    Ok(())
}

pub fn untag(item: i64) -> Result<()> {
    let conn = open_db()?;
    receivables::untag_item(&conn, item)?;
    println!("Untagged item {item}");
    Ok(())
}
