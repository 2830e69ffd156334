use comfy_table::{Cell, Table};

use crate::balance::get_balance;
use crate::cli::open_db;
use crate::error::{PennyError, Result};
use crate::fmt::money;
use crate::models::{get_account_by_name, list_accounts, AccountSubType, AccountType};

pub fn add(name: &str, account_type: &str, sub_type: &str) -> Result<()> {
    let account_type = AccountType::parse(account_type)?;
    let sub_type = AccountSubType::parse(sub_type)?;
    if sub_type.account_type() != account_type {
        return Err(PennyError::Validation(format!(
            "sub type '{}' belongs to {} accounts",
            sub_type.as_str(),
            sub_type.account_type().as_str()
        )));
    }
    let conn = open_db()?;
    conn.execute(
        "INSERT INTO accounts (name, account_type, sub_type) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, account_type.as_str(), sub_type.as_str()],
    )
    .map_err(|e| PennyError::conflict_on_unique(e, &format!("account '{name}' already exists")))?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let today = chrono::Local::now().date_naive();
    let accounts = list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Sub Type", "Balance", ""]);
    for account in &accounts {
        let balance = get_balance(&conn, account, today, None)?;
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.name),
            Cell::new(account.account_type.as_str()),
            Cell::new(account.sub_type.as_str()),
            Cell::new(money(balance)),
            Cell::new(if account.is_closed { "closed" } else { "" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn close(name: &str) -> Result<()> {
    let conn = open_db()?;
    let account = get_account_by_name(&conn, name)?;
    conn.execute("UPDATE accounts SET is_closed = 1 WHERE id = ?1", [account.id])?;
    println!("Closed account: {name}");
    Ok(())
}
