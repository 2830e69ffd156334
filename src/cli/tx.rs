use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::{open_db, parse_amount_arg, parse_date_arg};
use crate::db::{decimal_col, decimal_param};
use crate::error::Result;
use crate::fmt::money;
use crate::journal;
use crate::models::{get_account_by_name, TransactionType};

pub fn add(
    account: &str,
    amount: &str,
    date: Option<&str>,
    description: &str,
    txn_type: Option<&str>,
) -> Result<()> {
    let conn = open_db()?;
    let account = get_account_by_name(&conn, account)?;
    let amount = parse_amount_arg(amount)?;
    let date = match date {
        Some(raw) => parse_date_arg(raw)?,
        None => chrono::Local::now().date_naive(),
    };
    let txn_type = match txn_type {
        Some(raw) => TransactionType::parse(raw)?,
        None if amount >= Decimal::ZERO => TransactionType::Income,
        None => TransactionType::Purchase,
    };
    conn.execute(
        "INSERT INTO transactions (date, account_id, amount, description, txn_type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            date,
            account.id,
            decimal_param(amount),
            description,
            txn_type.as_str()
        ],
    )?;
    println!("Added transaction {}", conn.last_insert_rowid());
    Ok(())
}

pub fn list(open_only: bool) -> Result<()> {
    let conn = open_db()?;
    let filter = if open_only { "WHERE t.is_closed = 0" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT t.id, t.date, a.name, t.amount, t.description, t.txn_type, t.is_closed \
         FROM transactions t JOIN accounts a ON a.id = t.account_id \
         {filter} ORDER BY t.date DESC, t.id DESC LIMIT 200"
    ))?;
    let rows: Vec<(i64, String, String, Decimal, String, String, bool)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                decimal_col(row, 3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Account", "Amount", "Description", "Type", "Status"]);
    for (id, date, account, amount, description, txn_type, is_closed) in rows {
        let status = if is_closed {
            "closed".normal()
        } else {
            "open".yellow()
        };
        table.add_row(vec![
            Cell::new(id),
            Cell::new(date),
            Cell::new(account),
            Cell::new(money(amount)),
            Cell::new(description),
            Cell::new(txn_type),
            Cell::new(status),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub fn link(a: i64, b: i64) -> Result<()> {
    let mut conn = open_db()?;
    journal::link(&mut conn, a, b)?;
    println!("Linked transactions {a} and {b}");
    Ok(())
}
