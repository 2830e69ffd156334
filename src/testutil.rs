//! Shared seeding helpers for unit tests.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::decimal_param;
use crate::journal::{save, LineInput};
use crate::models::get_account_by_name;

/// Insert an open transaction and return its id.
pub fn seed_txn(conn: &Connection, day: &str, account: &str, amount: Decimal, txn_type: &str) -> i64 {
    let account = get_account_by_name(conn, account).unwrap();
    conn.execute(
        "INSERT INTO transactions (date, account_id, amount, description, txn_type) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            day.parse::<NaiveDate>().unwrap(),
            account.id,
            decimal_param(amount),
            format!("{txn_type} {amount}"),
            txn_type
        ],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn lines(pairs: &[(&str, Decimal)]) -> Vec<LineInput> {
    pairs
        .iter()
        .map(|(account, amount)| LineInput {
            account_name: account.to_string(),
            amount: Some(*amount),
            ..Default::default()
        })
        .collect()
}

/// Resolve a transaction through the regular save path.
pub fn save_entry(
    conn: &mut Connection,
    transaction_id: i64,
    debits: &[(&str, Decimal)],
    credits: &[(&str, Decimal)],
) -> i64 {
    save(conn, transaction_id, lines(debits), lines(credits), None)
        .unwrap()
        .journal_entry_id
}
