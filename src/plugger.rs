use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::balance::get_balance;
use crate::db::decimal_param;
use crate::error::{PennyError, Result};
use crate::models::{
    get_account_by_name, get_journal_entry_for_transaction, get_reconciliation, get_special_account,
    get_transaction, transaction_side, Account, Reconciliation, SpecialType, TransactionType,
};

#[derive(Debug, Clone)]
pub struct PlugResult {
    pub reconciliation_id: i64,
    pub transaction_id: i64,
    /// The plug transaction's amount after this call.
    pub plug_amount: Decimal,
}

/// Record a stated external balance for `(account, date)`. A second
/// statement for the same pair is a uniqueness conflict, not an update.
pub fn set_reconciliation(
    conn: &Connection,
    account_name: &str,
    date: NaiveDate,
    amount: Decimal,
) -> Result<Reconciliation> {
    let account = get_account_by_name(conn, account_name)?;
    conn.execute(
        "INSERT INTO reconciliations (account_id, date, amount) VALUES (?1, ?2, ?3)",
        rusqlite::params![account.id, date, decimal_param(amount)],
    )
    .map_err(|e| {
        PennyError::conflict_on_unique(
            e,
            &format!("reconciliation for '{account_name}' on {date} already exists"),
        )
    })?;
    Ok(Reconciliation {
        id: conn.last_insert_rowid(),
        account_id: account.id,
        date,
        amount,
        transaction_id: None,
    })
}

/// Change the stated amount of an existing reconciliation.
pub fn restate_reconciliation(
    conn: &Connection,
    account_name: &str,
    date: NaiveDate,
    amount: Decimal,
) -> Result<Reconciliation> {
    let account = get_account_by_name(conn, account_name)?;
    let recon = get_reconciliation(conn, account.id, date)?.ok_or_else(|| {
        PennyError::not_found("reconciliation", format!("{account_name} on {date}"))
    })?;
    conn.execute(
        "UPDATE reconciliations SET amount = ?1 WHERE id = ?2",
        rusqlite::params![decimal_param(amount), recon.id],
    )?;
    Ok(Reconciliation { amount, ..recon })
}

/// The plugging core, run inside the caller's open database transaction.
/// Creates the plug transaction on first use and updates it in place on
/// re-plugs; the journal entry items are always fully replaced.
pub(crate) fn plug_within(tx: &Connection, account: &Account, date: NaiveDate) -> Result<PlugResult> {
    let recon = get_reconciliation(tx, account.id, date)?.ok_or_else(|| {
        PennyError::not_found("reconciliation", format!("{} on {}", account.name, date))
    })?;
    let gains = get_special_account(tx, SpecialType::UnrealizedGains)?;

    let balance = get_balance(tx, account, recon.date, None)?;
    let existing_plug = match recon.transaction_id {
        Some(txn_id) => get_transaction(tx, txn_id)?.amount,
        None => Decimal::ZERO,
    };
    // The book balance already contains the old plug; reconcile against
    // the balance without it.
    let delta = recon.amount - (balance - existing_plug);
    let today = chrono::Local::now().date_naive();
    let description = format!("Reconciliation of {} at {}", account.name, recon.date);

    let transaction_id = match recon.transaction_id {
        Some(txn_id) => {
            tx.execute(
                "UPDATE transactions SET date = ?1, amount = ?2, description = ?3 WHERE id = ?4",
                rusqlite::params![recon.date, decimal_param(delta), description, txn_id],
            )?;
            txn_id
        }
        None => {
            tx.execute(
                "INSERT INTO transactions \
                 (date, account_id, amount, description, txn_type, is_closed, date_closed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                rusqlite::params![
                    recon.date,
                    account.id,
                    decimal_param(delta),
                    description,
                    TransactionType::Income.as_str(),
                    today
                ],
            )?;
            let txn_id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE reconciliations SET transaction_id = ?1 WHERE id = ?2",
                rusqlite::params![txn_id, recon.id],
            )?;
            txn_id
        }
    };

    let entry_id = match get_journal_entry_for_transaction(tx, transaction_id)? {
        Some(entry) => {
            tx.execute(
                "UPDATE journal_entries SET date = ?1, description = ?2 WHERE id = ?3",
                rusqlite::params![recon.date, description, entry.id],
            )?;
            tx.execute(
                "DELETE FROM journal_entry_items WHERE journal_entry_id = ?1",
                [entry.id],
            )?;
            entry.id
        }
        None => {
            tx.execute(
                "INSERT INTO journal_entries (transaction_id, date, description) \
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![transaction_id, recon.date, description],
            )?;
            tx.last_insert_rowid()
        }
    };

    // Two fresh items: one moving the target account by exactly delta,
    // the offset on the gains/losses account.
    let side = transaction_side(account.account_type, delta);
    let magnitude = decimal_param(delta.abs());
    for (account_id, item_side) in [(account.id, side), (gains.id, side.opposite())] {
        tx.execute(
            "INSERT INTO journal_entry_items (journal_entry_id, item_type, amount, account_id) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry_id, item_side.as_str(), magnitude, account_id],
        )?;
    }

    Ok(PlugResult {
        reconciliation_id: recon.id,
        transaction_id,
        plug_amount: delta,
    })
}

/// Plug the reconciliation for `(account, date)` atomically.
pub fn plug(conn: &mut Connection, account_name: &str, date: NaiveDate) -> Result<PlugResult> {
    let account = get_account_by_name(conn, account_name)?;
    let tx = conn.transaction()?;
    let result = plug_within(&tx, &account, date)?;
    tx.commit()?;
    Ok(result)
}
