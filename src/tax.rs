use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::balance::get_balance;
use crate::db::{decimal_col, decimal_param};
use crate::error::{PennyError, Result};
use crate::models::{
    get_journal_entry_for_transaction, get_reconciliation, get_special_account, Account, ItemType,
    SpecialType, TaxCharge, TaxChargeType, TransactionType,
};
use crate::plugger;

/// Accrue a tax charge: an expense transaction against the Taxes account,
/// booked as debit Taxes / credit the matching payable. One charge per
/// `(type, date)`.
pub fn record(
    conn: &mut Connection,
    charge_type: TaxChargeType,
    date: NaiveDate,
    amount: Decimal,
) -> Result<TaxCharge> {
    if amount < Decimal::ZERO {
        return Err(PennyError::Validation(
            "tax charge amount cannot be negative".into(),
        ));
    }
    let expense = get_special_account(conn, SpecialType::Taxes)?;
    let payable = get_special_account(conn, charge_type.payable_special())?;
    let today = chrono::Local::now().date_naive();
    let description = format!("{} taxes accrued {}", charge_type.as_str(), date);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO tax_charges (charge_type, date, amount) VALUES (?1, ?2, ?3)",
        rusqlite::params![charge_type.as_str(), date, decimal_param(amount)],
    )
    .map_err(|e| {
        PennyError::conflict_on_unique(
            e,
            &format!(
                "a {} tax charge for {} already exists",
                charge_type.as_str(),
                date
            ),
        )
    })?;
    let charge_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO transactions \
         (date, account_id, amount, description, txn_type, is_closed, date_closed) \
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        rusqlite::params![
            date,
            expense.id,
            decimal_param(amount),
            description,
            TransactionType::Purchase.as_str(),
            today
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE tax_charges SET transaction_id = ?1 WHERE id = ?2",
        rusqlite::params![transaction_id, charge_id],
    )?;

    tx.execute(
        "INSERT INTO journal_entries (transaction_id, date, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![transaction_id, date, description],
    )?;
    let entry_id = tx.last_insert_rowid();
    insert_items(&tx, entry_id, amount, &expense, &payable)?;

    refresh_reconciliation(&tx, &payable, date)?;
    tx.commit()?;

    Ok(TaxCharge {
        id: charge_id,
        charge_type,
        date,
        amount,
        transaction_id: Some(transaction_id),
    })
}

/// Restate an existing charge's amount, rewriting its transaction and
/// journal entry in place.
pub fn update(
    conn: &mut Connection,
    charge_type: TaxChargeType,
    date: NaiveDate,
    amount: Decimal,
) -> Result<TaxCharge> {
    if amount < Decimal::ZERO {
        return Err(PennyError::Validation(
            "tax charge amount cannot be negative".into(),
        ));
    }
    let charge = get_charge(conn, charge_type, date)?;
    let expense = get_special_account(conn, SpecialType::Taxes)?;
    let payable = get_special_account(conn, charge_type.payable_special())?;

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE tax_charges SET amount = ?1 WHERE id = ?2",
        rusqlite::params![decimal_param(amount), charge.id],
    )?;
    if let Some(transaction_id) = charge.transaction_id {
        tx.execute(
            "UPDATE transactions SET amount = ?1 WHERE id = ?2",
            rusqlite::params![decimal_param(amount), transaction_id],
        )?;
        if let Some(entry) = get_journal_entry_for_transaction(&tx, transaction_id)? {
            tx.execute(
                "DELETE FROM journal_entry_items WHERE journal_entry_id = ?1",
                [entry.id],
            )?;
            insert_items(&tx, entry.id, amount, &expense, &payable)?;
        }
    }
    refresh_reconciliation(&tx, &payable, date)?;
    tx.commit()?;

    Ok(TaxCharge { amount, ..charge })
}

fn insert_items(
    tx: &Connection,
    entry_id: i64,
    amount: Decimal,
    expense: &Account,
    payable: &Account,
) -> Result<()> {
    let magnitude = decimal_param(amount);
    for (account_id, side) in [(expense.id, ItemType::Debit), (payable.id, ItemType::Credit)] {
        tx.execute(
            "INSERT INTO journal_entry_items (journal_entry_id, item_type, amount, account_id) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry_id, side.as_str(), magnitude, account_id],
        )?;
    }
    Ok(())
}

/// A reconciliation already booked against the payable for this date was
/// stated before the charge moved the balance; bring its stated amount up
/// to the new book balance and rewrite its plug so the plug stays a
/// genuine external adjustment rather than absorbing the accrual.
fn refresh_reconciliation(tx: &Connection, payable: &Account, date: NaiveDate) -> Result<()> {
    let Some(recon) = get_reconciliation(tx, payable.id, date)? else {
        return Ok(());
    };
    let balance = get_balance(tx, payable, date, None)?;
    tx.execute(
        "UPDATE reconciliations SET amount = ?1 WHERE id = ?2",
        rusqlite::params![decimal_param(balance), recon.id],
    )?;
    if recon.transaction_id.is_some() {
        plugger::plug_within(tx, payable, date)?;
    }
    Ok(())
}

pub fn get_charge(conn: &Connection, charge_type: TaxChargeType, date: NaiveDate) -> Result<TaxCharge> {
    conn.query_row(
        "SELECT id, charge_type, date, amount, transaction_id FROM tax_charges \
         WHERE charge_type = ?1 AND date = ?2",
        rusqlite::params![charge_type.as_str(), date],
        charge_from_row,
    )
    .map_err(|e| {
        PennyError::not_found_on_empty(
            e,
            "tax charge",
            format!("{} on {}", charge_type.as_str(), date),
        )
    })
}

pub fn list_charges(conn: &Connection) -> Result<Vec<TaxCharge>> {
    let mut stmt = conn.prepare(
        "SELECT id, charge_type, date, amount, transaction_id FROM tax_charges \
         ORDER BY date DESC, charge_type",
    )?;
    let rows = stmt
        .query_map([], charge_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn charge_from_row(row: &rusqlite::Row) -> rusqlite::Result<TaxCharge> {
    let raw_type: String = row.get(1)?;
    Ok(TaxCharge {
        id: row.get(0)?,
        charge_type: TaxChargeType::parse(&raw_type).map_err(|_| {
            rusqlite::Error::InvalidColumnType(1, raw_type, rusqlite::types::Type::Text)
        })?,
        date: row.get(2)?,
        amount: decimal_col(row, 3)?,
        transaction_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn balance_of(conn: &Connection, special: SpecialType, day: &str) -> Decimal {
        let account = get_special_account(conn, special).unwrap();
        get_balance(conn, &account, date(day), None).unwrap()
    }

    #[test]
    fn record_books_expense_and_payable() {
        let (_dir, mut conn) = test_db();
        let charge = record(&mut conn, TaxChargeType::Federal, date("2025-04-15"), dec!(1200)).unwrap();
        assert!(charge.transaction_id.is_some());
        assert_eq!(balance_of(&conn, SpecialType::Taxes, "2025-04-15"), dec!(1200));
        assert_eq!(
            balance_of(&conn, SpecialType::FederalTaxesPayable, "2025-04-15"),
            dec!(1200)
        );
        // State payable untouched.
        assert_eq!(
            balance_of(&conn, SpecialType::StateTaxesPayable, "2025-04-15"),
            dec!(0)
        );
    }

    #[test]
    fn same_type_and_date_conflicts() {
        let (_dir, mut conn) = test_db();
        record(&mut conn, TaxChargeType::State, date("2025-04-15"), dec!(300)).unwrap();
        let result = record(&mut conn, TaxChargeType::State, date("2025-04-15"), dec!(400));
        assert!(matches!(result, Err(PennyError::Conflict(_))));
        // The failed attempt left no transaction behind.
        let count: i64 = conn
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn different_types_may_share_a_date() {
        let (_dir, mut conn) = test_db();
        record(&mut conn, TaxChargeType::Federal, date("2025-04-15"), dec!(1200)).unwrap();
        record(&mut conn, TaxChargeType::State, date("2025-04-15"), dec!(300)).unwrap();
        assert_eq!(list_charges(&conn).unwrap().len(), 2);
    }

    #[test]
    fn update_restates_the_books() {
        let (_dir, mut conn) = test_db();
        record(&mut conn, TaxChargeType::Property, date("2025-06-01"), dec!(800)).unwrap();
        update(&mut conn, TaxChargeType::Property, date("2025-06-01"), dec!(950)).unwrap();
        assert_eq!(balance_of(&conn, SpecialType::Taxes, "2025-06-01"), dec!(950));
        assert_eq!(
            balance_of(&conn, SpecialType::PropertyTaxesPayable, "2025-06-01"),
            dec!(950)
        );
    }

    #[test]
    fn record_refreshes_existing_reconciliation() {
        let (_dir, mut conn) = test_db();
        // The payable was reconciled to zero before the charge arrived.
        crate::plugger::set_reconciliation(
            &conn,
            "Federal Taxes Payable",
            date("2025-04-15"),
            dec!(0),
        )
        .unwrap();
        crate::plugger::plug(&mut conn, "Federal Taxes Payable", date("2025-04-15")).unwrap();

        record(&mut conn, TaxChargeType::Federal, date("2025-04-15"), dec!(500)).unwrap();

        let payable = get_special_account(&conn, SpecialType::FederalTaxesPayable).unwrap();
        let recon = get_reconciliation(&conn, payable.id, date("2025-04-15"))
            .unwrap()
            .unwrap();
        assert_eq!(recon.amount, dec!(500));
        // The plug did not absorb the charge.
        let plug_txn = crate::models::get_transaction(&conn, recon.transaction_id.unwrap()).unwrap();
        assert_eq!(plug_txn.amount, dec!(0));
    }
}
