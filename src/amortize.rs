use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::db::{decimal_col, decimal_param};
use crate::error::{PennyError, Result};
use crate::models::{
    get_account, get_account_by_name, get_amortization, get_special_account, get_transaction,
    Amortization, ItemType, SpecialType, TransactionType,
};

#[derive(Debug, Clone)]
pub struct AmortizeResult {
    pub amortization_id: i64,
    pub transaction_id: i64,
    pub period: i64,
    pub amount: Decimal,
    pub closed: bool,
}

/// Attach an amortization schedule to an accrual transaction. The
/// schedule total is the transaction's magnitude; each call to
/// [`amortize`] releases one period.
pub fn create_schedule(
    conn: &Connection,
    transaction_id: i64,
    periods: i64,
    suggested_account_name: &str,
) -> Result<Amortization> {
    if periods < 1 {
        return Err(PennyError::Validation(
            "amortization needs at least one period".into(),
        ));
    }
    let txn = get_transaction(conn, transaction_id)?;
    let suggested = get_account_by_name(conn, suggested_account_name)?;
    let amount = txn.amount.abs();
    if amount == Decimal::ZERO {
        return Err(PennyError::Validation(
            "cannot amortize a zero-amount transaction".into(),
        ));
    }
    conn.execute(
        "INSERT INTO amortizations \
         (amount, periods, suggested_account_id, description, transaction_id) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            decimal_param(amount),
            periods,
            suggested.id,
            txn.description,
            transaction_id
        ],
    )
    .map_err(|e| {
        PennyError::conflict_on_unique(
            e,
            &format!("transaction {transaction_id} already has an amortization schedule"),
        )
    })?;
    Ok(Amortization {
        id: conn.last_insert_rowid(),
        amount,
        periods,
        suggested_account_id: suggested.id,
        description: txn.description,
        transaction_id: Some(transaction_id),
        is_closed: false,
    })
}

/// Release the next period of a schedule: a closed transaction relieving
/// Prepaid Expenses, with the expense recognized on the schedule's
/// suggested account. Periods are floored to cents; the final period
/// absorbs whatever remains so the released total equals the schedule
/// amount exactly.
pub fn amortize(conn: &mut Connection, amortization_id: i64, date: NaiveDate) -> Result<AmortizeResult> {
    let sched = get_amortization(conn, amortization_id)?;
    if sched.is_closed {
        return Err(PennyError::Validation(format!(
            "amortization {amortization_id} is already fully released"
        )));
    }
    let (released_count, released_total) = released_so_far(conn, amortization_id)?;
    if released_count >= sched.periods {
        return Err(PennyError::Validation(format!(
            "amortization {amortization_id} has no remaining periods"
        )));
    }
    let prepaid = get_special_account(conn, SpecialType::PrepaidExpenses)?;
    let suggested = get_account(conn, sched.suggested_account_id)?;

    let period = released_count + 1;
    let amount = if period == sched.periods {
        sched.amount - released_total
    } else {
        (sched.amount / Decimal::from(sched.periods))
            .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity)
    };
    let today = chrono::Local::now().date_naive();
    let description = format!("{} ({}/{})", sched.description, period, sched.periods);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO transactions \
         (date, account_id, amount, description, txn_type, is_closed, date_closed, amortization_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
        rusqlite::params![
            date,
            prepaid.id,
            decimal_param(-amount),
            description,
            TransactionType::Purchase.as_str(),
            today,
            amortization_id
        ],
    )?;
    let transaction_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO journal_entries (transaction_id, date, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![transaction_id, date, description],
    )?;
    let entry_id = tx.last_insert_rowid();
    let magnitude = decimal_param(amount);
    for (account_id, side) in [
        (suggested.id, ItemType::Debit),
        (prepaid.id, ItemType::Credit),
    ] {
        tx.execute(
            "INSERT INTO journal_entry_items (journal_entry_id, item_type, amount, account_id) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry_id, side.as_str(), magnitude, account_id],
        )?;
    }

    let closed = period == sched.periods;
    if closed {
        tx.execute(
            "UPDATE amortizations SET is_closed = 1 WHERE id = ?1",
            [amortization_id],
        )?;
    }
    tx.commit()?;

    Ok(AmortizeResult {
        amortization_id,
        transaction_id,
        period,
        amount,
        closed,
    })
}

fn released_so_far(conn: &Connection, amortization_id: i64) -> Result<(i64, Decimal)> {
    let mut stmt =
        conn.prepare("SELECT amount FROM transactions WHERE amortization_id = ?1")?;
    let amounts = stmt
        .query_map([amortization_id], |row| decimal_col(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let total = amounts.iter().map(|a| a.abs()).sum();
    Ok((amounts.len() as i64, total))
}

pub fn list_schedules(conn: &Connection, include_closed: bool) -> Result<Vec<Amortization>> {
    let filter = if include_closed { "" } else { "WHERE is_closed = 0" };
    let mut stmt = conn.prepare(&format!(
        "SELECT id, amount, periods, suggested_account_id, description, transaction_id, is_closed \
         FROM amortizations {filter} ORDER BY id"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Amortization {
                id: row.get(0)?,
                amount: decimal_col(row, 1)?,
                periods: row.get(2)?,
                suggested_account_id: row.get(3)?,
                description: row.get(4)?,
                transaction_id: row.get(5)?,
                is_closed: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::get_balance;
    use crate::db::test_db;
    use crate::testutil::{save_entry, seed_txn};
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Pay 1000 up front into Prepaid Expenses and schedule it out.
    fn seed_schedule(conn: &mut Connection, periods: i64) -> i64 {
        let txn = seed_txn(conn, "2025-01-01", "Checking", dec!(-1000), "purchase");
        save_entry(
            conn,
            txn,
            &[("Prepaid Expenses", dec!(1000))],
            &[("Checking", dec!(1000))],
        );
        create_schedule(conn, txn, periods, "Insurance").unwrap().id
    }

    #[test]
    fn floored_periods_with_remainder_in_the_last() {
        let (_dir, mut conn) = test_db();
        let sched = seed_schedule(&mut conn, 6);

        let mut amounts = Vec::new();
        for month in 1..=6 {
            let day = format!("2025-{month:02}-28");
            amounts.push(amortize(&mut conn, sched, date(&day)).unwrap().amount);
        }
        assert_eq!(
            amounts,
            vec![
                dec!(166.66),
                dec!(166.66),
                dec!(166.66),
                dec!(166.66),
                dec!(166.66),
                dec!(166.70)
            ]
        );
        assert_eq!(amounts.iter().sum::<Decimal>(), dec!(1000));

        // Fully relieved and recognized.
        let prepaid = crate::models::get_account_by_name(&conn, "Prepaid Expenses").unwrap();
        assert_eq!(get_balance(&conn, &prepaid, date("2025-12-31"), None).unwrap(), dec!(0));
        let insurance = crate::models::get_account_by_name(&conn, "Insurance").unwrap();
        assert_eq!(
            get_balance(&conn, &insurance, date("2025-12-31"), None).unwrap(),
            dec!(1000)
        );
    }

    #[test]
    fn exhausted_schedule_refuses_another_period() {
        let (_dir, mut conn) = test_db();
        let sched = seed_schedule(&mut conn, 2);
        amortize(&mut conn, sched, date("2025-01-31")).unwrap();
        let last = amortize(&mut conn, sched, date("2025-02-28")).unwrap();
        assert!(last.closed);
        assert!(get_amortization(&conn, sched).unwrap().is_closed);

        let result = amortize(&mut conn, sched, date("2025-03-31"));
        assert!(matches!(result, Err(PennyError::Validation(_))));
    }

    #[test]
    fn single_period_releases_everything_at_once() {
        let (_dir, mut conn) = test_db();
        let sched = seed_schedule(&mut conn, 1);
        let result = amortize(&mut conn, sched, date("2025-01-31")).unwrap();
        assert_eq!(result.amount, dec!(1000));
        assert!(result.closed);
    }

    #[test]
    fn schedule_needs_at_least_one_period() {
        let (_dir, mut conn) = test_db();
        let txn = seed_txn(&mut conn, "2025-01-01", "Checking", dec!(-1000), "purchase");
        let result = create_schedule(&conn, txn, 0, "Insurance");
        assert!(matches!(result, Err(PennyError::Validation(_))));
    }

    #[test]
    fn one_schedule_per_transaction() {
        let (_dir, mut conn) = test_db();
        let sched = seed_schedule(&mut conn, 6);
        let txn = get_amortization(&conn, sched).unwrap().transaction_id.unwrap();
        let result = create_schedule(&conn, txn, 3, "Insurance");
        assert!(matches!(result, Err(PennyError::Conflict(_))));
    }
}
