use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::decimal_col;
use crate::error::Result;
use crate::models::{Account, AccountType, ItemType};

/// The single sign-convention rule every balance in the system goes
/// through: debit-increasing types read `debits - credits`, the rest read
/// `credits - debits`.
pub fn from_debit_and_credit(
    account_type: AccountType,
    debits: Decimal,
    credits: Decimal,
) -> Decimal {
    if account_type.is_debit_increasing() {
        debits - credits
    } else {
        credits - debits
    }
}

/// Raw debit/credit totals for an account over journal entries dated in
/// `<= end_date`, and `>= start_date` when one applies.
pub fn debit_credit_totals(
    conn: &Connection,
    account: &Account,
    end_date: NaiveDate,
    start_date: Option<NaiveDate>,
) -> Result<(Decimal, Decimal)> {
    // Income/expense accounts are period-scoped; balance-sheet accounts
    // always aggregate since inception.
    let start = if account.account_type.is_period_scoped() {
        start_date
    } else {
        None
    };

    let mut sql = String::from(
        "SELECT i.item_type, i.amount FROM journal_entry_items i \
         JOIN journal_entries e ON i.journal_entry_id = e.id \
         WHERE i.account_id = ?1 AND e.date <= ?2",
    );
    if start.is_some() {
        sql.push_str(" AND e.date >= ?3");
    }

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, Decimal)> {
        Ok((row.get(0)?, decimal_col(row, 1)?))
    };
    let rows: Vec<(String, Decimal)> = match start {
        Some(s) => stmt
            .query_map(rusqlite::params![account.id, end_date, s], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(rusqlite::params![account.id, end_date], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    let mut debits = Decimal::ZERO;
    let mut credits = Decimal::ZERO;
    for (item_type, amount) in rows {
        match ItemType::parse(&item_type)? {
            ItemType::Debit => debits += amount,
            ItemType::Credit => credits += amount,
        }
    }
    Ok((debits, credits))
}

/// Signed balance of an account at `end_date` (period-scoped from
/// `start_date` for income/expense accounts).
pub fn get_balance(
    conn: &Connection,
    account: &Account,
    end_date: NaiveDate,
    start_date: Option<NaiveDate>,
) -> Result<Decimal> {
    let (debits, credits) = debit_credit_totals(conn, account, end_date, start_date)?;
    Ok(from_debit_and_credit(account.account_type, debits, credits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::get_account_by_name;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// Insert a closed transaction with a two-item journal entry directly.
    fn seed_entry(
        conn: &Connection,
        day: &str,
        debit_account: &str,
        credit_account: &str,
        amount: Decimal,
    ) {
        let debit = get_account_by_name(conn, debit_account).unwrap();
        let credit = get_account_by_name(conn, credit_account).unwrap();
        conn.execute(
            "INSERT INTO transactions (date, account_id, amount, description, txn_type, is_closed) \
             VALUES (?1, ?2, ?3, 'seed', 'income', 1)",
            rusqlite::params![date(day), debit.id, crate::db::decimal_param(amount)],
        )
        .unwrap();
        let txn_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO journal_entries (transaction_id, date, description) VALUES (?1, ?2, 'seed')",
            rusqlite::params![txn_id, date(day)],
        )
        .unwrap();
        let entry_id = conn.last_insert_rowid();
        for (account_id, item_type) in [(debit.id, "debit"), (credit.id, "credit")] {
            conn.execute(
                "INSERT INTO journal_entry_items (journal_entry_id, item_type, amount, account_id) \
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![entry_id, item_type, crate::db::decimal_param(amount), account_id],
            )
            .unwrap();
        }
    }

    #[test]
    fn sign_convention_asset() {
        assert_eq!(
            from_debit_and_credit(AccountType::Asset, dec!(100), dec!(50)),
            dec!(50)
        );
    }

    #[test]
    fn sign_convention_liability() {
        assert_eq!(
            from_debit_and_credit(AccountType::Liability, dec!(100), dec!(150)),
            dec!(50)
        );
    }

    #[test]
    fn sign_convention_all_types() {
        assert_eq!(from_debit_and_credit(AccountType::Expense, dec!(30), dec!(10)), dec!(20));
        assert_eq!(from_debit_and_credit(AccountType::Income, dec!(10), dec!(30)), dec!(20));
        assert_eq!(from_debit_and_credit(AccountType::Equity, dec!(0), dec!(5)), dec!(5));
    }

    #[test]
    fn balance_sums_items_up_to_end_date() {
        let (_dir, conn) = test_db();
        seed_entry(&conn, "2025-01-15", "Checking", "Salary", dec!(1000));
        seed_entry(&conn, "2025-02-15", "Checking", "Salary", dec!(500));

        let checking = get_account_by_name(&conn, "Checking").unwrap();
        let balance = get_balance(&conn, &checking, date("2025-01-31"), None).unwrap();
        assert_eq!(balance, dec!(1000));
        let balance = get_balance(&conn, &checking, date("2025-12-31"), None).unwrap();
        assert_eq!(balance, dec!(1500));
    }

    #[test]
    fn income_accounts_are_period_scoped() {
        let (_dir, conn) = test_db();
        seed_entry(&conn, "2025-01-15", "Checking", "Salary", dec!(1000));
        seed_entry(&conn, "2025-02-15", "Checking", "Salary", dec!(500));

        let salary = get_account_by_name(&conn, "Salary").unwrap();
        let feb = get_balance(&conn, &salary, date("2025-02-28"), Some(date("2025-02-01"))).unwrap();
        assert_eq!(feb, dec!(500));
    }

    #[test]
    fn asset_accounts_ignore_start_date() {
        let (_dir, conn) = test_db();
        seed_entry(&conn, "2025-01-15", "Checking", "Salary", dec!(1000));
        seed_entry(&conn, "2025-02-15", "Checking", "Salary", dec!(500));

        let checking = get_account_by_name(&conn, "Checking").unwrap();
        // Asset balances are since-inception even when a period is passed.
        let balance =
            get_balance(&conn, &checking, date("2025-02-28"), Some(date("2025-02-01"))).unwrap();
        assert_eq!(balance, dec!(1500));
    }
}
