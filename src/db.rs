use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL,
    sub_type TEXT NOT NULL,
    special_type TEXT UNIQUE,
    is_closed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    is_closed INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS amortizations (
    id INTEGER PRIMARY KEY,
    amount TEXT NOT NULL,
    periods INTEGER NOT NULL,
    suggested_account_id INTEGER NOT NULL REFERENCES accounts(id),
    description TEXT NOT NULL,
    transaction_id INTEGER UNIQUE REFERENCES transactions(id),
    is_closed INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS prefills (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    amount TEXT NOT NULL,
    description TEXT NOT NULL,
    txn_type TEXT NOT NULL,
    is_closed INTEGER NOT NULL DEFAULT 0,
    date_closed TEXT,
    suggested_account_id INTEGER REFERENCES accounts(id),
    suggested_entity_id INTEGER REFERENCES entities(id),
    linked_transaction_id INTEGER UNIQUE REFERENCES transactions(id),
    amortization_id INTEGER REFERENCES amortizations(id),
    prefill_id INTEGER REFERENCES prefills(id),
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id INTEGER PRIMARY KEY,
    transaction_id INTEGER NOT NULL UNIQUE REFERENCES transactions(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS journal_entry_items (
    id INTEGER PRIMARY KEY,
    journal_entry_id INTEGER NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    item_type TEXT NOT NULL CHECK (item_type IN ('debit', 'credit')),
    amount TEXT NOT NULL,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    entity_id INTEGER REFERENCES entities(id)
);

CREATE TABLE IF NOT EXISTS reconciliations (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    transaction_id INTEGER UNIQUE REFERENCES transactions(id),
    UNIQUE (account_id, date)
);

CREATE TABLE IF NOT EXISTS tax_charges (
    id INTEGER PRIMARY KEY,
    charge_type TEXT NOT NULL,
    date TEXT NOT NULL,
    amount TEXT NOT NULL,
    transaction_id INTEGER UNIQUE REFERENCES transactions(id),
    UNIQUE (charge_type, date)
);

CREATE TABLE IF NOT EXISTS paystubs (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    journal_entry_id INTEGER REFERENCES journal_entries(id)
);

CREATE INDEX IF NOT EXISTS idx_items_account ON journal_entry_items(account_id);
CREATE INDEX IF NOT EXISTS idx_items_entry ON journal_entry_items(journal_entry_id);
CREATE INDEX IF NOT EXISTS idx_entries_date ON journal_entries(date);
CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
";

// (name, account_type, sub_type, special_type)
const DEFAULT_ACCOUNTS: &[(&str, &str, &str, Option<&str>)] = &[
    // Assets
    ("Wallet", "asset", "cash", Some("wallet")),
    ("Checking", "asset", "cash", None),
    ("Savings", "asset", "cash", None),
    ("Brokerage", "asset", "securities_unrestricted", None),
    ("401(k)", "asset", "securities_retirement", None),
    ("Home", "asset", "real_estate", None),
    ("Accounts Receivable", "asset", "accounts_receivable", None),
    ("Prepaid Expenses", "asset", "prepaid_expenses", Some("prepaid_expenses")),
    // Liabilities
    ("Credit Card", "liability", "short_term_debt", None),
    ("Mortgage", "liability", "long_term_debt", None),
    ("Federal Taxes Payable", "liability", "taxes_payable", Some("federal_taxes_payable")),
    ("State Taxes Payable", "liability", "taxes_payable", Some("state_taxes_payable")),
    ("Property Taxes Payable", "liability", "taxes_payable", Some("property_taxes_payable")),
    // Income
    ("Salary", "income", "salary", None),
    ("Dividends & Interest", "income", "dividends_and_interest", None),
    ("Investment Gains/Losses", "income", "unrealized_investment_gains", Some("unrealized_gains")),
    ("Other Income", "income", "other_income", None),
    // Expenses
    ("Groceries", "expense", "purchases", None),
    ("Utilities", "expense", "purchases", None),
    ("Insurance", "expense", "purchases", None),
    ("Interest Expense", "expense", "interest_expense", None),
    ("Taxes", "expense", "tax", Some("taxes")),
    // Equity
    ("Opening Balances", "equity", "retained_earnings", None),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |row| row.get(0))?;
    if count == 0 {
        for acct in DEFAULT_ACCOUNTS {
            conn.execute(
                "INSERT INTO accounts (name, account_type, sub_type, special_type) \
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![acct.0, acct.1, acct.2, acct.3],
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decimal storage helpers
//
// Amounts live in TEXT columns so no precision is lost; all arithmetic and
// aggregation happens in Rust on rust_decimal::Decimal.
// ---------------------------------------------------------------------------

pub fn decimal_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn decimal_param(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Scratch database for unit tests; the TempDir must stay alive for the
/// duration of the test.
#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
