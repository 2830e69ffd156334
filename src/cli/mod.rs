pub mod accounts;
pub mod amortize;
pub mod entities;
pub mod entry;
pub mod import;
pub mod init;
pub mod receivables;
pub mod reconcile;
pub mod report;
pub mod status;
pub mod tax;
pub mod tx;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::get_connection;
use crate::error::{PennyError, Result};
use crate::journal::LineInput;
use crate::settings::db_path;

pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(PennyError::Settings(
            "database not found; run `penny init` first".into(),
        ));
    }
    get_connection(&path)
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    raw.parse().map_err(|_| PennyError::BadDate(raw.to_string()))
}

pub(crate) fn parse_amount_arg(raw: &str) -> Result<Decimal> {
    crate::importer::parse_amount(raw)
}

/// Parse a `--debit`/`--credit` line: `ACCOUNT:AMOUNT` or
/// `ACCOUNT:AMOUNT:ENTITY`.
pub(crate) fn parse_line_arg(raw: &str) -> Result<LineInput> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(PennyError::Validation(format!(
            "expected ACCOUNT:AMOUNT[:ENTITY], got '{raw}'"
        )));
    }
    Ok(LineInput {
        account_name: parts[0].trim().to_string(),
        amount: Some(parse_amount_arg(parts[1])?),
        entity_name: parts.get(2).map(|e| e.trim().to_string()),
        item_id: None,
    })
}

#[derive(Parser)]
#[command(name = "penny", about = "Double-entry bookkeeping CLI for a household ledger.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Penny: choose a data directory and initialize the database.
    Init {
        /// Path for Penny data (default: ~/Documents/penny)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage entities (counterparties).
    Entities {
        #[command(subcommand)]
        command: EntitiesCommands,
    },
    /// Manage transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Resolve a transaction into a balanced journal entry.
    Entry {
        /// Transaction id to resolve
        #[arg(long = "tx")]
        transaction_id: i64,
        /// Debit line, ACCOUNT:AMOUNT[:ENTITY] (repeatable)
        #[arg(long = "debit")]
        debits: Vec<String>,
        /// Credit line, ACCOUNT:AMOUNT[:ENTITY] (repeatable)
        #[arg(long = "credit")]
        credits: Vec<String>,
    },
    /// Import a CSV of transactions into an account.
    Import {
        /// Path to a date,description,amount CSV
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
    },
    /// Generate financial statements.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Record a statement balance and plug the difference.
    Reconcile {
        /// Account name
        account: String,
        /// Statement date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Statement ending balance
        #[arg(long)]
        amount: String,
        /// Restate an existing reconciliation instead of creating one
        #[arg(long)]
        restate: bool,
    },
    /// Manage amortization schedules.
    Amortize {
        #[command(subcommand)]
        command: AmortizeCommands,
    },
    /// Record tax charges.
    Tax {
        #[command(subcommand)]
        command: TaxCommands,
    },
    /// Accounts-receivable views per entity.
    Receivables {
        #[command(subcommand)]
        command: ReceivablesCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Vacation Fund'
        name: String,
        /// Account type: asset, liability, income, expense, equity
        #[arg(long = "type")]
        account_type: String,
        /// Sub type, e.g. cash, long_term_debt, purchases
        #[arg(long = "sub-type")]
        sub_type: String,
    },
    /// List all accounts with current balances.
    List,
    /// Close an account.
    Close {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum EntitiesCommands {
    /// Add a new entity.
    Add {
        /// Entity name
        name: String,
    },
    /// List all entities.
    List,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction manually.
    Add {
        /// Account the money moved on
        #[arg(long)]
        account: String,
        /// Signed amount; negative for outflows
        #[arg(long)]
        amount: String,
        /// Date: YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
        /// Description
        #[arg(long)]
        description: String,
        /// Type: income, purchase, payment, transfer
        #[arg(long = "type")]
        txn_type: Option<String>,
    },
    /// List transactions.
    List {
        /// Only show open (unresolved) transactions
        #[arg(long)]
        open: bool,
    },
    /// Link two sides of a transfer or payment recorded on two accounts.
    Link {
        /// First transaction id
        a: i64,
        /// Second transaction id
        b: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income statement for a date range.
    Income {
        /// Start date: YYYY-MM-DD (default: all history)
        #[arg(long)]
        from: Option<String>,
        /// End date: YYYY-MM-DD (default today)
        #[arg(long)]
        to: Option<String>,
    },
    /// Balance sheet as of a date.
    BalanceSheet {
        /// As-of date: YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Cash-flow statement for a date range.
    Cashflow {
        /// Start date: YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// End date: YYYY-MM-DD (default today)
        #[arg(long)]
        to: Option<String>,
    },
    /// Monthly balance trend for one account.
    Trend {
        /// Account name
        account: String,
        /// Start date: YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// End date: YYYY-MM-DD (default today)
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AmortizeCommands {
    /// Attach a schedule to an accrual transaction.
    Add {
        /// Transaction id of the prepaid accrual
        #[arg(long = "tx")]
        transaction_id: i64,
        /// Number of periods to spread over
        #[arg(long)]
        periods: i64,
        /// Expense account each period recognizes against
        #[arg(long)]
        account: String,
    },
    /// Release the next period of a schedule.
    Run {
        /// Amortization id
        id: i64,
        /// Recognition date: YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List schedules.
    List {
        /// Include fully released schedules
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum TaxCommands {
    /// Record (or restate) a tax charge.
    Charge {
        /// Charge type: federal, state, property
        charge_type: String,
        /// Charge date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Charge amount
        #[arg(long)]
        amount: String,
        /// Restate an existing charge instead of creating one
        #[arg(long)]
        restate: bool,
    },
    /// List recorded charges.
    List,
}

#[derive(Subcommand)]
pub enum ReceivablesCommands {
    /// Outstanding balance per entity.
    List,
    /// Dated history with running balance for one entity.
    History {
        /// Entity name
        entity: String,
    },
    /// Receivable items with no entity tagged.
    Untagged,
    /// Tag an item with an entity (created if new).
    Tag {
        /// Journal entry item id
        item: i64,
        /// Entity name
        entity: String,
    },
    /// Remove the entity tag from an item.
    Untag {
        /// Journal entry item id
        item: i64,
    },
}
