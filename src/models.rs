use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{PennyError, Result};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Asset,
    Liability,
    Income,
    Expense,
    Equity,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
            AccountType::Equity => "equity",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            "equity" => Ok(AccountType::Equity),
            _ => Err(PennyError::not_found("account type", s)),
        }
    }

    /// Assets and expenses grow on the debit side; everything else grows
    /// on the credit side.
    pub fn is_debit_increasing(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Income and expense balances are period-scoped; balance-sheet types
    /// accumulate since inception.
    pub fn is_period_scoped(&self) -> bool {
        matches!(self, AccountType::Income | AccountType::Expense)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountSubType {
    // asset
    Cash,
    SecuritiesRetirement,
    SecuritiesUnrestricted,
    RealEstate,
    AccountsReceivable,
    PrepaidExpenses,
    // liability
    ShortTermDebt,
    LongTermDebt,
    TaxesPayable,
    // income
    Salary,
    DividendsAndInterest,
    UnrealizedInvestmentGains,
    OtherIncome,
    // expense
    Purchases,
    Tax,
    InterestExpense,
    // equity
    RetainedEarnings,
}

impl AccountSubType {
    pub const ALL: &'static [AccountSubType] = &[
        AccountSubType::Cash,
        AccountSubType::SecuritiesRetirement,
        AccountSubType::SecuritiesUnrestricted,
        AccountSubType::RealEstate,
        AccountSubType::AccountsReceivable,
        AccountSubType::PrepaidExpenses,
        AccountSubType::ShortTermDebt,
        AccountSubType::LongTermDebt,
        AccountSubType::TaxesPayable,
        AccountSubType::Salary,
        AccountSubType::DividendsAndInterest,
        AccountSubType::UnrealizedInvestmentGains,
        AccountSubType::OtherIncome,
        AccountSubType::Purchases,
        AccountSubType::Tax,
        AccountSubType::InterestExpense,
        AccountSubType::RetainedEarnings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountSubType::Cash => "cash",
            AccountSubType::SecuritiesRetirement => "securities_retirement",
            AccountSubType::SecuritiesUnrestricted => "securities_unrestricted",
            AccountSubType::RealEstate => "real_estate",
            AccountSubType::AccountsReceivable => "accounts_receivable",
            AccountSubType::PrepaidExpenses => "prepaid_expenses",
            AccountSubType::ShortTermDebt => "short_term_debt",
            AccountSubType::LongTermDebt => "long_term_debt",
            AccountSubType::TaxesPayable => "taxes_payable",
            AccountSubType::Salary => "salary",
            AccountSubType::DividendsAndInterest => "dividends_and_interest",
            AccountSubType::UnrealizedInvestmentGains => "unrealized_investment_gains",
            AccountSubType::OtherIncome => "other_income",
            AccountSubType::Purchases => "purchases",
            AccountSubType::Tax => "tax",
            AccountSubType::InterestExpense => "interest_expense",
            AccountSubType::RetainedEarnings => "retained_earnings",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| PennyError::not_found("account sub type", s))
    }

    /// Total mapping: every sub type belongs to exactly one account type.
    pub fn account_type(&self) -> AccountType {
        match self {
            AccountSubType::Cash
            | AccountSubType::SecuritiesRetirement
            | AccountSubType::SecuritiesUnrestricted
            | AccountSubType::RealEstate
            | AccountSubType::AccountsReceivable
            | AccountSubType::PrepaidExpenses => AccountType::Asset,
            AccountSubType::ShortTermDebt
            | AccountSubType::LongTermDebt
            | AccountSubType::TaxesPayable => AccountType::Liability,
            AccountSubType::Salary
            | AccountSubType::DividendsAndInterest
            | AccountSubType::UnrealizedInvestmentGains
            | AccountSubType::OtherIncome => AccountType::Income,
            AccountSubType::Purchases | AccountSubType::Tax | AccountSubType::InterestExpense => {
                AccountType::Expense
            }
            AccountSubType::RetainedEarnings => AccountType::Equity,
        }
    }
}

/// Tags identifying singleton accounts the services look up by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialType {
    UnrealizedGains,
    PrepaidExpenses,
    Wallet,
    Taxes,
    FederalTaxesPayable,
    StateTaxesPayable,
    PropertyTaxesPayable,
}

impl SpecialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialType::UnrealizedGains => "unrealized_gains",
            SpecialType::PrepaidExpenses => "prepaid_expenses",
            SpecialType::Wallet => "wallet",
            SpecialType::Taxes => "taxes",
            SpecialType::FederalTaxesPayable => "federal_taxes_payable",
            SpecialType::StateTaxesPayable => "state_taxes_payable",
            SpecialType::PropertyTaxesPayable => "property_taxes_payable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Income,
    Purchase,
    Payment,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Purchase => "purchase",
            TransactionType::Payment => "payment",
            TransactionType::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(TransactionType::Income),
            "purchase" => Ok(TransactionType::Purchase),
            "payment" => Ok(TransactionType::Payment),
            "transfer" => Ok(TransactionType::Transfer),
            _ => Err(PennyError::not_found("transaction type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Debit,
    Credit,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Debit => "debit",
            ItemType::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "debit" => Ok(ItemType::Debit),
            "credit" => Ok(ItemType::Credit),
            _ => Err(PennyError::not_found("item type", s)),
        }
    }

    pub fn opposite(&self) -> ItemType {
        match self {
            ItemType::Debit => ItemType::Credit,
            ItemType::Credit => ItemType::Debit,
        }
    }
}

/// The journal-entry side a transaction's own line must land on: the side
/// that grows the account for a positive amount, the opposite side for a
/// negative one.
pub fn transaction_side(account_type: AccountType, amount: Decimal) -> ItemType {
    let natural = if account_type.is_debit_increasing() {
        ItemType::Debit
    } else {
        ItemType::Credit
    };
    if amount.is_sign_negative() {
        natural.opposite()
    } else {
        natural
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub sub_type: AccountSubType,
    pub special_type: Option<String>,
    pub is_closed: bool,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub is_closed: bool,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub account_id: i64,
    pub amount: Decimal,
    pub description: String,
    pub txn_type: TransactionType,
    pub is_closed: bool,
    pub date_closed: Option<NaiveDate>,
    pub suggested_account_id: Option<i64>,
    pub suggested_entity_id: Option<i64>,
    pub linked_transaction_id: Option<i64>,
    pub amortization_id: Option<i64>,
    pub prefill_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub id: i64,
    pub transaction_id: i64,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct JournalEntryItem {
    pub id: i64,
    pub journal_entry_id: i64,
    pub item_type: ItemType,
    pub amount: Decimal,
    pub account_id: i64,
    pub entity_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Amortization {
    pub id: i64,
    pub amount: Decimal,
    pub periods: i64,
    pub suggested_account_id: i64,
    pub description: String,
    pub transaction_id: Option<i64>,
    pub is_closed: bool,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub id: i64,
    pub account_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxChargeType {
    Federal,
    State,
    Property,
}

impl TaxChargeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxChargeType::Federal => "federal",
            TaxChargeType::State => "state",
            TaxChargeType::Property => "property",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "federal" => Ok(TaxChargeType::Federal),
            "state" => Ok(TaxChargeType::State),
            "property" => Ok(TaxChargeType::Property),
            _ => Err(PennyError::not_found("tax charge type", s)),
        }
    }

    /// The payable account this charge type accrues against.
    pub fn payable_special(&self) -> SpecialType {
        match self {
            TaxChargeType::Federal => SpecialType::FederalTaxesPayable,
            TaxChargeType::State => SpecialType::StateTaxesPayable,
            TaxChargeType::Property => SpecialType::PropertyTaxesPayable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaxCharge {
    pub id: i64,
    pub charge_type: TaxChargeType,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub transaction_id: Option<i64>,
}

// ---------------------------------------------------------------------------
// Lookups shared by the service modules
// ---------------------------------------------------------------------------

const ACCOUNT_COLS: &str = "id, name, account_type, sub_type, special_type, is_closed";

type RawAccount = (i64, String, String, String, Option<String>, bool);

fn account_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawAccount> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_account(raw: RawAccount) -> Result<Account> {
    let (id, name, account_type, sub_type, special_type, is_closed) = raw;
    Ok(Account {
        id,
        name,
        account_type: AccountType::parse(&account_type)?,
        sub_type: AccountSubType::parse(&sub_type)?,
        special_type,
        is_closed,
    })
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    let raw = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id = ?1"),
            [id],
            account_from_row,
        )
        .map_err(|e| PennyError::not_found_on_empty(e, "account", id))?;
    build_account(raw)
}

pub fn get_account_by_name(conn: &Connection, name: &str) -> Result<Account> {
    let raw = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE name = ?1"),
            [name],
            account_from_row,
        )
        .map_err(|e| PennyError::not_found_on_empty(e, "account", name))?;
    build_account(raw)
}

/// Resolve a singleton account by its special-type tag. Services resolve
/// these once per operation instead of scattering ad-hoc queries.
pub fn get_special_account(conn: &Connection, special: SpecialType) -> Result<Account> {
    let raw = conn
        .query_row(
            &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE special_type = ?1"),
            [special.as_str()],
            account_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                PennyError::MissingSpecialAccount(special.as_str().to_string())
            }
            e => PennyError::Db(e),
        })?;
    build_account(raw)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("SELECT {ACCOUNT_COLS} FROM accounts ORDER BY name"))?;
    let raw: Vec<RawAccount> = stmt
        .query_map([], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.into_iter().map(build_account).collect()
}

pub fn get_entity_by_name(conn: &Connection, name: &str) -> Result<Entity> {
    conn.query_row(
        "SELECT id, name, is_closed FROM entities WHERE name = ?1",
        [name],
        |row| {
            Ok(Entity {
                id: row.get(0)?,
                name: row.get(1)?,
                is_closed: row.get(2)?,
            })
        },
    )
    .map_err(|e| PennyError::not_found_on_empty(e, "entity", name))
}

const TXN_COLS: &str = "id, date, account_id, amount, description, txn_type, is_closed, \
                        date_closed, suggested_account_id, suggested_entity_id, \
                        linked_transaction_id, amortization_id, prefill_id";

pub(crate) fn txn_from_row(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let txn_type: String = row.get(5)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        account_id: row.get(2)?,
        amount: crate::db::decimal_col(row, 3)?,
        description: row.get(4)?,
        txn_type: TransactionType::parse(&txn_type).map_err(|_| {
            rusqlite::Error::InvalidColumnType(5, "txn_type".into(), rusqlite::types::Type::Text)
        })?,
        is_closed: row.get(6)?,
        date_closed: row.get(7)?,
        suggested_account_id: row.get(8)?,
        suggested_entity_id: row.get(9)?,
        linked_transaction_id: row.get(10)?,
        amortization_id: row.get(11)?,
        prefill_id: row.get(12)?,
    })
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TXN_COLS} FROM transactions WHERE id = ?1"),
        [id],
        txn_from_row,
    )
    .map_err(|e| PennyError::not_found_on_empty(e, "transaction", id))
}

pub fn get_journal_entry_for_transaction(
    conn: &Connection,
    transaction_id: i64,
) -> Result<Option<JournalEntry>> {
    let entry = conn
        .query_row(
            "SELECT id, transaction_id, date, description FROM journal_entries \
             WHERE transaction_id = ?1",
            [transaction_id],
            |row| {
                Ok(JournalEntry {
                    id: row.get(0)?,
                    transaction_id: row.get(1)?,
                    date: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(entry)
}

pub fn get_items_for_entry(
    conn: &Connection,
    journal_entry_id: i64,
) -> Result<Vec<JournalEntryItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, journal_entry_id, item_type, amount, account_id, entity_id \
         FROM journal_entry_items WHERE journal_entry_id = ?1 ORDER BY id",
    )?;
    let rows: Vec<JournalEntryItem> = stmt
        .query_map([journal_entry_id], |row| {
            let item_type: String = row.get(2)?;
            Ok(JournalEntryItem {
                id: row.get(0)?,
                journal_entry_id: row.get(1)?,
                item_type: ItemType::parse(&item_type).map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        2,
                        "item_type".into(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                amount: crate::db::decimal_col(row, 3)?,
                account_id: row.get(4)?,
                entity_id: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_amortization(conn: &Connection, id: i64) -> Result<Amortization> {
    conn.query_row(
        "SELECT id, amount, periods, suggested_account_id, description, transaction_id, is_closed \
         FROM amortizations WHERE id = ?1",
        [id],
        |row| {
            Ok(Amortization {
                id: row.get(0)?,
                amount: crate::db::decimal_col(row, 1)?,
                periods: row.get(2)?,
                suggested_account_id: row.get(3)?,
                description: row.get(4)?,
                transaction_id: row.get(5)?,
                is_closed: row.get(6)?,
            })
        },
    )
    .map_err(|e| PennyError::not_found_on_empty(e, "amortization", id))
}

pub fn get_reconciliation(
    conn: &Connection,
    account_id: i64,
    date: NaiveDate,
) -> Result<Option<Reconciliation>> {
    let recon = conn
        .query_row(
            "SELECT id, account_id, date, amount, transaction_id FROM reconciliations \
             WHERE account_id = ?1 AND date = ?2",
            rusqlite::params![account_id, date],
            |row| {
                Ok(Reconciliation {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    date: row.get(2)?,
                    amount: crate::db::decimal_col(row, 3)?,
                    transaction_id: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(recon)
}
