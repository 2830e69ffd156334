use std::path::Path;

use chrono::NaiveDate;
use regex::Regex;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::{decimal_col, decimal_param};
use crate::error::{PennyError, Result};
use crate::models::{get_account_by_name, TransactionType};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        let value: Decimal = inner.trim().parse().map_err(|_| PennyError::BadAmount(raw.into()))?;
        return Ok(-value);
    }
    s.parse().map_err(|_| PennyError::BadAmount(raw.into()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Ok(date);
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%Y").map_err(|_| PennyError::BadDate(raw.into()))
}

/// Bank descriptions carry per-transaction reference numbers; strip long
/// digit runs and collapse whitespace so repeat vendors compare equal.
fn normalize_description(raw: &str) -> String {
    let digits = Regex::new(r"\d{4,}\S*").unwrap();
    let spaces = Regex::new(r"\s+").unwrap();
    let stripped = digits.replace_all(raw, "");
    spaces.replace_all(stripped.trim(), " ").to_lowercase()
}

fn is_duplicate_row(conn: &Connection, account_id: i64, row: &ParsedRow) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions \
         WHERE account_id = ?1 AND date = ?2 AND amount = ?3 AND description = ?4",
    )?;
    Ok(stmt.exists(rusqlite::params![
        account_id,
        row.date,
        decimal_param(row.amount),
        row.description
    ])?)
}

/// First-match lookup against already-resolved history: a prior closed
/// transaction with the same normalized description tells us which account
/// its journal entry used on the other side.
fn suggest_account(conn: &Connection, account_id: i64, description: &str) -> Result<Option<i64>> {
    let needle = normalize_description(description);
    if needle.is_empty() {
        return Ok(None);
    }
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.description FROM transactions t \
         WHERE t.is_closed = 1 AND t.account_id = ?1 ORDER BY t.date DESC",
    )?;
    let prior: Vec<(i64, String)> = stmt
        .query_map([account_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (txn_id, prior_description) in &prior {
        if normalize_description(prior_description) != needle {
            continue;
        }
        // Amounts live as TEXT, so the largest side is picked in Rust.
        let mut items = conn.prepare_cached(
            "SELECT i.account_id, i.amount FROM journal_entry_items i \
             JOIN journal_entries e ON e.id = i.journal_entry_id \
             WHERE e.transaction_id = ?1 AND i.account_id != ?2",
        )?;
        let offsets: Vec<(i64, Decimal)> = items
            .query_map(rusqlite::params![txn_id, account_id], |row| {
                Ok((row.get(0)?, decimal_col(row, 1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if let Some((offset, _)) = offsets.into_iter().max_by_key(|(_, amount)| *amount) {
            return Ok(Some(offset));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub suggested: usize,
}

fn parse_csv(file_path: &Path) -> Result<Vec<ParsedRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)?;

    let headers = rdr.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| PennyError::Validation(format!("missing '{name}' column")))
    };
    let (date_col, desc_col, amount_col) =
        (column("date")?, column("description")?, column("amount")?);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let raw_amount = record.get(amount_col).unwrap_or_default();
        if raw_amount.is_empty() {
            continue;
        }
        rows.push(ParsedRow {
            date: parse_date(record.get(date_col).unwrap_or_default())?,
            description: record.get(desc_col).unwrap_or_default().to_string(),
            amount: parse_amount(raw_amount)?,
        });
    }
    Ok(rows)
}

/// Import a `date,description,amount` CSV as open transactions on the
/// named account. Rows matching an existing transaction exactly are
/// skipped; everything lands or nothing does.
pub fn import_csv(conn: &mut Connection, file_path: &Path, account_name: &str) -> Result<ImportSummary> {
    let account = get_account_by_name(conn, account_name)?;
    let rows = parse_csv(file_path)?;

    let mut summary = ImportSummary::default();
    let tx = conn.transaction()?;
    for row in &rows {
        if is_duplicate_row(&tx, account.id, row)? {
            summary.skipped_duplicates += 1;
            continue;
        }
        let suggested = suggest_account(&tx, account.id, &row.description)?;
        let txn_type = if row.amount >= Decimal::ZERO {
            TransactionType::Income
        } else {
            TransactionType::Purchase
        };
        tx.execute(
            "INSERT INTO transactions \
             (date, account_id, amount, description, txn_type, suggested_account_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                row.date,
                account.id,
                decimal_param(row.amount),
                row.description,
                txn_type.as_str(),
                suggested
            ],
        )?;
        if suggested.is_some() {
            summary.suggested += 1;
        }
        summary.imported += 1;
    }
    tx.commit()?;
    Ok(summary)
}
