use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::decimal_param;
use crate::error::{PennyError, Result};
use crate::models::{
    get_account_by_name, get_entity_by_name, get_journal_entry_for_transaction, get_transaction,
    transaction_side, ItemType, Transaction,
};

/// One proposed debit or credit line. Lines with no amount represent unused
/// form rows and are dropped during validation.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    pub account_name: String,
    pub amount: Option<Decimal>,
    pub entity_name: Option<String>,
    /// When set, the existing item is updated in place instead of a new
    /// one being inserted.
    pub item_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SaveResult {
    pub journal_entry_id: i64,
    pub transaction_id: i64,
    pub created_entities: Vec<String>,
}

/// A full journal entry proposal, used by the bulk save path.
#[derive(Debug, Clone)]
pub struct EntryInput {
    pub transaction_id: i64,
    pub debits: Vec<LineInput>,
    pub credits: Vec<LineInput>,
    pub paystub_id: Option<i64>,
}

fn live_lines(lines: &[LineInput]) -> impl Iterator<Item = &LineInput> {
    lines.iter().filter(|l| l.amount.is_some())
}

/// Validate a proposed set of debit/credit lines against a transaction.
/// All problems are collected; nothing is auto-corrected.
pub fn validate(
    conn: &Connection,
    txn: &Transaction,
    debits: &[LineInput],
    credits: &[LineInput],
) -> Result<ValidationResult> {
    let mut errors = Vec::new();

    for line in live_lines(debits).chain(live_lines(credits)) {
        if line.amount.unwrap_or_default().is_sign_negative() {
            errors.push(format!(
                "Item amounts must be non-negative: {} on '{}'",
                line.amount.unwrap_or_default(),
                line.account_name
            ));
        }
    }

    let debit_total: Decimal = live_lines(debits).map(|l| l.amount.unwrap_or_default()).sum();
    let credit_total: Decimal = live_lines(credits).map(|l| l.amount.unwrap_or_default()).sum();
    if debit_total != credit_total {
        errors.push(format!(
            "Debits and credits must balance: debits {debit_total} != credits {credit_total}"
        ));
    }

    // Exactly one line must mirror the transaction itself, on the side its
    // sign implies for the source account's type.
    let source = crate::models::get_account(conn, txn.account_id)?;
    let side = transaction_side(source.account_type, txn.amount);
    let lines = match side {
        ItemType::Debit => debits,
        ItemType::Credit => credits,
    };
    let expected = txn.amount.abs();
    let matches = live_lines(lines)
        .filter(|l| l.account_name == source.name && l.amount == Some(expected))
        .count();
    if matches != 1 {
        errors.push(format!(
            "There must be exactly one {} of {} on '{}' matching the transaction; found {}",
            side.as_str(),
            expected,
            source.name,
            matches
        ));
    }

    Ok(ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    })
}

/// Insert or update the items of one side inside an open database
/// transaction, auto-vivifying unknown entities.
fn persist_lines(
    tx: &Connection,
    journal_entry_id: i64,
    lines: &[LineInput],
    item_type: ItemType,
    created_entities: &mut Vec<String>,
) -> Result<()> {
    for line in live_lines(lines) {
        let account = get_account_by_name(tx, &line.account_name)?;
        let entity_id = match &line.entity_name {
            Some(name) if !name.is_empty() => match get_entity_by_name(tx, name) {
                Ok(entity) => Some(entity.id),
                Err(PennyError::NotFound { .. }) => {
                    tx.execute("INSERT INTO entities (name) VALUES (?1)", [name])?;
                    created_entities.push(name.clone());
                    Some(tx.last_insert_rowid())
                }
                Err(e) => return Err(e),
            },
            _ => None,
        };
        let amount = decimal_param(line.amount.unwrap_or_default());
        match line.item_id {
            Some(item_id) => {
                let updated = tx.execute(
                    "UPDATE journal_entry_items \
                     SET item_type = ?1, amount = ?2, account_id = ?3, entity_id = ?4 \
                     WHERE id = ?5 AND journal_entry_id = ?6",
                    rusqlite::params![
                        item_type.as_str(),
                        amount,
                        account.id,
                        entity_id,
                        item_id,
                        journal_entry_id
                    ],
                )?;
                if updated == 0 {
                    return Err(PennyError::not_found("journal entry item", item_id));
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO journal_entry_items \
                     (journal_entry_id, item_type, amount, account_id, entity_id) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        journal_entry_id,
                        item_type.as_str(),
                        amount,
                        account.id,
                        entity_id
                    ],
                )?;
            }
        }
    }
    Ok(())
}

fn persist_entry(tx: &Connection, entry: &EntryInput, today: NaiveDate) -> Result<SaveResult> {
    let txn = get_transaction(tx, entry.transaction_id)?;
    let check = validate(tx, &txn, &entry.debits, &entry.credits)?;
    if !check.is_valid {
        return Err(PennyError::Validation(check.errors.join("; ")));
    }

    let journal_entry_id = match get_journal_entry_for_transaction(tx, txn.id)? {
        Some(existing) => existing.id,
        None => {
            tx.execute(
                "INSERT INTO journal_entries (transaction_id, date, description) \
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![txn.id, txn.date, txn.description],
            )?;
            tx.last_insert_rowid()
        }
    };

    let mut created_entities = Vec::new();
    persist_lines(tx, journal_entry_id, &entry.debits, ItemType::Debit, &mut created_entities)?;
    persist_lines(tx, journal_entry_id, &entry.credits, ItemType::Credit, &mut created_entities)?;

    tx.execute(
        "UPDATE transactions SET is_closed = 1, date_closed = ?1 WHERE id = ?2",
        rusqlite::params![today, txn.id],
    )?;

    // A paystub id that does not resolve is tolerated, not an error.
    if let Some(paystub_id) = entry.paystub_id {
        tx.execute(
            "UPDATE paystubs SET journal_entry_id = ?1 WHERE id = ?2",
            rusqlite::params![journal_entry_id, paystub_id],
        )?;
    }

    Ok(SaveResult {
        journal_entry_id,
        transaction_id: txn.id,
        created_entities,
    })
}

/// Validate and persist a journal entry atomically: either every row lands
/// and the transaction is closed, or nothing changes.
pub fn save(
    conn: &mut Connection,
    transaction_id: i64,
    debits: Vec<LineInput>,
    credits: Vec<LineInput>,
    paystub_id: Option<i64>,
) -> Result<SaveResult> {
    let entry = EntryInput {
        transaction_id,
        debits,
        credits,
        paystub_id,
    };
    let today = chrono::Local::now().date_naive();
    let tx = conn.transaction()?;
    let result = persist_entry(&tx, &entry, today)?;
    tx.commit()?;
    Ok(result)
}

/// Bulk variant: commit every entry or none.
pub fn save_all(conn: &mut Connection, entries: &[EntryInput]) -> Result<Vec<SaveResult>> {
    let today = chrono::Local::now().date_naive();
    let tx = conn.transaction()?;
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        results.push(persist_entry(&tx, entry, today)?);
    }
    tx.commit()?;
    Ok(results)
}

/// Pair two transfer/payment transactions: one balanced journal entry on
/// the earlier transaction covers both accounts, both close, and the link
/// is recorded on each side.
pub fn link(conn: &mut Connection, a_id: i64, b_id: i64) -> Result<()> {
    if a_id == b_id {
        return Err(PennyError::Validation(
            "cannot link a transaction to itself".to_string(),
        ));
    }
    let a = get_transaction(conn, a_id)?;
    let b = get_transaction(conn, b_id)?;
    for txn in [&a, &b] {
        use crate::models::TransactionType;
        if txn.is_closed {
            return Err(PennyError::Validation(format!(
                "transaction {} is already closed",
                txn.id
            )));
        }
        if !matches!(txn.txn_type, TransactionType::Payment | TransactionType::Transfer) {
            return Err(PennyError::Validation(format!(
                "transaction {} is a {}, only payments and transfers can be linked",
                txn.id,
                txn.txn_type.as_str()
            )));
        }
    }
    if a.amount.abs() != b.amount.abs() {
        return Err(PennyError::Validation(format!(
            "linked amounts must match: {} vs {}",
            a.amount, b.amount
        )));
    }

    let account_a = crate::models::get_account(conn, a.account_id)?;
    let account_b = crate::models::get_account(conn, b.account_id)?;
    let side_a = transaction_side(account_a.account_type, a.amount);
    let side_b = transaction_side(account_b.account_type, b.amount);
    if side_a == side_b {
        return Err(PennyError::Validation(format!(
            "linked transactions must land on opposite sides, both imply a {}",
            side_a.as_str()
        )));
    }

    let (earlier, _later) = if (a.date, a.id) <= (b.date, b.id) { (&a, &b) } else { (&b, &a) };
    let amount = decimal_param(a.amount.abs());
    let today = chrono::Local::now().date_naive();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO journal_entries (transaction_id, date, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![earlier.id, earlier.date, earlier.description],
    )?;
    let entry_id = tx.last_insert_rowid();
    for (account_id, side) in [(account_a.id, side_a), (account_b.id, side_b)] {
        tx.execute(
            "INSERT INTO journal_entry_items (journal_entry_id, item_type, amount, account_id) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![entry_id, side.as_str(), amount, account_id],
        )?;
    }
    tx.execute(
        "UPDATE transactions SET is_closed = 1, date_closed = ?1, linked_transaction_id = ?2 \
         WHERE id = ?3",
        rusqlite::params![today, b.id, a.id],
    )?;
    tx.execute(
        "UPDATE transactions SET is_closed = 1, date_closed = ?1, linked_transaction_id = ?2 \
         WHERE id = ?3",
        rusqlite::params![today, a.id, b.id],
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::{get_account_by_name, get_items_for_entry};
    use crate::testutil::seed_txn;
    use rust_decimal_macros::dec;

    fn line(account: &str, amount: Decimal) -> LineInput {
        LineInput {
            account_name: account.to_string(),
            amount: Some(amount),
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_balanced_entry() {
        let (_dir, mut conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-01", "Checking", dec!(1000), "income");
        let txn = get_transaction(&conn, txn_id).unwrap();
        let result = validate(
            &conn,
            &txn,
            &[line("Checking", dec!(1000))],
            &[line("Salary", dec!(1000))],
        )
        .unwrap();
        assert!(result.is_valid, "errors: {:?}", result.errors);

        let saved = save(
            &mut conn,
            txn_id,
            vec![line("Checking", dec!(1000))],
            vec![line("Salary", dec!(1000))],
            None,
        )
        .unwrap();
        let items = get_items_for_entry(&conn, saved.journal_entry_id).unwrap();
        assert_eq!(items.len(), 2);
        let txn = get_transaction(&conn, txn_id).unwrap();
        assert!(txn.is_closed);
        assert!(txn.date_closed.is_some());
    }

    #[test]
    fn validate_reports_imbalance_with_amounts() {
        let (_dir, conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-01", "Checking", dec!(1000), "income");
        let txn = get_transaction(&conn, txn_id).unwrap();
        let result = validate(
            &conn,
            &txn,
            &[line("Checking", dec!(1000))],
            &[line("Salary", dec!(900))],
        )
        .unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("1000") && e.contains("900")));
    }

    #[test]
    fn validate_requires_exactly_one_matching_line() {
        let (_dir, conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-01", "Checking", dec!(1000), "income");
        let txn = get_transaction(&conn, txn_id).unwrap();

        // No line on Checking at all.
        let result = validate(
            &conn,
            &txn,
            &[line("Savings", dec!(1000))],
            &[line("Salary", dec!(1000))],
        )
        .unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("exactly one")));

        // Two matching lines.
        let result = validate(
            &conn,
            &txn,
            &[line("Checking", dec!(1000)), line("Checking", dec!(1000))],
            &[line("Salary", dec!(2000))],
        )
        .unwrap();
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("found 2")));
    }

    #[test]
    fn validate_drops_empty_rows() {
        let (_dir, conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-01", "Checking", dec!(100), "income");
        let txn = get_transaction(&conn, txn_id).unwrap();
        let empty = LineInput {
            account_name: "Savings".to_string(),
            ..Default::default()
        };
        let result = validate(
            &conn,
            &txn,
            &[line("Checking", dec!(100)), empty.clone()],
            &[line("Salary", dec!(100)), empty],
        )
        .unwrap();
        assert!(result.is_valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn negative_transaction_matches_on_opposite_side() {
        let (_dir, mut conn) = test_db();
        // Outflow from an asset account: the matching line is a credit.
        let txn_id = seed_txn(&conn, "2025-03-02", "Checking", dec!(-80), "purchase");
        let saved = save(
            &mut conn,
            txn_id,
            vec![line("Groceries", dec!(80))],
            vec![line("Checking", dec!(80))],
            None,
        )
        .unwrap();
        let items = get_items_for_entry(&conn, saved.journal_entry_id).unwrap();
        let debits: Decimal = items
            .iter()
            .filter(|i| i.item_type == ItemType::Debit)
            .map(|i| i.amount)
            .sum();
        let credits: Decimal = items
            .iter()
            .filter(|i| i.item_type == ItemType::Credit)
            .map(|i| i.amount)
            .sum();
        assert_eq!(debits, credits);
    }

    #[test]
    fn save_auto_vivifies_entities() {
        let (_dir, mut conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-03", "Accounts Receivable", dec!(250), "income");
        let mut debit = line("Accounts Receivable", dec!(250));
        debit.entity_name = Some("Dana".to_string());
        let saved = save(
            &mut conn,
            txn_id,
            vec![debit],
            vec![line("Other Income", dec!(250))],
            None,
        )
        .unwrap();
        assert_eq!(saved.created_entities, vec!["Dana".to_string()]);
        assert!(get_entity_by_name(&conn, "Dana").is_ok());

        // A second save referencing the same entity creates nothing new.
        let txn2 = seed_txn(&conn, "2025-03-04", "Accounts Receivable", dec!(10), "income");
        let mut debit = line("Accounts Receivable", dec!(10));
        debit.entity_name = Some("Dana".to_string());
        let saved = save(
            &mut conn,
            txn2,
            vec![debit],
            vec![line("Other Income", dec!(10))],
            None,
        )
        .unwrap();
        assert!(saved.created_entities.is_empty());
    }

    #[test]
    fn save_updates_existing_items_in_place() {
        let (_dir, mut conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-05", "Checking", dec!(500), "income");
        let saved = save(
            &mut conn,
            txn_id,
            vec![line("Checking", dec!(500))],
            vec![line("Salary", dec!(500))],
            None,
        )
        .unwrap();
        let items = get_items_for_entry(&conn, saved.journal_entry_id).unwrap();
        let credit_item = items.iter().find(|i| i.item_type == ItemType::Credit).unwrap();

        // Reclassify the credit side without growing the item set.
        let mut debit = line("Checking", dec!(500));
        debit.item_id = items.iter().find(|i| i.item_type == ItemType::Debit).map(|i| i.id);
        let mut credit = line("Other Income", dec!(500));
        credit.item_id = Some(credit_item.id);
        let resaved = save(&mut conn, txn_id, vec![debit], vec![credit], None).unwrap();
        assert_eq!(resaved.journal_entry_id, saved.journal_entry_id);
        let items = get_items_for_entry(&conn, saved.journal_entry_id).unwrap();
        assert_eq!(items.len(), 2);
        let other_income = get_account_by_name(&conn, "Other Income").unwrap();
        assert!(items.iter().any(|i| i.account_id == other_income.id));
    }

    #[test]
    fn failed_save_rolls_back_everything() {
        let (_dir, mut conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-06", "Checking", dec!(75), "income");
        let before: i64 = conn
            .query_row("SELECT count(*) FROM journal_entries", [], |r| r.get(0))
            .unwrap();

        // Balanced and transaction-matching, but the offset account does
        // not exist, so persistence fails after the entry row is written.
        let result = save(
            &mut conn,
            txn_id,
            vec![line("Checking", dec!(75))],
            vec![line("No Such Account", dec!(75))],
            None,
        );
        assert!(matches!(result, Err(PennyError::NotFound { .. })));

        let after: i64 = conn
            .query_row("SELECT count(*) FROM journal_entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(before, after);
        let txn = get_transaction(&conn, txn_id).unwrap();
        assert!(!txn.is_closed);
    }

    #[test]
    fn save_all_is_all_or_nothing() {
        let (_dir, mut conn) = test_db();
        let good = seed_txn(&conn, "2025-03-07", "Checking", dec!(20), "income");
        let bad = seed_txn(&conn, "2025-03-07", "Checking", dec!(30), "income");
        let entries = vec![
            EntryInput {
                transaction_id: good,
                debits: vec![line("Checking", dec!(20))],
                credits: vec![line("Salary", dec!(20))],
                paystub_id: None,
            },
            EntryInput {
                transaction_id: bad,
                debits: vec![line("Checking", dec!(30))],
                credits: vec![line("Salary", dec!(29))],
                paystub_id: None,
            },
        ];
        assert!(save_all(&mut conn, &entries).is_err());
        let count: i64 = conn
            .query_row("SELECT count(*) FROM journal_entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(!get_transaction(&conn, good).unwrap().is_closed);
    }

    #[test]
    fn missing_paystub_id_is_tolerated() {
        let (_dir, mut conn) = test_db();
        let txn_id = seed_txn(&conn, "2025-03-08", "Checking", dec!(40), "income");
        let saved = save(
            &mut conn,
            txn_id,
            vec![line("Checking", dec!(40))],
            vec![line("Salary", dec!(40))],
            Some(9999),
        )
        .unwrap();
        assert!(saved.journal_entry_id > 0);
    }

    #[test]
    fn resolving_paystub_is_linked() {
        let (_dir, mut conn) = test_db();
        conn.execute("INSERT INTO paystubs (description) VALUES ('March stub')", [])
            .unwrap();
        let paystub_id = conn.last_insert_rowid();
        let txn_id = seed_txn(&conn, "2025-03-09", "Checking", dec!(40), "income");
        let saved = save(
            &mut conn,
            txn_id,
            vec![line("Checking", dec!(40))],
            vec![line("Salary", dec!(40))],
            Some(paystub_id),
        )
        .unwrap();
        let linked: Option<i64> = conn
            .query_row(
                "SELECT journal_entry_id FROM paystubs WHERE id = ?1",
                [paystub_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(linked, Some(saved.journal_entry_id));
    }

    #[test]
    fn link_pairs_transfers_with_one_balanced_entry() {
        let (_dir, mut conn) = test_db();
        let out = seed_txn(&conn, "2025-04-01", "Checking", dec!(-300), "transfer");
        let inn = seed_txn(&conn, "2025-04-02", "Savings", dec!(300), "transfer");
        link(&mut conn, out, inn).unwrap();

        let a = get_transaction(&conn, out).unwrap();
        let b = get_transaction(&conn, inn).unwrap();
        assert!(a.is_closed && b.is_closed);
        assert_eq!(a.linked_transaction_id, Some(inn));
        assert_eq!(b.linked_transaction_id, Some(out));

        // One journal entry on the earlier side, balanced across both accounts.
        let entry = get_journal_entry_for_transaction(&conn, out).unwrap().unwrap();
        let items = get_items_for_entry(&conn, entry.id).unwrap();
        assert_eq!(items.len(), 2);
        let debits: Decimal = items
            .iter()
            .filter(|i| i.item_type == ItemType::Debit)
            .map(|i| i.amount)
            .sum();
        let credits: Decimal = items
            .iter()
            .filter(|i| i.item_type == ItemType::Credit)
            .map(|i| i.amount)
            .sum();
        assert_eq!(debits, credits);
        assert!(get_journal_entry_for_transaction(&conn, inn).unwrap().is_none());
    }

    #[test]
    fn link_rejects_mismatched_amounts_and_types() {
        let (_dir, mut conn) = test_db();
        let out = seed_txn(&conn, "2025-04-01", "Checking", dec!(-300), "transfer");
        let inn = seed_txn(&conn, "2025-04-02", "Savings", dec!(250), "transfer");
        assert!(matches!(link(&mut conn, out, inn), Err(PennyError::Validation(_))));

        let income = seed_txn(&conn, "2025-04-03", "Checking", dec!(300), "income");
        let other = seed_txn(&conn, "2025-04-03", "Savings", dec!(-300), "transfer");
        assert!(matches!(link(&mut conn, income, other), Err(PennyError::Validation(_))));
    }
}
