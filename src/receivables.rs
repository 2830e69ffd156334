use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::decimal_col;
use crate::error::{PennyError, Result};
use crate::models::{
    get_account, get_entity_by_name, AccountSubType, Entity, ItemType,
};

/// An entity's outstanding receivable position. Positive means the
/// entity owes us, negative means we owe them.
#[derive(Debug, Clone)]
pub struct EntityBalance {
    pub entity_id: i64,
    pub name: String,
    pub balance: Decimal,
    pub last_activity: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ReceivableItem {
    pub item_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub item_type: ItemType,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct HistoryItem {
    pub item: ReceivableItem,
    pub running_balance: Decimal,
}

const ITEM_QUERY: &str = "SELECT i.id, e.date, e.description, i.item_type, i.amount, i.entity_id \
                          FROM journal_entry_items i \
                          JOIN journal_entries e ON e.id = i.journal_entry_id \
                          JOIN accounts a ON a.id = i.account_id \
                          WHERE a.sub_type = 'accounts_receivable'";

fn receivable_items(
    conn: &Connection,
    extra: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<(ReceivableItem, Option<i64>)>> {
    let mut stmt = conn.prepare(&format!("{ITEM_QUERY} {extra} ORDER BY e.date, i.id"))?;
    let rows = stmt
        .query_map(params, |row| {
            let raw_type: String = row.get(3)?;
            let item_type = ItemType::parse(&raw_type).map_err(|_| {
                rusqlite::Error::InvalidColumnType(3, raw_type, rusqlite::types::Type::Text)
            })?;
            Ok((
                ReceivableItem {
                    item_id: row.get(0)?,
                    date: row.get(1)?,
                    description: row.get(2)?,
                    item_type,
                    amount: decimal_col(row, 4)?,
                },
                row.get::<_, Option<i64>>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A receivable item moves the position by +amount on the credit side:
/// crediting a receivable account records money lent out on the entity's
/// behalf, debiting it records repayment.
fn signed(item: &ReceivableItem) -> Decimal {
    match item.item_type {
        ItemType::Credit => item.amount,
        ItemType::Debit => -item.amount,
    }
}

/// Net position per entity, largest magnitudes first; ties broken by
/// most recent activity.
pub fn get_entity_balances(conn: &Connection) -> Result<Vec<EntityBalance>> {
    let items = receivable_items(conn, "AND i.entity_id IS NOT NULL", &[])?;

    let mut positions: HashMap<i64, (Decimal, NaiveDate)> = HashMap::new();
    for (item, entity_id) in &items {
        let entity_id = entity_id.ok_or_else(|| PennyError::Other("untagged row in tagged query".into()))?;
        let slot = positions.entry(entity_id).or_insert((Decimal::ZERO, item.date));
        slot.0 += signed(item);
        slot.1 = slot.1.max(item.date);
    }

    let mut balances = Vec::with_capacity(positions.len());
    for (entity_id, (balance, last_activity)) in positions {
        let name: String = conn.query_row(
            "SELECT name FROM entities WHERE id = ?1",
            [entity_id],
            |row| row.get(0),
        )?;
        balances.push(EntityBalance {
            entity_id,
            name,
            balance,
            last_activity,
        });
    }
    balances.sort_by(|a, b| {
        b.balance
            .abs()
            .cmp(&a.balance.abs())
            .then(b.last_activity.cmp(&a.last_activity))
            .then(a.name.cmp(&b.name))
    });
    Ok(balances)
}

/// Full dated history for one entity with a running balance, oldest first.
pub fn get_entity_history(conn: &Connection, entity_name: &str) -> Result<Vec<HistoryItem>> {
    let entity = get_entity_by_name(conn, entity_name)?;
    let items = receivable_items(conn, "AND i.entity_id = ?1", &[&entity.id])?;

    let mut running = Decimal::ZERO;
    let history = items
        .into_iter()
        .map(|(item, _)| {
            running += signed(&item);
            HistoryItem {
                item,
                running_balance: running,
            }
        })
        .collect();
    Ok(history)
}

/// Receivable items nobody has been tagged on yet.
pub fn get_untagged(conn: &Connection) -> Result<Vec<ReceivableItem>> {
    let items = receivable_items(conn, "AND i.entity_id IS NULL", &[])?;
    Ok(items.into_iter().map(|(item, _)| item).collect())
}

/// Tag a receivable item with an entity, creating the entity if needed.
pub fn tag_item(conn: &Connection, item_id: i64, entity_name: &str) -> Result<Entity> {
    require_receivable_item(conn, item_id)?;
    let entity = match get_entity_by_name(conn, entity_name) {
        Ok(entity) => entity,
        Err(PennyError::NotFound { .. }) => {
            conn.execute("INSERT INTO entities (name) VALUES (?1)", [entity_name])?;
            Entity {
                id: conn.last_insert_rowid(),
                name: entity_name.to_string(),
                is_closed: false,
            }
        }
        Err(e) => return Err(e),
    };
    conn.execute(
        "UPDATE journal_entry_items SET entity_id = ?1 WHERE id = ?2",
        rusqlite::params![entity.id, item_id],
    )?;
    Ok(entity)
}

pub fn untag_item(conn: &Connection, item_id: i64) -> Result<()> {
    require_receivable_item(conn, item_id)?;
    conn.execute(
        "UPDATE journal_entry_items SET entity_id = NULL WHERE id = ?1",
        [item_id],
    )?;
    Ok(())
}

fn require_receivable_item(conn: &Connection, item_id: i64) -> Result<()> {
    let account_id: i64 = conn
        .query_row(
            "SELECT account_id FROM journal_entry_items WHERE id = ?1",
            [item_id],
            |row| row.get(0),
        )
        .map_err(|e| PennyError::not_found_on_empty(e, "journal entry item", item_id))?;
    let account = get_account(conn, account_id)?;
    if account.sub_type != AccountSubType::AccountsReceivable {
        return Err(PennyError::Validation(format!(
            "item {item_id} is on '{}', not a receivable account",
            account.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::journal::{save, LineInput};
    use crate::testutil::seed_txn;
    use rust_decimal_macros::dec;

    fn lend(conn: &mut Connection, day: &str, entity: &str, amount: Decimal) {
        // Paying from Checking on someone's behalf: credit the receivable
        // account with the entity tagged, credit Checking, debit the
        // nominal expense.
        let txn = seed_txn(conn, day, "Checking", -amount, "purchase");
        save(
            conn,
            txn,
            vec![LineInput {
                account_name: "Groceries".into(),
                amount: Some(amount * dec!(2)),
                ..Default::default()
            }],
            vec![
                LineInput {
                    account_name: "Checking".into(),
                    amount: Some(amount),
                    ..Default::default()
                },
                LineInput {
                    account_name: "Accounts Receivable".into(),
                    amount: Some(amount),
                    entity_name: Some(entity.to_string()),
                    ..Default::default()
                },
            ],
            None,
        )
        .unwrap();
    }

    fn repay(conn: &mut Connection, day: &str, entity: &str, amount: Decimal) {
        let txn = seed_txn(conn, day, "Checking", amount, "income");
        save(
            conn,
            txn,
            vec![
                LineInput {
                    account_name: "Checking".into(),
                    amount: Some(amount),
                    ..Default::default()
                },
                LineInput {
                    account_name: "Accounts Receivable".into(),
                    amount: Some(amount),
                    entity_name: Some(entity.to_string()),
                    ..Default::default()
                },
            ],
            vec![LineInput {
                account_name: "Groceries".into(),
                amount: Some(amount * dec!(2)),
                ..Default::default()
            }],
            None,
        )
        .unwrap();
    }

    #[test]
    fn balances_order_by_magnitude_then_recency() {
        let (_dir, mut conn) = test_db();
        lend(&mut conn, "2025-01-05", "Ana", dec!(40));
        lend(&mut conn, "2025-01-10", "Bo", dec!(100));
        repay(&mut conn, "2025-01-20", "Ana", dec!(10));

        let balances = get_entity_balances(&conn).unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].name, "Bo");
        assert_eq!(balances[0].balance, dec!(100));
        assert_eq!(balances[1].name, "Ana");
        assert_eq!(balances[1].balance, dec!(30));
        assert_eq!(balances[1].last_activity, "2025-01-20".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn history_runs_a_balance() {
        let (_dir, mut conn) = test_db();
        lend(&mut conn, "2025-01-05", "Ana", dec!(40));
        repay(&mut conn, "2025-01-20", "Ana", dec!(10));
        lend(&mut conn, "2025-02-01", "Ana", dec!(25));

        let history = get_entity_history(&conn, "Ana").unwrap();
        let balances: Vec<Decimal> = history.iter().map(|h| h.running_balance).collect();
        assert_eq!(balances, vec![dec!(40), dec!(30), dec!(55)]);
    }

    #[test]
    fn untagged_items_surface_and_can_be_tagged() {
        let (_dir, mut conn) = test_db();
        let txn = seed_txn(&mut conn, "2025-01-05", "Checking", dec!(-40), "purchase");
        save(
            &mut conn,
            txn,
            vec![LineInput {
                account_name: "Accounts Receivable".into(),
                amount: Some(dec!(40)),
                ..Default::default()
            }],
            vec![LineInput {
                account_name: "Checking".into(),
                amount: Some(dec!(40)),
                ..Default::default()
            }],
            None,
        )
        .unwrap();

        let untagged = get_untagged(&conn).unwrap();
        assert_eq!(untagged.len(), 1);

        let entity = tag_item(&conn, untagged[0].item_id, "Casey").unwrap();
        assert!(get_untagged(&conn).unwrap().is_empty());
        assert_eq!(get_entity_balances(&conn).unwrap()[0].entity_id, entity.id);

        untag_item(&conn, untagged[0].item_id).unwrap();
        assert_eq!(get_untagged(&conn).unwrap().len(), 1);
    }

    #[test]
    fn tagging_a_non_receivable_item_fails() {
        let (_dir, mut conn) = test_db();
        lend(&mut conn, "2025-01-05", "Ana", dec!(40));
        let item_id: i64 = conn
            .query_row(
                "SELECT i.id FROM journal_entry_items i \
                 JOIN accounts a ON a.id = i.account_id WHERE a.name = 'Groceries'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        let result = tag_item(&conn, item_id, "Ana");
        assert!(matches!(result, Err(PennyError::Validation(_))));
    }
}
