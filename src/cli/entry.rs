use crate::cli::{open_db, parse_line_arg};
use crate::error::Result;
use crate::journal;

pub fn save(transaction_id: i64, debits: &[String], credits: &[String]) -> Result<()> {
    let mut conn = open_db()?;
    let debits = debits.iter().map(|raw| parse_line_arg(raw)).collect::<Result<Vec<_>>>()?;
    let credits = credits.iter().map(|raw| parse_line_arg(raw)).collect::<Result<Vec<_>>>()?;

    let result = journal::save(&mut conn, transaction_id, debits, credits, None)?;
    println!(
        "Saved journal entry {} for transaction {}",
        result.journal_entry_id, result.transaction_id
    );
    for name in &result.created_entities {
        println!("Created entity: {name}");
    }
    Ok(())
}
