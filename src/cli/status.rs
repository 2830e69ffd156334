use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::load_settings;
use crate::statements;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("penny.db");

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `penny init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
    let transactions: i64 =
        conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
    let open: i64 = conn.query_row(
        "SELECT count(*) FROM transactions WHERE is_closed = 0",
        [],
        |r| r.get(0),
    )?;
    let entries: i64 = conn.query_row("SELECT count(*) FROM journal_entries", [], |r| r.get(0))?;

    println!();
    println!("Accounts:        {accounts}");
    println!("Transactions:    {transactions}");
    println!("Open:            {open}");
    println!("Journal entries: {entries}");

    match statements::get_global_discrepancy(&conn)? {
        Some(discrepancy) if !discrepancy.is_zero() => {
            println!("Discrepancy:     {} (ledger needs attention)", money(discrepancy));
        }
        Some(_) => println!("Discrepancy:     none"),
        None => {}
    }
    Ok(())
}
