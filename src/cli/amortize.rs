use comfy_table::{Cell, Table};

use crate::amortize;
use crate::cli::{open_db, parse_date_arg};
use crate::error::Result;
use crate::fmt::money;
use crate::models::get_account;

pub fn add(transaction_id: i64, periods: i64, account: &str) -> Result<()> {
    let conn = open_db()?;
    let sched = amortize::create_schedule(&conn, transaction_id, periods, account)?;
    println!(
        "Amortization {} will spread {} over {} periods",
        sched.id,
        money(sched.amount),
        sched.periods
    );
    Ok(())
}

pub fn run(id: i64, date: Option<&str>) -> Result<()> {
    let mut conn = open_db()?;
    let date = match date {
        Some(raw) => parse_date_arg(raw)?,
        None => chrono::Local::now().date_naive(),
    };
    let result = amortize::amortize(&mut conn, id, date)?;
    let sched = crate::models::get_amortization(&conn, id)?;
    println!(
        "Released period {}/{}: {}{}",
        result.period,
        sched.periods,
        money(result.amount),
        if result.closed { " (schedule complete)" } else { "" }
    );
    Ok(())
}

pub fn list(all: bool) -> Result<()> {
    let conn = open_db()?;
    let schedules = amortize::list_schedules(&conn, all)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Description", "Amount", "Periods", "Expense Account", ""]);
    for sched in &schedules {
        let account = get_account(&conn, sched.suggested_account_id)?;
        table.add_row(vec![
            Cell::new(sched.id),
            Cell::new(&sched.description),
            Cell::new(money(sched.amount)),
            Cell::new(sched.periods),
            Cell::new(account.name),
            Cell::new(if sched.is_closed { "closed" } else { "" }),
        ]);
    }
    println!("Amortizations\n{table}");
    Ok(())
}
