use crate::cli::{open_db, parse_amount_arg, parse_date_arg};
use crate::error::Result;
use crate::fmt::money;
use crate::plugger;

pub fn run(account: &str, date: &str, amount: &str, restate: bool) -> Result<()> {
    let mut conn = open_db()?;
    let date = parse_date_arg(date)?;
    let amount = parse_amount_arg(amount)?;

    if restate {
        plugger::restate_reconciliation(&conn, account, date, amount)?;
    } else {
        plugger::set_reconciliation(&conn, account, date, amount)?;
    }
    let result = plugger::plug(&mut conn, account, date)?;

    if result.plug_amount.is_zero() {
        println!("{account} already agrees with the statement at {date}");
    } else {
        println!(
            "Reconciled {account} at {date}: plugged {} to unrealized gains/losses",
            money(result.plug_amount)
        );
    }
    Ok(())
}
