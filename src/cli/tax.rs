use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_amount_arg, parse_date_arg};
use crate::error::Result;
use crate::fmt::money;
use crate::models::TaxChargeType;
use crate::tax;

pub fn charge(charge_type: &str, date: &str, amount: &str, restate: bool) -> Result<()> {
    let mut conn = open_db()?;
    let charge_type = TaxChargeType::parse(charge_type)?;
    let date = parse_date_arg(date)?;
    let amount = parse_amount_arg(amount)?;

    let charge = if restate {
        tax::update(&mut conn, charge_type, date, amount)?
    } else {
        tax::record(&mut conn, charge_type, date, amount)?
    };
    println!(
        "Recorded {} tax charge of {} on {}",
        charge.charge_type.as_str(),
        money(charge.amount),
        charge.date
    );
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let charges = tax::list_charges(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Type", "Amount"]);
    for charge in &charges {
        table.add_row(vec![
            Cell::new(charge.date),
            Cell::new(charge.charge_type.as_str()),
            Cell::new(money(charge.amount)),
        ]);
    }
    println!("Tax Charges\n{table}");
    Ok(())
}
