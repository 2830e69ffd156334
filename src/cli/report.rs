use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_date_arg};
use crate::error::Result;
use crate::fmt::{money, percent};
use crate::models::{get_account_by_name, AccountType};
use crate::statements::{self, Balance, Metric, MetricUnit};

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn date_or_today(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => parse_date_arg(raw),
        None => Ok(today()),
    }
}

fn add_section(table: &mut Table, title: &str, balances: &[Balance], account_type: AccountType) {
    let rows: Vec<&Balance> = balances
        .iter()
        .filter(|b| b.account_type == Some(account_type))
        .collect();
    if rows.is_empty() {
        return;
    }
    let header = match account_type {
        AccountType::Income | AccountType::Asset => title.green().bold(),
        AccountType::Expense | AccountType::Liability => title.red().bold(),
        AccountType::Equity => title.blue().bold(),
    };
    table.add_row(vec![Cell::new(header), Cell::new("")]);
    for balance in rows {
        table.add_row(vec![
            Cell::new(format!("  {}", balance.account)),
            Cell::new(money(balance.amount)),
        ]);
    }
    table.add_row(vec![Cell::new(""), Cell::new("")]);
}

fn render_metric(metric: &Metric) -> String {
    match metric.value {
        Some(value) => match metric.unit {
            MetricUnit::Money => money(value),
            MetricUnit::Percent => percent(value),
            MetricUnit::Ratio => format!("{:.2}", value),
        },
        None => "n/a".to_string(),
    }
}

fn add_metrics(table: &mut Table, metrics: &[Metric]) {
    for metric in metrics {
        table.add_row(vec![Cell::new(metric.name.bold()), Cell::new(render_metric(metric))]);
    }
}

pub fn income(from: Option<&str>, to: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let start = match from {
        Some(raw) => parse_date_arg(raw)?,
        None => statements::epoch(),
    };
    let end = date_or_today(to)?;
    let statement = statements::get_income_statement(&conn, start, end)?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Amount"]);
    add_section(&mut table, "INCOME", &statement.balances, AccountType::Income);
    add_section(&mut table, "EXPENSES", &statement.balances, AccountType::Expense);
    add_metrics(&mut table, &statement.metrics());
    println!("Income Statement {start} to {end}\n{table}");
    Ok(())
}

pub fn balance_sheet(date: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let end = date_or_today(date)?;
    let sheet = statements::get_balance_sheet(&conn, end)?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Amount"]);
    add_section(&mut table, "ASSETS", &sheet.balances, AccountType::Asset);
    add_section(&mut table, "LIABILITIES", &sheet.balances, AccountType::Liability);
    add_section(&mut table, "EQUITY", &sheet.balances, AccountType::Equity);
    add_metrics(&mut table, &sheet.metrics());
    println!("Balance Sheet as of {end}\n{table}");
    Ok(())
}

pub fn cashflow(from: &str, to: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let start = parse_date_arg(from)?;
    let end = date_or_today(to)?;
    let statement = statements::get_cash_flow(&conn, start, end)?;

    let mut table = Table::new();
    table.set_header(vec!["Flow", "Amount"]);
    add_metrics(&mut table, &statement.metrics());
    println!("Cash Flow {start} to {end}\n{table}");

    if let Some(discrepancy) = statements::get_global_discrepancy(&conn)? {
        if !discrepancy.is_zero() {
            println!(
                "{} all-history discrepancy of {}",
                "WARNING:".red().bold(),
                money(discrepancy)
            );
        }
    }
    Ok(())
}

pub fn trend(account: &str, from: &str, to: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let account = get_account_by_name(&conn, account)?;
    let start = parse_date_arg(from)?;
    let end = date_or_today(to)?;
    let points = statements::get_trend(&conn, &account, start, end)?;

    let mut table = Table::new();
    table.set_header(vec!["Month", "Balance"]);
    for point in points {
        table.add_row(vec![
            Cell::new(format!("{:04}-{:02}", point.year, point.month)),
            Cell::new(money(point.amount)),
        ]);
    }
    println!("Trend for {}\n{table}", account.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn metrics_render_by_unit() {
        let cash_pct = Metric::percent("Cash % Assets", Some(dec!(0.95)));
        assert_eq!(render_metric(&cash_pct), "95.0%");

        let liquid_pct = Metric::percent("Liquid Assets %", Some(dec!(0.5)));
        assert_eq!(render_metric(&liquid_pct), "50.0%");

        let debt = Metric::ratio("Debt to Equity", Some(dec!(0.425)));
        assert_eq!(render_metric(&debt), "0.43");

        let assets = Metric::money("Total Assets", Some(dec!(1234.5)));
        assert_eq!(render_metric(&assets), "$1,234.50");

        let empty = Metric::percent("Tax Rate", None);
        assert_eq!(render_metric(&empty), "n/a");
    }
}
